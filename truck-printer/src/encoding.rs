//! Code-page utilities for thermal printers
//!
//! Thermal printers render one byte per column from a single-byte code page.
//! This module provides:
//! - Calculating printed string widths
//! - Truncating/padding strings to a column width
//! - Converting UTF-8 to Windows-1252 while preserving ESC/POS commands

use tracing::instrument;

/// ESC/POS code table number for WPC1252
pub const CODE_PAGE_WPC1252: u8 = 16;

/// Byte printed for characters the code page cannot represent
const REPLACEMENT: u8 = b'?';

/// Get the printed width of a string in columns
///
/// Every character occupies exactly one column once transcoded.
pub fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to fit within a column width
pub fn truncate_text(s: &str, max_width: usize) -> String {
    s.chars().take(max_width).collect()
}

/// Pad a string to a specific column width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad_text(s: &str, width: usize, align_right: bool) -> String {
    let current_width = text_width(s);
    if current_width >= width {
        return truncate_text(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}

/// Convert mixed UTF-8 content (with ESC/POS commands) to Windows-1252
///
/// ASCII bytes (0x00-0x7F) are preserved exactly as is, which protects
/// ESC/POS commands from being corrupted. Only bytes >= 0x80 are treated as
/// UTF-8 sequences and transcoded.
///
/// Every INIT command (ESC @) resets the code table, so the WPC1252 table
/// (ESC t 16) is selected again right after it.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn convert_to_codepage(bytes: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(bytes.len() + 8);
    let mut buffer = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if b == 0x1B && i + 1 < bytes.len() && bytes[i + 1] == 0x40 {
            flush_buffer(&mut buffer, &mut result);

            result.extend_from_slice(&[0x1B, 0x40]);
            result.extend_from_slice(&[0x1B, 0x74, CODE_PAGE_WPC1252]);

            i += 2;
            continue;
        }

        if b < 0x80 {
            flush_buffer(&mut buffer, &mut result);
            result.push(b);
        } else {
            buffer.push(b);
        }
        i += 1;
    }

    flush_buffer(&mut buffer, &mut result);
    result
}

/// Flush the non-ASCII buffer, one output byte per character
fn flush_buffer(buffer: &mut Vec<u8>, result: &mut Vec<u8>) {
    if buffer.is_empty() {
        return;
    }

    let s = String::from_utf8_lossy(buffer);
    let mut utf8 = [0u8; 4];
    for c in s.chars() {
        let (encoded, _, had_errors) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut utf8));
        if had_errors || encoded.len() != 1 {
            result.push(REPLACEMENT);
        } else {
            result.push(encoded[0]);
        }
    }
    buffer.clear();
}
