//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data.

use crate::encoding::{convert_to_codepage, pad_text, text_width, truncate_text};

/// Raw ESC/POS control sequences
pub mod cmd {
    const ESC: u8 = 0x1B;
    const GS: u8 = 0x1D;

    /// ESC @ - Initialize printer
    pub const INIT: [u8; 2] = [ESC, 0x40];

    /// ESC E n - Emphasized (bold) on/off
    pub const BOLD_ON: [u8; 3] = [ESC, 0x45, 0x01];
    pub const BOLD_OFF: [u8; 3] = [ESC, 0x45, 0x00];

    /// ESC a n - Justification
    pub const ALIGN_LEFT: [u8; 3] = [ESC, 0x61, 0x00];
    pub const ALIGN_CENTER: [u8; 3] = [ESC, 0x61, 0x01];
    pub const ALIGN_RIGHT: [u8; 3] = [ESC, 0x61, 0x02];

    /// GS ! n - Character size (high nibble width, low nibble height)
    pub const SIZE_NORMAL: [u8; 3] = [GS, 0x21, 0x00];
    pub const SIZE_DOUBLE_HEIGHT: [u8; 3] = [GS, 0x21, 0x01];
    pub const SIZE_DOUBLE_WIDTH: [u8; 3] = [GS, 0x21, 0x10];
    pub const SIZE_DOUBLE: [u8; 3] = [GS, 0x21, 0x11];

    /// GS V 0 - Full cut
    pub const CUT_FULL: [u8; 3] = [GS, 0x56, 0x00];

    /// ESC d n - Print and feed n lines
    pub const fn feed(lines: u8) -> [u8; 3] {
        [ESC, 0x64, lines]
    }

    /// ESC t n - Select character code table
    pub const fn code_page(table: u8) -> [u8; 3] {
        [ESC, 0x74, table]
    }
}

/// Compose a two-column line of exactly `width` columns
///
/// The right text keeps its full width and is right-aligned; the left text
/// is truncated if necessary so that one separating space always remains.
/// If the right text alone does not fit, it is truncated to `width`.
pub fn two_column(left: &str, right: &str, width: usize) -> String {
    let rw = text_width(right);
    if rw >= width {
        return truncate_text(right, width);
    }

    let left_width = width - rw - 1;
    format!("{} {}", pad_text(left, left_width, false), right)
}

/// ESC/POS command builder
///
/// Accumulates commands and UTF-8 text; [`EscPosBuilder::build`] transcodes
/// the text to the printer code page. Every builder starts with `ESC @`.
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
}

impl EscPosBuilder {
    /// Create a new builder with the specified paper width in characters
    ///
    /// Common widths (Font A):
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 42 characters
    pub fn new(width: usize) -> Self {
        let mut b = Self {
            buf: Vec::with_capacity(1024),
            width,
        };
        b.raw(&cmd::INIT);
        b
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Append bytes as-is
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    // === Text ===

    pub fn text(&mut self, s: &str) -> &mut Self {
        self.raw(s.as_bytes())
    }

    /// Text followed by a line feed
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s).raw(b"\n")
    }

    /// Left and right text on one line, see [`two_column`]
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let composed = two_column(left, right, self.width);
        self.line(&composed)
    }

    /// Full-width line of '-'
    pub fn sep_single(&mut self) -> &mut Self {
        let rule = "-".repeat(self.width);
        self.line(&rule)
    }

    // === Alignment ===

    pub fn left(&mut self) -> &mut Self {
        self.raw(&cmd::ALIGN_LEFT)
    }

    pub fn center(&mut self) -> &mut Self {
        self.raw(&cmd::ALIGN_CENTER)
    }

    pub fn right(&mut self) -> &mut Self {
        self.raw(&cmd::ALIGN_RIGHT)
    }

    // === Style ===

    pub fn bold(&mut self) -> &mut Self {
        self.raw(&cmd::BOLD_ON)
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.raw(&cmd::BOLD_OFF)
    }

    /// Double width and height
    pub fn double_size(&mut self) -> &mut Self {
        self.raw(&cmd::SIZE_DOUBLE)
    }

    pub fn double_height(&mut self) -> &mut Self {
        self.raw(&cmd::SIZE_DOUBLE_HEIGHT)
    }

    pub fn double_width(&mut self) -> &mut Self {
        self.raw(&cmd::SIZE_DOUBLE_WIDTH)
    }

    pub fn reset_size(&mut self) -> &mut Self {
        self.raw(&cmd::SIZE_NORMAL)
    }

    // === Paper ===

    /// Print buffer and feed `lines` blank lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.raw(&cmd::feed(lines))
    }

    /// Full cut
    pub fn cut(&mut self) -> &mut Self {
        self.raw(&cmd::CUT_FULL)
    }

    // === Build ===

    /// Final bytes in the printer code page
    pub fn build(self) -> Vec<u8> {
        convert_to_codepage(&self.buf)
    }

    /// Final bytes with text left as UTF-8
    pub fn build_raw(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(42)
    }
}
