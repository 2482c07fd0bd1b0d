//! # truck-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command building
//! - Windows-1252 transcoding for receipt text
//! - USB device discovery and the printer connection state machine
//! - Native USB access via `nusb` (feature `nusb`)
//!
//! Business logic (WHAT to print, and when) stays in application code:
//! - Receipt rendering and auto-print → truck-watch
//!
//! ## Example
//!
//! ```ignore
//! use truck_printer::{EscPosBuilder, UsbPrinter};
//! use truck_printer::usb::native::NusbHost;
//!
//! // Build ESC/POS content
//! let mut builder = EscPosBuilder::new(42);
//! builder.center();
//! builder.double_size();
//! builder.line("ORDER #7");
//! builder.reset_size();
//! builder.left();
//! builder.line_lr("2x Latte (Large)", "$13.00");
//! builder.cut();
//!
//! // Send to a USB printer
//! let printer = UsbPrinter::new(NusbHost::new());
//! if printer.reconnect().await {
//!     printer.print_raw(&builder.build()).await;
//! }
//! ```

mod encoding;
mod error;
mod escpos;
mod transport;
pub mod usb;

// Re-exports
pub use encoding::{CODE_PAGE_WPC1252, convert_to_codepage, pad_text, text_width, truncate_text};
pub use error::{PrintError, PrintResult};
pub use escpos::{EscPosBuilder, cmd, two_column};
pub use transport::{ListenerId, PrinterStatus, UsbPrinter};
pub use usb::{PRINTER_CLASS_CODE, PrinterInterface, TransferStatus, UsbDevice, UsbHost};
