//! Receipt printing
//!
//! - [`ReceiptRenderer`]: order snapshot -> ESC/POS bytes
//! - [`PrinterController`]: renderer + USB transport
//! - [`PrintWorker`]: auto-print queue consumer

mod controller;
mod renderer;
mod worker;

pub use controller::PrinterController;
pub use renderer::{
    FEED_LINES, RECEIPT_WIDTH, ReceiptRenderer, UNKNOWN_ITEM, UNPRICED, format_timestamp,
};
pub use worker::{PrintJob, PrintWorker};
