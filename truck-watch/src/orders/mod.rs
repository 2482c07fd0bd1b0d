//! Order stream processing

mod detector;

pub use detector::{OrderChangeDetector, OrderChanges, StatusTransition};
