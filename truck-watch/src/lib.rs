//! Truck Watch - order watching for the food truck
//!
//! Watches the live order list and turns changes into side effects:
//!
//! - new order: alert tone + auto-printed receipt
//! - order preparing / ready: customer notification
//!
//! ```text
//! order store ──► OrderWatcher ──► OrderChangeDetector
//!                      │
//!                      ├──► AlertPlayer
//!                      ├──► PrintWorker ──► PrinterController ──► UsbPrinter
//!                      └──► NotificationDispatcher
//! ```

pub mod alert;
pub mod core;
pub mod notify;
pub mod orders;
pub mod printing;
pub mod utils;

pub use alert::{AlertPlayer, AlertTone, AudioSink, SoundError};
pub use self::core::{CustomerPipeline, OrderWatcher, StaffPipeline, WatchConfig};
pub use notify::{
    DeliveryMethod, Notification, NotificationDispatcher, NotificationHandle, NotificationSink,
    NotifyError, PermissionPrompt, PermissionState, PlatformCapabilities,
};
pub use orders::{OrderChangeDetector, OrderChanges, StatusTransition};
pub use printing::{PrintJob, PrintWorker, PrinterController, ReceiptRenderer};

// Re-export for convenience
pub use shared::{OrderItem, OrderSnapshot, OrderStatus};
pub use truck_printer::{PrinterStatus, UsbPrinter};
