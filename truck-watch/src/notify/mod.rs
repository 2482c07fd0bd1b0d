//! Customer notifications for order status changes
//!
//! - [`NotificationDispatcher`]: permission state + delivery
//! - [`Notification`]: message catalogue
//! - [`PlatformCapabilities`]: direct vs worker delivery

mod dispatcher;
mod error;
mod message;
mod platform;

pub use dispatcher::{
    AUTO_DISMISS, NotificationDispatcher, NotificationHandle, NotificationSink, PermissionPrompt,
};
pub use error::{NotifyError, NotifyResult};
pub use message::{
    NOTIFICATION_ICON, Notification, NotificationAction, ORDERS_URL, status_message, tag_for,
};
pub use platform::{DeliveryMethod, PermissionState, PlatformCapabilities};
