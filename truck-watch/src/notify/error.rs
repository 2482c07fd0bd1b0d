//! Notification errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Background worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Permission prompt failed: {0}")]
    Prompt(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;
