//! Error types for the printer library

use crate::usb::TransferStatus;
use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Host has no USB access (no backend, sandboxed, ...)
    #[error("USB not supported on this host")]
    Unsupported,

    /// User dismissed the device chooser without picking a device
    #[error("No device selected")]
    NoDeviceSelected,

    /// Device exposes no printer-class interface with an OUT endpoint
    #[error("No printer interface found on device: {0}")]
    NoPrinterInterface(String),

    /// Opening the device or selecting its configuration failed
    #[error("Open failed: {0}")]
    Open(String),

    /// Claiming or releasing an interface failed
    #[error("Interface {interface} unavailable: {reason}")]
    Interface { interface: u8, reason: String },

    /// Transfer completed with a non-ok status
    #[error("Transfer ended with status {0:?}")]
    TransferStatus(TransferStatus),

    /// Transfer raised a transport-level fault
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Device went away
    #[error("Device disconnected")]
    Disconnected,

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// No live connection
    #[error("Printer not connected")]
    NotConnected,

    /// IO error from the USB backend
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
