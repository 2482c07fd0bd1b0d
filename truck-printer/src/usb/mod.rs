//! USB device model
//!
//! Hardware is reached through two object-safe async traits:
//! - [`UsbHost`]: device chooser (pairing) and the list of devices the user
//!   already authorized (silent reconnect)
//! - [`UsbDevice`]: descriptor tree, open/claim/release/close, bulk OUT
//!
//! Each trait method is one hardware call, so every `.await` on it is one
//! suspension point of the transport state machine.

#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(feature = "nusb")]
pub mod native;

use crate::error::PrintResult;
use async_trait::async_trait;
use std::sync::Arc;

/// USB base class code for printers
pub const PRINTER_CLASS_CODE: u8 = 0x07;

/// Configuration selected when a device comes up unconfigured
pub const DEFAULT_CONFIGURATION: u8 = 1;

/// Endpoint direction, from the host's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// Completion status of a transfer that did not raise a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Ok,
    Stall,
    Babble,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub endpoint_number: u8,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateSetting {
    pub alternate_setting: u8,
    pub interface_class: u8,
    pub endpoints: Vec<EndpointDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub interface_number: u8,
    pub alternates: Vec<AlternateSetting>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationDescriptor {
    pub configuration_value: u8,
    pub interfaces: Vec<InterfaceDescriptor>,
}

/// Where receipt bytes go on a paired device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterInterface {
    pub interface_number: u8,
    pub out_endpoint: u8,
}

/// Find the printer interface of a device
///
/// Walks configurations → interfaces → alternate settings and takes the first
/// alternate whose class is the printer class, then the first OUT endpoint
/// within it. An alternate of the right class without an OUT endpoint does
/// not stop the search.
pub fn find_printer_interface(configs: &[ConfigurationDescriptor]) -> Option<PrinterInterface> {
    configs
        .iter()
        .flat_map(|config| config.interfaces.iter())
        .find_map(|iface| {
            iface
                .alternates
                .iter()
                .filter(|alt| alt.interface_class == PRINTER_CLASS_CODE)
                .find_map(|alt| {
                    alt.endpoints
                        .iter()
                        .find(|ep| ep.direction == Direction::Out)
                        .map(|ep| PrinterInterface {
                            interface_number: iface.interface_number,
                            out_endpoint: ep.endpoint_number,
                        })
                })
        })
}

/// Chooser filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub class_code: u8,
}

impl DeviceFilter {
    /// Thermal printers only
    pub fn printer_class() -> Self {
        Self {
            class_code: PRINTER_CLASS_CODE,
        }
    }

    /// A device matches on its own class or on the class of any interface
    pub fn matches(&self, device: &dyn UsbDevice) -> bool {
        let configurations = device.configurations();
        self.matches_classes(
            device.device_class(),
            configurations
                .iter()
                .flat_map(|c| c.interfaces.iter())
                .flat_map(|i| i.alternates.iter())
                .map(|alt| alt.interface_class),
        )
    }

    /// Match on class codes alone, for hosts that list them without opening
    pub fn matches_classes<I>(&self, device_class: u8, interface_classes: I) -> bool
    where
        I: IntoIterator<Item = u8>,
    {
        device_class == self.class_code
            || interface_classes
                .into_iter()
                .any(|class| class == self.class_code)
    }
}

/// One USB peripheral
#[async_trait]
pub trait UsbDevice: Send + Sync {
    /// Human-readable identity for logs ("04b8:0e15 TM-T20")
    fn label(&self) -> String;

    fn device_class(&self) -> u8;

    fn configurations(&self) -> Vec<ConfigurationDescriptor>;

    fn is_opened(&self) -> bool;

    /// Currently selected configuration value, `None` when unconfigured
    fn active_configuration(&self) -> Option<u8>;

    async fn open(&self) -> PrintResult<()>;

    async fn select_configuration(&self, value: u8) -> PrintResult<()>;

    async fn claim_interface(&self, interface_number: u8) -> PrintResult<()>;

    async fn release_interface(&self, interface_number: u8) -> PrintResult<()>;

    /// Single bulk OUT transfer
    ///
    /// `Ok` carries the completion status; `Err` is a transport fault
    /// (exception, disconnection, cancellation).
    async fn transfer_out(&self, endpoint_number: u8, data: &[u8]) -> PrintResult<TransferStatus>;

    async fn close(&self) -> PrintResult<()>;
}

/// Access to the host's USB stack
#[async_trait]
pub trait UsbHost: Send + Sync {
    /// Present the device chooser
    ///
    /// Must run in response to a user gesture. Dismissing the chooser yields
    /// [`PrintError::NoDeviceSelected`](crate::PrintError::NoDeviceSelected).
    async fn request_device(&self, filter: &DeviceFilter) -> PrintResult<Arc<dyn UsbDevice>>;

    /// Devices the user authorized earlier (no gesture needed)
    async fn authorized_devices(&self) -> PrintResult<Vec<Arc<dyn UsbDevice>>>;
}
