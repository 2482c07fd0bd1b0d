//! Native USB backend (nusb)
//!
//! Native hosts have no browser chooser: pairing selects the first connected
//! device matching the filter, and every printer-class device the OS lets us
//! open counts as authorized for silent reconnect.

use super::{
    AlternateSetting, ConfigurationDescriptor, DeviceFilter, Direction, EndpointDescriptor,
    InterfaceDescriptor, TransferStatus, UsbDevice, UsbHost,
};
use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use nusb::transfer::TransferError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Host backed by the operating system's USB stack
#[derive(Debug, Default, Clone, Copy)]
pub struct NusbHost;

impl NusbHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl UsbHost for NusbHost {
    async fn request_device(&self, filter: &DeviceFilter) -> PrintResult<Arc<dyn UsbDevice>> {
        let info = nusb::list_devices()?
            .find(|info| listed_match(filter, info))
            .ok_or(PrintError::NoDeviceSelected)?;

        Ok(Arc::new(NusbDevice::new(info)))
    }

    /// Only printer-class devices; the rest of the bus is never opened
    async fn authorized_devices(&self) -> PrintResult<Vec<Arc<dyn UsbDevice>>> {
        let filter = DeviceFilter::printer_class();
        Ok(nusb::list_devices()?
            .filter(|info| listed_match(&filter, info))
            .map(|info| Arc::new(NusbDevice::new(info)) as Arc<dyn UsbDevice>)
            .collect())
    }
}

/// Class check on the enumeration data, without opening the device
fn listed_match(filter: &DeviceFilter, info: &nusb::DeviceInfo) -> bool {
    filter.matches_classes(info.class(), info.interfaces().map(|i| i.class()))
}

/// One device on the native bus
pub struct NusbDevice {
    info: nusb::DeviceInfo,
    device: Mutex<Option<nusb::Device>>,
    interfaces: Mutex<HashMap<u8, nusb::Interface>>,
}

impl NusbDevice {
    fn new(info: nusb::DeviceInfo) -> Self {
        Self {
            info,
            device: Mutex::new(None),
            interfaces: Mutex::new(HashMap::new()),
        }
    }

    fn handle(&self) -> PrintResult<nusb::Device> {
        self.device.lock().clone().ok_or(PrintError::NotConnected)
    }

    fn ensure_open(&self) -> PrintResult<nusb::Device> {
        let mut slot = self.device.lock();
        if let Some(device) = slot.as_ref() {
            return Ok(device.clone());
        }
        let device = self
            .info
            .open()
            .map_err(|e| PrintError::Open(format!("{}: {}", self.label(), e)))?;
        *slot = Some(device.clone());
        Ok(device)
    }
}

#[async_trait]
impl UsbDevice for NusbDevice {
    fn label(&self) -> String {
        format!(
            "{:04x}:{:04x} {}",
            self.info.vendor_id(),
            self.info.product_id(),
            self.info.product_string().unwrap_or("")
        )
    }

    fn device_class(&self) -> u8 {
        self.info.class()
    }

    /// Descriptors need an open handle on native hosts, so this opens lazily
    fn configurations(&self) -> Vec<ConfigurationDescriptor> {
        let device = match self.ensure_open() {
            Ok(d) => d,
            Err(e) => {
                debug!(error = %e, "Cannot read descriptors");
                return Vec::new();
            }
        };

        device
            .configurations()
            .map(|config| ConfigurationDescriptor {
                configuration_value: config.configuration_value(),
                interfaces: config
                    .interfaces()
                    .map(|group| InterfaceDescriptor {
                        interface_number: group.interface_number(),
                        alternates: group
                            .alt_settings()
                            .map(|alt| AlternateSetting {
                                alternate_setting: alt.alternate_setting(),
                                interface_class: alt.class(),
                                endpoints: alt
                                    .endpoints()
                                    .map(|ep| EndpointDescriptor {
                                        endpoint_number: ep.address() & 0x0F,
                                        direction: match ep.direction() {
                                            nusb::transfer::Direction::Out => Direction::Out,
                                            nusb::transfer::Direction::In => Direction::In,
                                        },
                                    })
                                    .collect(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect()
    }

    fn is_opened(&self) -> bool {
        self.device.lock().is_some()
    }

    fn active_configuration(&self) -> Option<u8> {
        let device = self.device.lock().clone()?;
        device
            .active_configuration()
            .ok()
            .map(|c| c.configuration_value())
    }

    async fn open(&self) -> PrintResult<()> {
        self.ensure_open().map(|_| ())
    }

    async fn select_configuration(&self, value: u8) -> PrintResult<()> {
        self.handle()?
            .set_configuration(value)
            .map_err(|e| PrintError::Open(format!("set configuration {value}: {e}")))
    }

    async fn claim_interface(&self, interface_number: u8) -> PrintResult<()> {
        let interface = self
            .handle()?
            .claim_interface(interface_number)
            .map_err(|e| PrintError::Interface {
                interface: interface_number,
                reason: e.to_string(),
            })?;
        self.interfaces.lock().insert(interface_number, interface);
        Ok(())
    }

    async fn release_interface(&self, interface_number: u8) -> PrintResult<()> {
        // Dropping the claimed interface releases it
        if self.interfaces.lock().remove(&interface_number).is_none() {
            warn!(interface = interface_number, "Release of unclaimed interface");
        }
        Ok(())
    }

    async fn transfer_out(&self, endpoint_number: u8, data: &[u8]) -> PrintResult<TransferStatus> {
        let interface = self
            .interfaces
            .lock()
            .values()
            .next()
            .cloned()
            .ok_or(PrintError::NotConnected)?;

        let completion = interface.bulk_out(endpoint_number, data.to_vec()).await;
        match completion.status {
            Ok(()) => Ok(TransferStatus::Ok),
            Err(TransferError::Stall) => Ok(TransferStatus::Stall),
            Err(TransferError::Disconnected) => Err(PrintError::Disconnected),
            Err(e) => Err(PrintError::Transfer(e.to_string())),
        }
    }

    async fn close(&self) -> PrintResult<()> {
        self.interfaces.lock().clear();
        self.device.lock().take();
        Ok(())
    }
}
