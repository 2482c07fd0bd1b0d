//! In-memory USB backend
//!
//! Scriptable host and device used by the transport tests and by dependent
//! crates (feature `mock`). Devices record every byte written to them.

use super::{
    AlternateSetting, ConfigurationDescriptor, DeviceFilter, Direction, EndpointDescriptor,
    InterfaceDescriptor, PRINTER_CLASS_CODE, TransferStatus, UsbDevice, UsbHost,
};
use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Scripted outcome of the next transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockTransfer {
    /// Completes with status ok (default when the script is empty)
    Complete,
    /// Completes with the given status
    Status(TransferStatus),
    /// Raises a transport fault
    Fault,
    /// Stays in flight until the device is closed, then faults
    Pending,
}

#[derive(Default)]
struct DeviceState {
    opened: bool,
    active_configuration: Option<u8>,
    claimed: Vec<u8>,
    close_count: usize,
    writes: Vec<Vec<u8>>,
    transfer_attempts: usize,
    script: VecDeque<MockTransfer>,
    fail_open: bool,
    fail_claim: bool,
    claim_gated: bool,
}

/// In-memory USB device
pub struct MockUsbDevice {
    label: String,
    device_class: u8,
    configurations: Vec<ConfigurationDescriptor>,
    state: Mutex<DeviceState>,
    closed: Notify,
    claim_gate: Notify,
}

impl MockUsbDevice {
    pub fn new(
        label: impl Into<String>,
        device_class: u8,
        configurations: Vec<ConfigurationDescriptor>,
    ) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            device_class,
            configurations,
            state: Mutex::new(DeviceState::default()),
            closed: Notify::new(),
            claim_gate: Notify::new(),
        })
    }

    /// Receipt printer: interface 0 (printer class), bulk IN 2, bulk OUT 1
    pub fn printer(label: impl Into<String>) -> Arc<Self> {
        Self::new(
            label,
            0x00,
            vec![ConfigurationDescriptor {
                configuration_value: 1,
                interfaces: vec![InterfaceDescriptor {
                    interface_number: 0,
                    alternates: vec![AlternateSetting {
                        alternate_setting: 0,
                        interface_class: PRINTER_CLASS_CODE,
                        endpoints: vec![
                            EndpointDescriptor {
                                endpoint_number: 2,
                                direction: Direction::In,
                            },
                            EndpointDescriptor {
                                endpoint_number: 1,
                                direction: Direction::Out,
                            },
                        ],
                    }],
                }],
            }],
        )
    }

    /// Device that advertises the printer class but has no OUT endpoint
    pub fn broken_printer(label: impl Into<String>) -> Arc<Self> {
        Self::new(
            label,
            PRINTER_CLASS_CODE,
            vec![ConfigurationDescriptor {
                configuration_value: 1,
                interfaces: vec![InterfaceDescriptor {
                    interface_number: 0,
                    alternates: vec![AlternateSetting {
                        alternate_setting: 0,
                        interface_class: PRINTER_CLASS_CODE,
                        endpoints: vec![EndpointDescriptor {
                            endpoint_number: 2,
                            direction: Direction::In,
                        }],
                    }],
                }],
            }],
        )
    }

    /// Queue the outcome of a future transfer
    pub fn push_transfer(&self, outcome: MockTransfer) {
        self.state.lock().script.push_back(outcome);
    }

    pub fn fail_open(&self) {
        self.state.lock().fail_open = true;
    }

    pub fn fail_claim(&self) {
        self.state.lock().fail_claim = true;
    }

    /// The next claim waits until [`open_claim_gate`](Self::open_claim_gate)
    pub fn gate_claim(&self) {
        self.state.lock().claim_gated = true;
    }

    pub fn open_claim_gate(&self) {
        self.claim_gate.notify_one();
    }

    /// Payloads of every transfer that completed with status ok
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    pub fn transfer_attempts(&self) -> usize {
        self.state.lock().transfer_attempts
    }

    pub fn is_claimed(&self, interface_number: u8) -> bool {
        self.state.lock().claimed.contains(&interface_number)
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }
}

#[async_trait]
impl UsbDevice for MockUsbDevice {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn device_class(&self) -> u8 {
        self.device_class
    }

    fn configurations(&self) -> Vec<ConfigurationDescriptor> {
        self.configurations.clone()
    }

    fn is_opened(&self) -> bool {
        self.state.lock().opened
    }

    fn active_configuration(&self) -> Option<u8> {
        self.state.lock().active_configuration
    }

    async fn open(&self) -> PrintResult<()> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(PrintError::Open(format!("{}: access denied", self.label)));
        }
        state.opened = true;
        Ok(())
    }

    async fn select_configuration(&self, value: u8) -> PrintResult<()> {
        let mut state = self.state.lock();
        if !state.opened {
            return Err(PrintError::Open("device not opened".to_string()));
        }
        state.active_configuration = Some(value);
        Ok(())
    }

    async fn claim_interface(&self, interface_number: u8) -> PrintResult<()> {
        let gated = std::mem::take(&mut self.state.lock().claim_gated);
        if gated {
            self.claim_gate.notified().await;
        }

        let mut state = self.state.lock();
        if state.fail_claim || state.claimed.contains(&interface_number) {
            return Err(PrintError::Interface {
                interface: interface_number,
                reason: "busy".to_string(),
            });
        }
        state.claimed.push(interface_number);
        Ok(())
    }

    async fn release_interface(&self, interface_number: u8) -> PrintResult<()> {
        self.state.lock().claimed.retain(|&n| n != interface_number);
        Ok(())
    }

    async fn transfer_out(&self, endpoint_number: u8, data: &[u8]) -> PrintResult<TransferStatus> {
        let outcome = {
            let mut state = self.state.lock();
            state.transfer_attempts += 1;
            if !state.opened {
                return Err(PrintError::Disconnected);
            }
            state.script.pop_front().unwrap_or(MockTransfer::Complete)
        };

        match outcome {
            MockTransfer::Complete => {
                self.state.lock().writes.push(data.to_vec());
                Ok(TransferStatus::Ok)
            }
            MockTransfer::Status(status) => Ok(status),
            MockTransfer::Fault => Err(PrintError::Transfer(format!(
                "endpoint {endpoint_number}: I/O fault"
            ))),
            MockTransfer::Pending => loop {
                let closed = self.closed.notified();
                if !self.state.lock().opened {
                    return Err(PrintError::Disconnected);
                }
                closed.await;
            },
        }
    }

    async fn close(&self) -> PrintResult<()> {
        {
            let mut state = self.state.lock();
            state.opened = false;
            state.active_configuration = None;
            state.claimed.clear();
            state.close_count += 1;
        }
        self.closed.notify_waiters();
        Ok(())
    }
}

enum ChooserOutcome {
    Select(Arc<MockUsbDevice>),
    Dismiss,
    Fail,
}

/// In-memory USB host
#[derive(Default)]
pub struct MockUsbHost {
    chooser: Mutex<VecDeque<ChooserOutcome>>,
    authorized: Mutex<Vec<Arc<MockUsbDevice>>>,
    chooser_calls: AtomicUsize,
}

impl MockUsbHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The next chooser picks `device` (it becomes authorized)
    pub fn select_next(&self, device: Arc<MockUsbDevice>) {
        self.chooser
            .lock()
            .push_back(ChooserOutcome::Select(device));
    }

    /// The next chooser is dismissed by the user
    pub fn dismiss_next(&self) {
        self.chooser.lock().push_back(ChooserOutcome::Dismiss);
    }

    /// The next chooser fails inside the host
    pub fn fail_next(&self) {
        self.chooser.lock().push_back(ChooserOutcome::Fail);
    }

    /// Mark a device as authorized by an earlier session
    pub fn authorize(&self, device: Arc<MockUsbDevice>) {
        self.authorized.lock().push(device);
    }

    pub fn chooser_calls(&self) -> usize {
        self.chooser_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UsbHost for MockUsbHost {
    async fn request_device(&self, filter: &DeviceFilter) -> PrintResult<Arc<dyn UsbDevice>> {
        self.chooser_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.chooser.lock().pop_front();

        match outcome {
            Some(ChooserOutcome::Select(device)) if filter.matches(device.as_ref()) => {
                let mut authorized = self.authorized.lock();
                if !authorized.iter().any(|d| Arc::ptr_eq(d, &device)) {
                    authorized.push(Arc::clone(&device));
                }
                Ok(device)
            }
            Some(ChooserOutcome::Fail) => Err(PrintError::Io(std::io::Error::other(
                "device chooser failed",
            ))),
            _ => Err(PrintError::NoDeviceSelected),
        }
    }

    async fn authorized_devices(&self) -> PrintResult<Vec<Arc<dyn UsbDevice>>> {
        Ok(self
            .authorized
            .lock()
            .iter()
            .map(|d| Arc::clone(d) as Arc<dyn UsbDevice>)
            .collect())
    }
}
