//! USB printer transport
//!
//! Owns the device handle and drives the connection state machine:
//!
//! ```text
//!                  pair() / reconnect()            claimed
//!  Disconnected ───────────────────────► Connecting ───────► Connected
//!       ▲                                    │                   │
//!       │             reconnect() failure    │ pair() failure    │ transfer fault
//!       ├────────────────────────────────────┤                   │
//!       │                                    └──────► Error ◄────┘
//!       └─────────────── disconnect() from any state
//! ```
//!
//! `disconnect()` wins over a pair or reconnect still in flight: the open is
//! abandoned and anything it claimed is released. A reconnect that fails
//! from `Error` stays in `Error`.
//!
//! Only `Connected` holds a device handle. Faults never escape as errors:
//! callers see a `bool` and the status, and are told about every transition
//! through [`UsbPrinter::subscribe`].

use crate::error::{PrintError, PrintResult};
use crate::usb::{
    DEFAULT_CONFIGURATION, DeviceFilter, PrinterInterface, TransferStatus, UsbDevice, UsbHost,
    find_printer_interface,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrinterStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl PrinterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrinterStatus::Disconnected => "disconnected",
            PrinterStatus::Connecting => "connecting",
            PrinterStatus::Connected => "connected",
            PrinterStatus::Error => "error",
        }
    }
}

impl fmt::Display for PrinterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by [`UsbPrinter::subscribe`]
pub type ListenerId = u64;

type StatusListener = Arc<dyn Fn(PrinterStatus) + Send + Sync>;

/// A claimed printer interface on an open device
struct Connection {
    device: Arc<dyn UsbDevice>,
    interface: PrinterInterface,
}

/// USB receipt printer
///
/// One instance exclusively owns at most one claimed device. Share it with
/// `Arc`; every method takes `&self`.
///
/// `print_raw` calls are queued: concurrent callers are served one at a time
/// in arrival order, so two byte streams never interleave on the endpoint.
pub struct UsbPrinter {
    host: Arc<dyn UsbHost>,
    connection: Mutex<Option<Arc<Connection>>>,
    status: Mutex<PrinterStatus>,
    /// Held across a status change and its notifications
    transition: Mutex<()>,
    listeners: Mutex<BTreeMap<ListenerId, StatusListener>>,
    next_listener: AtomicU64,
    /// Serializes pair / reconnect
    lifecycle: tokio::sync::Mutex<()>,
    /// Bumped by disconnect(); an open started under an older value is abandoned
    generation: AtomicU64,
    /// FIFO queue for print_raw
    print_queue: tokio::sync::Mutex<()>,
    transfer_timeout: Option<Duration>,
}

impl UsbPrinter {
    pub fn new(host: Arc<dyn UsbHost>) -> Self {
        Self {
            host,
            connection: Mutex::new(None),
            status: Mutex::new(PrinterStatus::Disconnected),
            transition: Mutex::new(()),
            listeners: Mutex::new(BTreeMap::new()),
            next_listener: AtomicU64::new(1),
            lifecycle: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            print_queue: tokio::sync::Mutex::new(()),
            transfer_timeout: None,
        }
    }

    /// Fail transfers that take longer than `timeout` (treated as a fault)
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = Some(timeout);
        self
    }

    pub fn status(&self) -> PrinterStatus {
        *self.status.lock()
    }

    pub fn transfer_timeout(&self) -> Option<Duration> {
        self.transfer_timeout
    }

    pub fn is_connected(&self) -> bool {
        self.status() == PrinterStatus::Connected
    }

    /// Interface and endpoint of the live connection
    pub fn connection_info(&self) -> Option<PrinterInterface> {
        self.connection.lock().as_ref().map(|c| c.interface)
    }

    pub fn device_label(&self) -> Option<String> {
        self.connection.lock().as_ref().map(|c| c.device.label())
    }

    // === Status Listeners ===

    /// Register a listener, called synchronously on every status transition
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(PrinterStatus) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(id, Arc::new(listener));
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.lock().remove(&id).is_some()
    }

    fn set_status(&self, next: PrinterStatus) {
        let _transition = self.transition.lock();
        self.apply_status(next);
    }

    /// `set_status`, unless disconnect() ran since `generation` was read
    fn set_status_current(&self, generation: u64, next: PrinterStatus) -> bool {
        let _transition = self.transition.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        self.apply_status(next);
        true
    }

    /// Caller holds `transition`
    fn apply_status(&self, next: PrinterStatus) {
        {
            let mut status = self.status.lock();
            if *status == next {
                return;
            }
            debug!(from = %*status, to = %next, "Printer status changed");
            *status = next;
        }

        // Listeners run outside the status/listener locks so they can query
        // status or (un)subscribe.
        let listeners: Vec<StatusListener> = self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(next);
        }
    }

    // === Connection Lifecycle ===

    /// Pair a printer through the host's device chooser
    ///
    /// Must be triggered by a user gesture. Returns false if the user
    /// dismissed the chooser (status unchanged) or pairing failed (status
    /// `Error`).
    #[instrument(skip(self))]
    pub async fn pair(&self) -> bool {
        let _lifecycle = self.lifecycle.lock().await;
        let generation = self.generation.load(Ordering::SeqCst);

        let device = match self.host.request_device(&DeviceFilter::printer_class()).await {
            Ok(d) => d,
            Err(PrintError::NoDeviceSelected) => {
                info!("Printer chooser dismissed");
                return false;
            }
            Err(PrintError::Unsupported) => {
                error!("USB not supported on this host");
                return false;
            }
            Err(e) => {
                error!(error = %e, "Pair failed");
                self.set_status_current(generation, PrinterStatus::Error);
                return false;
            }
        };

        self.open_device(device, PrinterStatus::Error, generation).await
    }

    /// Silently reconnect to a previously authorized printer
    ///
    /// No user gesture needed. Failures are not errors: the status falls back
    /// to `Disconnected`, or stays `Error` if the printer was already faulted.
    /// Already connected is a no-op returning true.
    #[instrument(skip(self))]
    pub async fn reconnect(&self) -> bool {
        let _lifecycle = self.lifecycle.lock().await;
        let generation = self.generation.load(Ordering::SeqCst);

        let on_failure = match self.status() {
            PrinterStatus::Connected => return true,
            PrinterStatus::Error => PrinterStatus::Error,
            _ => PrinterStatus::Disconnected,
        };

        let devices = match self.host.authorized_devices().await {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "Reconnect: cannot list authorized devices");
                return false;
            }
        };

        let Some(device) = devices
            .into_iter()
            .find(|d| find_printer_interface(&d.configurations()).is_some())
        else {
            debug!("Reconnect: no previously authorized printer");
            return false;
        };

        self.open_device(device, on_failure, generation).await
    }

    /// Release the claimed interface and close the device
    ///
    /// Idempotent. A transfer still in flight fails and is reported to its
    /// caller as `false` without touching the new status. A pair or reconnect
    /// in flight is abandoned and returns false.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        let previous = {
            let mut slot = self.connection.lock();
            self.generation.fetch_add(1, Ordering::SeqCst);
            slot.take()
        };
        if let Some(conn) = previous {
            Self::release(&conn).await;
            info!(device = %conn.device.label(), "Printer disconnected");
        }
        self.set_status(PrinterStatus::Disconnected);
    }

    async fn open_device(
        &self,
        device: Arc<dyn UsbDevice>,
        on_failure: PrinterStatus,
        generation: u64,
    ) -> bool {
        let previous = self.connection.lock().take();
        if let Some(conn) = previous {
            debug!(device = %conn.device.label(), "Releasing previous printer");
            Self::release(&conn).await;
        }

        let label = device.label();
        if !self.set_status_current(generation, PrinterStatus::Connecting) {
            info!(device = %label, "Printer disconnected before opening");
            return false;
        }

        match Self::claim_printer(device.as_ref()).await {
            Ok(interface) => {
                let conn = Arc::new(Connection { device, interface });
                let installed = {
                    let mut slot = self.connection.lock();
                    let current = self.generation.load(Ordering::SeqCst) == generation;
                    if current {
                        *slot = Some(Arc::clone(&conn));
                    }
                    current
                };
                if !installed {
                    info!(device = %label, "Printer disconnected while opening, releasing");
                    Self::release(&conn).await;
                    return false;
                }
                // A disconnect() from here on owns the release
                if !self.set_status_current(generation, PrinterStatus::Connected) {
                    return false;
                }
                info!(
                    device = %label,
                    interface = interface.interface_number,
                    endpoint = interface.out_endpoint,
                    "Printer connected"
                );
                true
            }
            Err(e) => {
                if on_failure == PrinterStatus::Error {
                    error!(device = %label, error = %e, "Failed to open printer");
                } else {
                    warn!(device = %label, error = %e, "Failed to reopen printer");
                }
                if let Err(close_err) = device.close().await {
                    debug!(device = %label, error = %close_err, "Close after failed open");
                }
                self.set_status_current(generation, on_failure);
                false
            }
        }
    }

    /// Open, configure, discover and claim
    async fn claim_printer(device: &dyn UsbDevice) -> PrintResult<PrinterInterface> {
        if !device.is_opened() {
            device.open().await?;
        }
        if device.active_configuration().is_none() {
            device.select_configuration(DEFAULT_CONFIGURATION).await?;
        }

        let interface = find_printer_interface(&device.configurations())
            .ok_or_else(|| PrintError::NoPrinterInterface(device.label()))?;

        device.claim_interface(interface.interface_number).await?;
        Ok(interface)
    }

    async fn release(conn: &Connection) {
        let label = conn.device.label();
        if let Err(e) = conn
            .device
            .release_interface(conn.interface.interface_number)
            .await
        {
            warn!(device = %label, error = %e, "Release interface failed");
        }
        if let Err(e) = conn.device.close().await {
            warn!(device = %label, error = %e, "Close device failed");
        }
    }

    // === Printing ===

    /// Send raw ESC/POS bytes as one bulk transfer
    ///
    /// Only valid while connected; otherwise fails fast without touching the
    /// device. Any fault or non-ok completion moves the printer to `Error`
    /// and drops the handle: re-pair or reconnect to recover. No retries.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn print_raw(&self, data: &[u8]) -> bool {
        let _turn = self.print_queue.lock().await;

        let Some(conn) = self.connection.lock().clone() else {
            warn!("Printer not connected");
            return false;
        };

        match self.transfer(&conn, data).await {
            Ok(()) => {
                info!(device = %conn.device.label(), "Print job sent");
                true
            }
            Err(e) => {
                self.discard(&conn, &e).await;
                false
            }
        }
    }

    async fn transfer(&self, conn: &Connection, data: &[u8]) -> PrintResult<()> {
        let endpoint = conn.interface.out_endpoint;
        let status = match self.transfer_timeout {
            Some(limit) => tokio::time::timeout(limit, conn.device.transfer_out(endpoint, data))
                .await
                .map_err(|_| {
                    PrintError::Timeout(format!("transfer exceeded {} ms", limit.as_millis()))
                })??,
            None => conn.device.transfer_out(endpoint, data).await?,
        };

        match status {
            TransferStatus::Ok => Ok(()),
            other => Err(PrintError::TransferStatus(other)),
        }
    }

    /// Drop a failed connection, unless it was already replaced
    async fn discard(&self, conn: &Arc<Connection>, err: &PrintError) {
        let is_current = {
            let mut slot = self.connection.lock();
            let is_current = slot.as_ref().is_some_and(|c| Arc::ptr_eq(c, conn));
            if is_current {
                *slot = None;
            }
            is_current
        };
        if !is_current {
            warn!(error = %err, "Transfer failed on a released connection");
            return;
        }

        error!(device = %conn.device.label(), error = %err, "Print failed, device handle dropped");
        self.set_status(PrinterStatus::Error);
        Self::release(conn).await;
    }
}

impl fmt::Debug for UsbPrinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsbPrinter")
            .field("status", &self.status())
            .field("connection", &self.connection_info())
            .field("transfer_timeout", &self.transfer_timeout)
            .finish()
    }
}
