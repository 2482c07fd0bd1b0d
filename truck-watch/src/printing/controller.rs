//! Printer controller
//!
//! Couples the receipt renderer with a [`UsbPrinter`] and mirrors its status
//! for the staff UI.

use std::sync::Arc;

use parking_lot::Mutex;
use shared::OrderSnapshot;
use tracing::{debug, info, instrument};
use truck_printer::{ListenerId, PrinterStatus, UsbPrinter};

use super::renderer::ReceiptRenderer;

/// Printer controller
///
/// Holds a status listener on the transport for its whole lifetime and
/// removes it on drop. Printing never retries; callers decide what to do with
/// a `false`.
pub struct PrinterController {
    transport: Arc<UsbPrinter>,
    renderer: ReceiptRenderer,
    status: Arc<Mutex<PrinterStatus>>,
    listener: ListenerId,
}

impl PrinterController {
    /// Attach to a transport
    ///
    /// If the transport is disconnected, one silent reconnect to a
    /// previously authorized printer is awaited before returning.
    pub async fn attach(transport: Arc<UsbPrinter>, renderer: ReceiptRenderer) -> Self {
        let status = Arc::new(Mutex::new(PrinterStatus::Disconnected));
        let mirror = Arc::clone(&status);
        let listener = transport.subscribe(move |next| *mirror.lock() = next);
        *status.lock() = transport.status();

        let controller = Self {
            transport,
            renderer,
            status,
            listener,
        };

        if controller.status() == PrinterStatus::Disconnected {
            if controller.transport.reconnect().await {
                info!("Resumed connection to a previously paired printer");
            } else {
                debug!("No previously paired printer available");
            }
        }

        controller
    }

    /// Last status reported by the transport
    pub fn status(&self) -> PrinterStatus {
        *self.status.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == PrinterStatus::Connected
    }

    pub fn transport(&self) -> &Arc<UsbPrinter> {
        &self.transport
    }

    pub fn renderer(&self) -> &ReceiptRenderer {
        &self.renderer
    }

    /// Pair a printer (user gesture required)
    pub async fn pair(&self) -> bool {
        self.transport.pair().await
    }

    pub async fn disconnect(&self) {
        self.transport.disconnect().await;
    }

    /// Render and print one order receipt
    #[instrument(skip_all, fields(order_id = %order.id, order_number = order.order_number))]
    pub async fn print_order(&self, order: &OrderSnapshot) -> bool {
        let data = self.renderer.render(order);
        let printed = self.transport.print_raw(&data).await;
        if printed {
            info!(bytes = data.len(), "Receipt printed");
        }
        printed
    }
}

impl Drop for PrinterController {
    fn drop(&mut self) {
        self.transport.unsubscribe(self.listener);
    }
}

impl std::fmt::Debug for PrinterController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrinterController")
            .field("status", &self.status())
            .field("renderer", &self.renderer)
            .finish()
    }
}
