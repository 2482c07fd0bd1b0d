//! Auto-print worker
//!
//! Listens on the print queue and prints each new order as it arrives.
//! Jobs are handled one at a time in queue order.

use std::sync::Arc;

use shared::OrderSnapshot;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::controller::PrinterController;

/// Arc-wrapped order (from OrderWatcher)
pub type PrintJob = Arc<OrderSnapshot>;

/// Auto-print worker
///
/// Orders arriving while the printer is not connected are skipped, not held
/// back: a receipt printed minutes late is worse than none.
pub struct PrintWorker {
    controller: Arc<PrinterController>,
}

impl PrintWorker {
    pub fn new(controller: Arc<PrinterController>) -> Self {
        Self { controller }
    }

    /// Run the worker (blocks until the channel closes or shutdown)
    pub async fn run(self, mut jobs: mpsc::Receiver<PrintJob>, shutdown: CancellationToken) {
        tracing::info!("Print worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Print worker received shutdown signal");
                    break;
                }
                job = jobs.recv() => {
                    let Some(order) = job else {
                        tracing::info!("Print queue closed, print worker stopping");
                        break;
                    };
                    self.handle(&order).await;
                }
            }
        }
    }

    async fn handle(&self, order: &OrderSnapshot) {
        if !self.controller.is_connected() {
            tracing::debug!(
                order_number = order.order_number,
                status = %self.controller.status(),
                "Printer not connected, skipping auto-print"
            );
            return;
        }

        if !self.controller.print_order(order).await {
            tracing::warn!(
                order_id = %order.id,
                order_number = order.order_number,
                "Auto-print failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printing::ReceiptRenderer;
    use rust_decimal::Decimal;
    use shared::OrderStatus;
    use truck_printer::UsbPrinter;
    use truck_printer::usb::mock::{MockTransfer, MockUsbDevice, MockUsbHost};

    fn job(n: u32) -> PrintJob {
        Arc::new(OrderSnapshot {
            id: format!("o{n}"),
            order_number: n,
            customer_name: "Kim".to_string(),
            status: OrderStatus::Pending,
            created_at: 1_718_000_000_000,
            items: vec![],
            total_amount: Decimal::ZERO,
        })
    }

    async fn connected_controller() -> (Arc<PrinterController>, Arc<MockUsbDevice>) {
        let host = MockUsbHost::new();
        let device = MockUsbDevice::printer("TM-T20");
        host.authorize(device.clone());
        let transport = Arc::new(UsbPrinter::new(host));
        let controller = PrinterController::attach(transport, ReceiptRenderer::default()).await;
        (Arc::new(controller), device)
    }

    #[tokio::test]
    async fn test_prints_jobs_in_order_until_channel_closes() {
        let (controller, device) = connected_controller().await;
        let (tx, rx) = mpsc::channel(8);

        tx.send(job(1)).await.unwrap();
        tx.send(job(2)).await.unwrap();
        drop(tx);

        PrintWorker::new(Arc::clone(&controller))
            .run(rx, CancellationToken::new())
            .await;

        let writes = device.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], controller.renderer().render(&job(1)));
        assert_eq!(writes[1], controller.renderer().render(&job(2)));
    }

    #[tokio::test]
    async fn test_skips_when_disconnected() {
        let (controller, device) = connected_controller().await;
        controller.disconnect().await;

        let (tx, rx) = mpsc::channel(8);
        tx.send(job(1)).await.unwrap();
        drop(tx);

        PrintWorker::new(controller).run(rx, CancellationToken::new()).await;

        assert_eq!(device.transfer_attempts(), 0);
    }

    #[tokio::test]
    async fn test_failed_print_does_not_stop_worker() {
        let (controller, device) = connected_controller().await;
        device.push_transfer(MockTransfer::Fault);

        let (tx, rx) = mpsc::channel(8);
        tx.send(job(1)).await.unwrap();
        tx.send(job(2)).await.unwrap();
        drop(tx);

        PrintWorker::new(Arc::clone(&controller))
            .run(rx, CancellationToken::new())
            .await;

        // First fault moves the printer to error; the second job is skipped
        assert_eq!(device.transfer_attempts(), 1);
        assert!(!controller.is_connected());
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let (controller, _device) = connected_controller().await;
        let (_tx, rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(PrintWorker::new(controller).run(rx, shutdown.clone()));
        shutdown.cancel();

        handle.await.unwrap();
    }
}
