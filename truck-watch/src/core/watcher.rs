//! Order Watcher - change detection and side-effect routing
//!
//! ```text
//! order store (Vec<OrderSnapshot> per delivery)
//!        │
//!        └── OrderWatcher ── OrderChangeDetector
//!               ├── new orders ──► AlertPlayer (once per delivery) [fire-and-forget]
//!               ├── new orders ──► mpsc ──► PrintWorker [best-effort]
//!               └── preparing/ready ──► NotificationDispatcher [fire-and-forget]
//! ```
//!
//! No side effect is awaited here. A full print queue drops the job rather
//! than stall the next delivery.

use std::sync::Arc;

use shared::OrderSnapshot;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::alert::AlertPlayer;
use crate::notify::NotificationDispatcher;
use crate::orders::{OrderChangeDetector, OrderChanges};
use crate::printing::PrintJob;

/// Order watcher
///
/// Each side effect is optional: the staff screen wires sound and printing,
/// the customer screen only notifications.
#[derive(Debug, Default)]
pub struct OrderWatcher {
    detector: OrderChangeDetector,
    print_tx: Option<mpsc::Sender<PrintJob>>,
    alert: Option<AlertPlayer>,
    notifier: Option<Arc<NotificationDispatcher>>,
}

impl OrderWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_print_queue(mut self, print_tx: mpsc::Sender<PrintJob>) -> Self {
        self.print_tx = Some(print_tx);
        self
    }

    pub fn with_alert(mut self, alert: AlertPlayer) -> Self {
        self.alert = Some(alert);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<NotificationDispatcher>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn detector(&self) -> &OrderChangeDetector {
        &self.detector
    }

    pub fn alert(&self) -> Option<&AlertPlayer> {
        self.alert.as_ref()
    }

    /// Bound of the auto-print queue, `None` without printing
    pub fn print_queue_capacity(&self) -> Option<usize> {
        self.print_tx.as_ref().map(|tx| tx.max_capacity())
    }

    /// Run the watcher (blocks until the source closes or shutdown)
    pub async fn run(
        mut self,
        mut source: mpsc::Receiver<Vec<OrderSnapshot>>,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Order watcher started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Order watcher received shutdown signal");
                    break;
                }
                delivery = source.recv() => {
                    let Some(orders) = delivery else {
                        tracing::info!("Order source closed, order watcher stopping");
                        break;
                    };
                    self.process(&orders);
                }
            }
        }
    }

    /// Process one delivery and start its side effects
    ///
    /// Must be called inside a tokio runtime.
    pub fn process(&mut self, orders: &[OrderSnapshot]) -> OrderChanges {
        let changes = self.detector.observe(orders);
        if !changes.is_empty() {
            self.dispatch(&changes);
        }
        changes
    }

    fn dispatch(&self, changes: &OrderChanges) {
        if !changes.new_orders.is_empty() {
            tracing::info!(
                count = changes.new_orders.len(),
                order_numbers = ?changes.new_orders.iter().map(|o| o.order_number).collect::<Vec<_>>(),
                "New orders received"
            );

            // One alert per delivery, however many orders arrived
            if let Some(alert) = &self.alert {
                alert.play_detached();
            }

            if let Some(print_tx) = &self.print_tx {
                for order in &changes.new_orders {
                    self.enqueue_print(print_tx, order);
                }
            }
        }

        for transition in &changes.transitions {
            tracing::info!(
                order_id = %transition.order_id,
                order_number = transition.order_number,
                from = %transition.previous,
                to = %transition.current,
                "Order status changed"
            );

            if !transition.is_customer_visible() {
                continue;
            }
            if let Some(notifier) = &self.notifier {
                notifier.dispatch(transition);
            }
        }
    }

    fn enqueue_print(&self, print_tx: &mpsc::Sender<PrintJob>, order: &OrderSnapshot) {
        match print_tx.try_send(Arc::new(order.clone())) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    order_id = %order.id,
                    order_number = order.order_number,
                    "Print queue full, print job dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Print queue closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertTone, AudioSink, SoundResult};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use shared::OrderStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        plays: AtomicUsize,
    }

    #[async_trait]
    impl AudioSink for CountingSink {
        async fn play(&self, _tone: &AlertTone) -> SoundResult<()> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn order(id: &str, number: u32, status: OrderStatus) -> OrderSnapshot {
        OrderSnapshot {
            id: id.to_string(),
            order_number: number,
            customer_name: "Robin".to_string(),
            status,
            created_at: 1_718_000_000_000,
            items: vec![],
            total_amount: Decimal::ZERO,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_new_orders_enqueue_prints_and_play_once() {
        let sink = Arc::new(CountingSink::default());
        let (print_tx, mut print_rx) = mpsc::channel(8);
        let mut watcher = OrderWatcher::new()
            .with_print_queue(print_tx)
            .with_alert(AlertPlayer::new(sink.clone(), AlertTone::default()));

        watcher.process(&[order("a", 1, OrderStatus::Pending)]);
        let changes = watcher.process(&[
            order("a", 1, OrderStatus::Pending),
            order("b", 2, OrderStatus::Pending),
            order("c", 3, OrderStatus::Pending),
        ]);
        settle().await;

        assert_eq!(changes.new_orders.len(), 2);
        assert_eq!(print_rx.recv().await.unwrap().id, "b");
        assert_eq!(print_rx.recv().await.unwrap().id, "c");
        assert!(print_rx.try_recv().is_err());
        assert_eq!(sink.plays.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_delivery_has_no_side_effects() {
        let sink = Arc::new(CountingSink::default());
        let (print_tx, mut print_rx) = mpsc::channel(8);
        let mut watcher = OrderWatcher::new()
            .with_print_queue(print_tx)
            .with_alert(AlertPlayer::new(sink.clone(), AlertTone::default()));

        watcher.process(&[order("a", 1, OrderStatus::Pending)]);
        settle().await;

        assert!(print_rx.try_recv().is_err());
        assert_eq!(sink.plays.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_full_print_queue_drops_without_blocking() {
        let (print_tx, mut print_rx) = mpsc::channel(1);
        let mut watcher = OrderWatcher::new().with_print_queue(print_tx);

        watcher.process(&[]);
        let changes = watcher.process(&[
            order("a", 1, OrderStatus::Pending),
            order("b", 2, OrderStatus::Pending),
        ]);

        assert_eq!(changes.new_orders.len(), 2);
        assert_eq!(print_rx.recv().await.unwrap().id, "a");
        assert!(print_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_processes_deliveries_in_order() {
        let (print_tx, mut print_rx) = mpsc::channel(8);
        let (source_tx, source_rx) = mpsc::channel(8);
        let watcher = OrderWatcher::new().with_print_queue(print_tx);

        source_tx.send(vec![]).await.unwrap();
        source_tx
            .send(vec![order("a", 1, OrderStatus::Pending)])
            .await
            .unwrap();
        source_tx
            .send(vec![
                order("a", 1, OrderStatus::Preparing),
                order("b", 2, OrderStatus::Pending),
            ])
            .await
            .unwrap();
        drop(source_tx);

        watcher.run(source_rx, CancellationToken::new()).await;

        assert_eq!(print_rx.recv().await.unwrap().id, "a");
        assert_eq!(print_rx.recv().await.unwrap().id, "b");
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (_source_tx, source_rx) = mpsc::channel::<Vec<OrderSnapshot>>(8);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        OrderWatcher::new().run(source_rx, shutdown).await;
    }
}
