//! Pipeline assembly
//!
//! Builds the staff and customer sides from a [`WatchConfig`]. Hardware and
//! platform hooks (USB host, audio output, notification sinks) come from the
//! embedding shell.
//!
//! ```text
//! WatchConfig
//!   ├── StaffPipeline:    UsbPrinter ─► PrinterController ─► PrintWorker
//!   │                     OrderWatcher ── print queue + AlertPlayer
//!   └── CustomerPipeline: OrderWatcher ── NotificationDispatcher
//! ```

use std::sync::Arc;

use shared::OrderSnapshot;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use truck_printer::{UsbHost, UsbPrinter};

use super::config::WatchConfig;
use super::watcher::OrderWatcher;
use crate::alert::{AlertPlayer, AudioSink};
use crate::notify::NotificationDispatcher;
use crate::printing::{PrintJob, PrintWorker, PrinterController};

/// Staff screen: new-order alert and auto-printed receipts
pub struct StaffPipeline {
    controller: Arc<PrinterController>,
    watcher: OrderWatcher,
    worker: PrintWorker,
    print_rx: mpsc::Receiver<PrintJob>,
}

impl StaffPipeline {
    /// Build the staff side
    ///
    /// Awaits one silent reconnect to a previously authorized printer.
    pub async fn from_config(
        config: &WatchConfig,
        host: Arc<dyn UsbHost>,
        audio: Arc<dyn AudioSink>,
    ) -> Self {
        let mut transport = UsbPrinter::new(host);
        if let Some(timeout) = config.print_timeout() {
            transport = transport.with_transfer_timeout(timeout);
        }

        let controller =
            Arc::new(PrinterController::attach(Arc::new(transport), config.receipt_renderer()).await);

        let (print_tx, print_rx) = mpsc::channel(config.print_queue_capacity);
        let watcher = OrderWatcher::new()
            .with_print_queue(print_tx)
            .with_alert(AlertPlayer::new(audio, config.alert_tone()));
        let worker = PrintWorker::new(Arc::clone(&controller));

        tracing::info!(
            printer = %controller.status(),
            receipt_width = config.receipt_width,
            timezone = %config.timezone,
            print_queue = config.print_queue_capacity,
            "Staff pipeline ready"
        );

        Self {
            controller,
            watcher,
            worker,
            print_rx,
        }
    }

    /// Printer controls for the staff UI (pair, disconnect, status)
    pub fn controller(&self) -> &Arc<PrinterController> {
        &self.controller
    }

    pub fn watcher(&self) -> &OrderWatcher {
        &self.watcher
    }

    /// Run until the source closes or shutdown
    ///
    /// When the source closes, jobs already queued are still printed.
    pub async fn run(
        self,
        source: mpsc::Receiver<Vec<OrderSnapshot>>,
        shutdown: CancellationToken,
    ) {
        let Self {
            watcher,
            worker,
            print_rx,
            ..
        } = self;

        let worker = tokio::spawn(worker.run(print_rx, shutdown.clone()));
        // Dropping the watcher closes the print queue and lets the worker finish
        watcher.run(source, shutdown).await;

        if let Err(e) = worker.await {
            tracing::error!(error = %e, "Print worker task failed");
        }
    }
}

/// Customer screen: status notifications for the customer's orders
pub struct CustomerPipeline {
    notifier: Arc<NotificationDispatcher>,
    watcher: OrderWatcher,
}

impl CustomerPipeline {
    /// Build the customer side around a platform dispatcher
    ///
    /// The configured auto-dismiss delay replaces the dispatcher's own.
    pub fn from_config(config: &WatchConfig, dispatcher: NotificationDispatcher) -> Self {
        let notifier = Arc::new(dispatcher.with_auto_dismiss(config.notification_dismiss()));
        let watcher = OrderWatcher::new().with_notifier(Arc::clone(&notifier));

        tracing::info!(
            delivery = ?notifier.delivery_method(),
            permission = %notifier.permission(),
            "Customer pipeline ready"
        );

        Self { notifier, watcher }
    }

    /// Permission prompt and test notification for the customer UI
    pub fn notifier(&self) -> &Arc<NotificationDispatcher> {
        &self.notifier
    }

    pub fn watcher(&self) -> &OrderWatcher {
        &self.watcher
    }

    /// Run until the source closes or shutdown
    pub async fn run(
        self,
        source: mpsc::Receiver<Vec<OrderSnapshot>>,
        shutdown: CancellationToken,
    ) {
        self.watcher.run(source, shutdown).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertTone, SoundResult};
    use crate::notify::{
        Notification, NotificationHandle, NotificationSink, NotifyResult, PermissionPrompt,
        PermissionState, PlatformCapabilities,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;
    use truck_printer::PrinterStatus;
    use truck_printer::usb::mock::{MockUsbDevice, MockUsbHost};

    struct Silent;

    #[async_trait]
    impl AudioSink for Silent {
        async fn play(&self, _tone: &AlertTone) -> SoundResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl NotificationSink for Silent {
        async fn show(&self, _notification: &Notification) -> NotifyResult<NotificationHandle> {
            Ok(0)
        }

        async fn dismiss(&self, _handle: NotificationHandle) -> NotifyResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl PermissionPrompt for Silent {
        async fn request(&self) -> NotifyResult<PermissionState> {
            Ok(PermissionState::Granted)
        }
    }

    fn config(vars: &[(&str, &str)]) -> WatchConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WatchConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[tokio::test]
    async fn test_staff_pipeline_applies_config() {
        let host = MockUsbHost::new();
        host.authorize(MockUsbDevice::printer("TM-T20"));
        let config = config(&[
            ("RECEIPT_WIDTH", "32"),
            ("RECEIPT_FEED_LINES", "6"),
            ("PRINT_TIMEOUT_MS", "250"),
            ("PRINT_QUEUE_CAPACITY", "4"),
            ("ALERT_VOLUME", "0.5"),
        ]);

        let pipeline = StaffPipeline::from_config(&config, host, Arc::new(Silent)).await;

        let controller = pipeline.controller();
        assert_eq!(controller.status(), PrinterStatus::Connected);
        assert_eq!(controller.renderer().width(), 32);
        assert_eq!(controller.renderer().feed_lines(), 6);
        assert_eq!(
            controller.transport().transfer_timeout(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(pipeline.watcher().print_queue_capacity(), Some(4));
        assert_eq!(pipeline.watcher().alert().unwrap().tone().volume(), 0.5);
    }

    #[tokio::test]
    async fn test_zero_print_timeout_waits_for_hardware() {
        let config = config(&[("PRINT_TIMEOUT_MS", "0")]);

        let pipeline =
            StaffPipeline::from_config(&config, MockUsbHost::new(), Arc::new(Silent)).await;

        assert_eq!(pipeline.controller().transport().transfer_timeout(), None);
        assert!(!pipeline.controller().is_connected());
    }

    #[tokio::test]
    async fn test_customer_pipeline_applies_dismiss_delay() {
        let config = config(&[("NOTIFICATION_DISMISS_MS", "3000")]);
        let dispatcher = NotificationDispatcher::new(
            PlatformCapabilities::desktop(),
            PermissionState::Granted,
            Arc::new(Silent),
            Arc::new(Silent),
        );

        let pipeline = CustomerPipeline::from_config(&config, dispatcher);

        assert_eq!(pipeline.notifier().auto_dismiss(), Duration::from_secs(3));
        assert!(pipeline.watcher().print_queue_capacity().is_none());
        assert!(pipeline.watcher().alert().is_none());
    }
}
