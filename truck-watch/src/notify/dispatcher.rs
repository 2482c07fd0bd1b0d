//! Notification dispatcher
//!
//! Every dispatch runs on its own task. Failures are logged there and never
//! reach the caller, so a broken notification path cannot hold up the order
//! stream that triggered it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::OrderStatus;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::error::NotifyResult;
use super::message::Notification;
use super::platform::{DeliveryMethod, PermissionState, PlatformCapabilities};
use crate::orders::StatusTransition;

/// Default time a notification stays up without interaction
pub const AUTO_DISMISS: Duration = Duration::from_secs(10);

/// Platform permission prompt
#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    async fn request(&self) -> NotifyResult<PermissionState>;
}

/// Sink-assigned identity of one shown notification
pub type NotificationHandle = u64;

/// Somewhere notifications can be shown
///
/// A notification with the same tag as one already up replaces it. Each
/// `show` still gets its own handle, so auto-dismiss of a replaced
/// notification never closes its replacement.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show(&self, notification: &Notification) -> NotifyResult<NotificationHandle>;

    /// Close one shown notification; a handle already closed or replaced is a no-op
    async fn dismiss(&self, handle: NotificationHandle) -> NotifyResult<()>;
}

/// Notification dispatcher
pub struct NotificationDispatcher {
    capabilities: PlatformCapabilities,
    permission: Mutex<PermissionState>,
    prompt: Arc<dyn PermissionPrompt>,
    direct: Arc<dyn NotificationSink>,
    worker: Option<Arc<dyn NotificationSink>>,
    auto_dismiss: Duration,
}

impl NotificationDispatcher {
    /// Create a dispatcher
    ///
    /// `permission` is the platform's current answer; on platforms without
    /// notification support it is treated as denied.
    pub fn new(
        capabilities: PlatformCapabilities,
        permission: PermissionState,
        prompt: Arc<dyn PermissionPrompt>,
        direct: Arc<dyn NotificationSink>,
    ) -> Self {
        let permission = if capabilities.notifications_supported {
            permission
        } else {
            PermissionState::Denied
        };

        Self {
            capabilities,
            permission: Mutex::new(permission),
            prompt,
            direct,
            worker: None,
            auto_dismiss: AUTO_DISMISS,
        }
    }

    /// Attach the background worker registration
    pub fn with_worker(mut self, worker: Arc<dyn NotificationSink>) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Override auto-dismiss; zero leaves notifications up until closed
    pub fn with_auto_dismiss(mut self, after: Duration) -> Self {
        self.auto_dismiss = after;
        self
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    pub fn auto_dismiss(&self) -> Duration {
        self.auto_dismiss
    }

    pub fn permission(&self) -> PermissionState {
        *self.permission.lock()
    }

    pub fn can_request_permission(&self) -> bool {
        self.capabilities.can_prompt() && self.permission() == PermissionState::Default
    }

    pub fn delivery_method(&self) -> DeliveryMethod {
        match self.capabilities.delivery_method() {
            DeliveryMethod::Worker if self.worker.is_some() => DeliveryMethod::Worker,
            _ => DeliveryMethod::Direct,
        }
    }

    /// Ask the user for notification permission
    ///
    /// Only prompts from `Default`; `Granted` and `Denied` are final and are
    /// answered without prompting. Returns whether notifications may be
    /// shown.
    #[instrument(skip(self))]
    pub async fn request_permission(&self) -> bool {
        if !self.can_request_permission() {
            let current = self.permission();
            if current == PermissionState::Default {
                info!("Cannot request notification permission: unsupported or app not installed");
            }
            return current == PermissionState::Granted;
        }

        match self.prompt.request().await {
            Ok(answer) => {
                *self.permission.lock() = answer;
                info!(permission = %answer, "Notification permission answered");
                if answer == PermissionState::Denied && self.capabilities.requires_worker {
                    info!("Permission denied, it can only be re-enabled in site settings");
                }
                answer == PermissionState::Granted
            }
            Err(e) => {
                error!(error = %e, "Notification permission request failed");
                false
            }
        }
    }

    /// Notify the customer about a status transition
    ///
    /// Returns the delivery task, or `None` when nothing is sent (no
    /// permission or a status that is not announced).
    pub fn dispatch(&self, transition: &StatusTransition) -> Option<JoinHandle<()>> {
        if self.permission() != PermissionState::Granted {
            debug!(
                order_number = transition.order_number,
                permission = %self.permission(),
                "Notification permission not granted, skipping"
            );
            return None;
        }

        let Some(notification) = Notification::for_transition(transition) else {
            debug!(status = %transition.current, "No message for status");
            return None;
        };

        let method = self.delivery_method();
        let notification = match method {
            DeliveryMethod::Worker => notification.without_actions(),
            DeliveryMethod::Direct => notification,
        };

        Some(self.spawn_delivery(notification, method))
    }

    /// Show a canned "ready" notification so the user can check the setup
    pub fn send_test_notification(&self) -> Option<JoinHandle<()>> {
        self.dispatch(&StatusTransition {
            order_id: "test".to_string(),
            order_number: 123,
            previous: OrderStatus::Preparing,
            current: OrderStatus::Ready,
            customer_name: "Test User".to_string(),
        })
    }

    fn spawn_delivery(&self, notification: Notification, method: DeliveryMethod) -> JoinHandle<()> {
        let direct = Arc::clone(&self.direct);
        let worker = self.worker.clone();
        let auto_dismiss = self.auto_dismiss;

        tokio::spawn(async move {
            let tag = notification.tag.clone();

            let mut shown_by = None;
            if let (DeliveryMethod::Worker, Some(worker)) = (method, worker) {
                match worker.show(&notification).await {
                    Ok(handle) => shown_by = Some((worker, handle)),
                    Err(e) => {
                        warn!(error = %e, %tag, "Worker notification failed, falling back to direct")
                    }
                }
            }

            let (sink, handle) = match shown_by {
                Some(shown) => shown,
                None => match direct.show(&notification).await {
                    Ok(handle) => (direct, handle),
                    Err(e) => {
                        error!(error = %e, %tag, "Notification delivery failed");
                        return;
                    }
                },
            };
            debug!(%tag, handle, "Notification shown");

            if auto_dismiss.is_zero() {
                return;
            }
            tokio::time::sleep(auto_dismiss).await;
            if let Err(e) = sink.dismiss(handle).await {
                debug!(error = %e, %tag, handle, "Notification already closed");
            }
        })
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("capabilities", &self.capabilities)
            .field("permission", &self.permission())
            .field("delivery_method", &self.delivery_method())
            .field("auto_dismiss", &self.auto_dismiss)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPrompt {
        answer: Option<PermissionState>,
        calls: AtomicUsize,
    }

    impl FixedPrompt {
        fn answering(answer: PermissionState) -> Arc<Self> {
            Arc::new(Self {
                answer: Some(answer),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PermissionPrompt for FixedPrompt {
        async fn request(&self) -> NotifyResult<PermissionState> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .ok_or_else(|| NotifyError::Prompt("prompt closed".into()))
        }
    }

    /// Handles are indexes into `shown`
    #[derive(Default)]
    struct RecordingSink {
        shown: Mutex<Vec<Notification>>,
        dismissed: Mutex<Vec<NotificationHandle>>,
        fail: bool,
    }

    impl RecordingSink {
        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn show(&self, notification: &Notification) -> NotifyResult<NotificationHandle> {
            if self.fail {
                return Err(NotifyError::WorkerUnavailable("registration not ready".into()));
            }
            let mut shown = self.shown.lock();
            shown.push(notification.clone());
            Ok(shown.len() as NotificationHandle - 1)
        }

        async fn dismiss(&self, handle: NotificationHandle) -> NotifyResult<()> {
            self.dismissed.lock().push(handle);
            Ok(())
        }
    }

    fn ready(order_id: &str) -> StatusTransition {
        StatusTransition {
            order_id: order_id.to_string(),
            order_number: 7,
            previous: OrderStatus::Preparing,
            current: OrderStatus::Ready,
            customer_name: "Sam".to_string(),
        }
    }

    fn granted(capabilities: PlatformCapabilities, direct: Arc<RecordingSink>) -> NotificationDispatcher {
        NotificationDispatcher::new(
            capabilities,
            PermissionState::Granted,
            FixedPrompt::answering(PermissionState::Granted),
            direct,
        )
    }

    #[tokio::test]
    async fn test_request_permission_from_default() {
        let prompt = FixedPrompt::answering(PermissionState::Granted);
        let dispatcher = NotificationDispatcher::new(
            PlatformCapabilities::desktop(),
            PermissionState::Default,
            prompt.clone(),
            Arc::new(RecordingSink::default()),
        );

        assert!(dispatcher.can_request_permission());
        assert!(dispatcher.request_permission().await);
        assert_eq!(dispatcher.permission(), PermissionState::Granted);

        // Terminal: answered without prompting again
        assert!(dispatcher.request_permission().await);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_denied_is_terminal() {
        let prompt = FixedPrompt::answering(PermissionState::Denied);
        let dispatcher = NotificationDispatcher::new(
            PlatformCapabilities::desktop(),
            PermissionState::Default,
            prompt.clone(),
            Arc::new(RecordingSink::default()),
        );

        assert!(!dispatcher.request_permission().await);
        assert!(!dispatcher.request_permission().await);
        assert_eq!(dispatcher.permission(), PermissionState::Denied);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prompt_failure_keeps_default() {
        let dispatcher = NotificationDispatcher::new(
            PlatformCapabilities::desktop(),
            PermissionState::Default,
            FixedPrompt::failing(),
            Arc::new(RecordingSink::default()),
        );

        assert!(!dispatcher.request_permission().await);
        assert_eq!(dispatcher.permission(), PermissionState::Default);
    }

    #[tokio::test]
    async fn test_no_prompt_when_not_installed() {
        let prompt = FixedPrompt::answering(PermissionState::Granted);
        let capabilities = PlatformCapabilities {
            installed_app: false,
            ..PlatformCapabilities::desktop()
        };
        let dispatcher = NotificationDispatcher::new(
            capabilities,
            PermissionState::Default,
            prompt.clone(),
            Arc::new(RecordingSink::default()),
        );

        assert!(!dispatcher.request_permission().await);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_platform_is_denied() {
        let dispatcher = NotificationDispatcher::new(
            PlatformCapabilities::unsupported(),
            PermissionState::Granted,
            FixedPrompt::answering(PermissionState::Granted),
            Arc::new(RecordingSink::default()),
        );

        assert_eq!(dispatcher.permission(), PermissionState::Denied);
        assert!(dispatcher.dispatch(&ready("o1")).is_none());
    }

    #[tokio::test]
    async fn test_dispatch_without_permission_is_noop() {
        let direct = Arc::new(RecordingSink::default());
        let dispatcher = NotificationDispatcher::new(
            PlatformCapabilities::desktop(),
            PermissionState::Default,
            FixedPrompt::answering(PermissionState::Granted),
            direct.clone(),
        );

        assert!(dispatcher.dispatch(&ready("o1")).is_none());
        assert!(direct.shown.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_skips_unannounced_status() {
        let direct = Arc::new(RecordingSink::default());
        let dispatcher = granted(PlatformCapabilities::desktop(), direct.clone());

        let mut back_to_pending = ready("o1");
        back_to_pending.current = OrderStatus::Pending;
        assert!(dispatcher.dispatch(&back_to_pending).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_delivery_and_auto_dismiss() {
        let direct = Arc::new(RecordingSink::default());
        let dispatcher = granted(PlatformCapabilities::desktop(), direct.clone());

        let handle = dispatcher.dispatch(&ready("o1")).unwrap();
        handle.await.unwrap();

        let shown = direct.shown.lock().clone();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].tag, "order-o1");
        assert_eq!(shown[0].actions.len(), 1);
        assert_eq!(*direct.dismissed.lock(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notification_stays_until_dismiss_delay() {
        let direct = Arc::new(RecordingSink::default());
        let dispatcher = granted(PlatformCapabilities::desktop(), direct.clone());

        let handle = dispatcher.dispatch(&ready("o1")).unwrap();
        tokio::time::sleep(AUTO_DISMISS - Duration::from_millis(1)).await;
        assert_eq!(direct.shown.lock().len(), 1);
        assert!(direct.dismissed.lock().is_empty());

        handle.await.unwrap();
        assert_eq!(direct.dismissed.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_dismiss_closes_only_its_own_notification() {
        let direct = Arc::new(RecordingSink::default());
        let dispatcher = granted(PlatformCapabilities::desktop(), direct.clone());
        let mut preparing = ready("o1");
        preparing.previous = OrderStatus::Pending;
        preparing.current = OrderStatus::Preparing;

        let first = dispatcher.dispatch(&preparing).unwrap();
        tokio::time::sleep(Duration::from_secs(8)).await;
        let second = dispatcher.dispatch(&ready("o1")).unwrap();

        // t = 10.5s: the preparing timer has fired, the ready one is still up
        tokio::time::sleep(Duration::from_millis(2500)).await;
        first.await.unwrap();
        let shown = direct.shown.lock().clone();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].tag, shown[1].tag);
        assert_eq!(*direct.dismissed.lock(), vec![0]);

        // t = 18s: its own full delay later
        second.await.unwrap();
        assert_eq!(*direct.dismissed.lock(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_zero_auto_dismiss_leaves_notification_up() {
        let direct = Arc::new(RecordingSink::default());
        let dispatcher = granted(PlatformCapabilities::desktop(), direct.clone())
            .with_auto_dismiss(Duration::ZERO);

        dispatcher.dispatch(&ready("o1")).unwrap().await.unwrap();

        assert_eq!(direct.shown.lock().len(), 1);
        assert!(direct.dismissed.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_delivery_strips_actions() {
        let direct = Arc::new(RecordingSink::default());
        let worker = Arc::new(RecordingSink::default());
        let dispatcher =
            granted(PlatformCapabilities::android(), direct.clone()).with_worker(worker.clone());

        assert_eq!(dispatcher.delivery_method(), DeliveryMethod::Worker);
        dispatcher.dispatch(&ready("o1")).unwrap().await.unwrap();

        assert!(direct.shown.lock().is_empty());
        let shown = worker.shown.lock().clone();
        assert_eq!(shown.len(), 1);
        assert!(shown[0].actions.is_empty());
        assert_eq!(worker.dismissed.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_failure_falls_back_to_direct() {
        let direct = Arc::new(RecordingSink::default());
        let dispatcher = granted(PlatformCapabilities::android(), direct.clone())
            .with_worker(RecordingSink::failing());

        dispatcher.dispatch(&ready("o1")).unwrap().await.unwrap();

        assert_eq!(direct.shown.lock().len(), 1);
        assert_eq!(direct.dismissed.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_worker_platform_without_registration_uses_direct() {
        let direct = Arc::new(RecordingSink::default());
        let dispatcher = granted(PlatformCapabilities::android(), direct);
        assert_eq!(dispatcher.delivery_method(), DeliveryMethod::Direct);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_contained() {
        let dispatcher = granted(PlatformCapabilities::desktop(), RecordingSink::failing())
            .with_auto_dismiss(Duration::ZERO);

        // The task finishes cleanly; the error is only logged
        dispatcher.dispatch(&ready("o1")).unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_test_notification() {
        let direct = Arc::new(RecordingSink::default());
        let dispatcher = granted(PlatformCapabilities::desktop(), direct.clone())
            .with_auto_dismiss(Duration::ZERO);

        dispatcher.send_test_notification().unwrap().await.unwrap();

        let shown = direct.shown.lock().clone();
        assert_eq!(shown[0].title, "Hi Test User!");
        assert_eq!(shown[0].body, "Your order #123 is ready for pickup!");
    }
}
