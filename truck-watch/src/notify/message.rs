//! Order status notification messages

use serde::Serialize;
use serde_json::{Value, json};
use shared::OrderStatus;

use crate::orders::StatusTransition;

pub const NOTIFICATION_ICON: &str = "/icons/pwa-192x192.png";

/// Opened when the notification is clicked
pub const ORDERS_URL: &str = "/?tab=orders";

/// Notification button
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// One user-visible notification
///
/// Serializes to the platform's notification options shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Notifications sharing a tag replace each other
    pub tag: String,
    pub icon: String,
    pub badge: String,
    pub require_interaction: bool,
    pub silent: bool,
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Build the customer notification for a status transition
    ///
    /// Returns `None` for statuses the customer is not told about.
    pub fn for_transition(transition: &StatusTransition) -> Option<Self> {
        let body = status_message(transition.order_number, transition.current)?;

        Some(Self {
            title: format!("Hi {}!", transition.customer_name),
            body,
            tag: tag_for(&transition.order_id),
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_ICON.to_string(),
            require_interaction: false,
            silent: false,
            data: json!({
                "orderId": transition.order_id,
                "orderNumber": transition.order_number,
                "status": transition.current,
                "url": ORDERS_URL,
            }),
            actions: vec![NotificationAction {
                action: "view".to_string(),
                title: "View Order".to_string(),
            }],
        })
    }

    /// Drop action buttons (worker delivery on Android rejects some of them)
    pub fn without_actions(mut self) -> Self {
        self.actions.clear();
        self
    }
}

/// Dedupe tag for an order
pub fn tag_for(order_id: &str) -> String {
    format!("order-{order_id}")
}

/// Body text for a status, `None` if the status is not announced
pub fn status_message(order_number: u32, status: OrderStatus) -> Option<String> {
    match status {
        OrderStatus::Preparing => Some(format!("Your order #{order_number} is now being prepared")),
        OrderStatus::Ready => Some(format!("Your order #{order_number} is ready for pickup!")),
        OrderStatus::Pending | OrderStatus::Other => None,
    }
}
