//! Order snapshot - one order as last seen in the store

use super::types::OrderItem;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status
///
/// The store keeps status as a free-form string. Anything outside the known
/// lifecycle deserializes to [`OrderStatus::Other`] instead of failing the
/// whole snapshot list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    #[serde(other)]
    Other,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Other => "other",
        }
    }

    /// Statuses the customer is told about (preparing / ready)
    pub fn is_customer_visible(&self) -> bool {
        matches!(self, OrderStatus::Preparing | OrderStatus::Ready)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    /// Store-assigned order ID (stable across status changes)
    pub id: String,
    /// Human-facing order number shown on receipts and notifications
    pub order_number: u32,
    pub customer_name: String,
    pub status: OrderStatus,
    /// Creation time, Unix epoch millis
    pub created_at: i64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
}

impl OrderSnapshot {
    /// Sum of all line totals (the store's `total_amount` is authoritative)
    ///
    /// `None` if any line or the sum overflows.
    pub fn items_total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.line_total()?))
    }
}
