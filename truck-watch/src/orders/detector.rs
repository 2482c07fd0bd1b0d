//! Order change detection
//!
//! Diffs each delivered order list against the previous one and reports new
//! orders and status transitions. Each change is reported exactly once: the
//! baseline is replaced wholesale on every delivery, so re-delivering the
//! same list (or the same transition) yields nothing.

use std::collections::{HashMap, HashSet};

use shared::{OrderSnapshot, OrderStatus};
use tracing::debug;

/// An order whose status changed between two deliveries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub order_id: String,
    pub order_number: u32,
    pub previous: OrderStatus,
    pub current: OrderStatus,
    pub customer_name: String,
}

impl StatusTransition {
    /// Whether the customer should hear about this transition
    pub fn is_customer_visible(&self) -> bool {
        self.current.is_customer_visible()
    }
}

/// Changes found in one delivery
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderChanges {
    /// Orders not present in the previous delivery, in list order
    pub new_orders: Vec<OrderSnapshot>,
    /// Status changes, in list order
    pub transitions: Vec<StatusTransition>,
}

impl OrderChanges {
    pub fn is_empty(&self) -> bool {
        self.new_orders.is_empty() && self.transitions.is_empty()
    }
}

/// Order change detector
///
/// Deliveries must be fed in arrival order. The first delivery only
/// establishes the baseline, so orders that existed before watching began
/// never raise alerts.
#[derive(Debug, Default)]
pub struct OrderChangeDetector {
    baseline: Option<HashMap<String, OrderSnapshot>>,
}

impl OrderChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Last-seen snapshot of an order
    pub fn baseline_get(&self, order_id: &str) -> Option<&OrderSnapshot> {
        self.baseline.as_ref()?.get(order_id)
    }

    pub fn baseline_len(&self) -> usize {
        self.baseline.as_ref().map_or(0, HashMap::len)
    }

    /// Forget the baseline; the next delivery establishes a new one
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    /// Process one delivery and replace the baseline with it
    ///
    /// An id listed twice counts once, with its last occurrence winning.
    pub fn observe(&mut self, orders: &[OrderSnapshot]) -> OrderChanges {
        let current: HashMap<String, OrderSnapshot> = orders
            .iter()
            .map(|o| (o.id.clone(), o.clone()))
            .collect();

        let Some(previous) = self.baseline.as_ref() else {
            debug!(orders = current.len(), "Order baseline established");
            self.baseline = Some(current);
            return OrderChanges::default();
        };

        let mut changes = OrderChanges::default();
        let mut seen = HashSet::with_capacity(orders.len());

        for order in orders {
            if !seen.insert(order.id.as_str()) {
                continue;
            }
            let Some(latest) = current.get(&order.id) else {
                continue;
            };

            match previous.get(&order.id) {
                None => changes.new_orders.push(latest.clone()),
                Some(before) if before.status != latest.status => {
                    changes.transitions.push(StatusTransition {
                        order_id: latest.id.clone(),
                        order_number: latest.order_number,
                        previous: before.status,
                        current: latest.status,
                        customer_name: latest.customer_name.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        if !changes.is_empty() {
            debug!(
                new_orders = changes.new_orders.len(),
                transitions = changes.transitions.len(),
                "Order changes detected"
            );
        }

        self.baseline = Some(current);
        changes
    }
}
