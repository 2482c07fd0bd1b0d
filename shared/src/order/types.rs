//! Order line items

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Quantity (>= 1)
    pub quantity: u32,
    /// Menu item name, `None` when the menu reference no longer resolves
    #[serde(default)]
    pub name: Option<String>,
    /// Size label (e.g. "Large")
    pub size: String,
    /// Customizations in the order the customer picked them
    #[serde(default)]
    pub customizations: Vec<String>,
    /// Unit price
    pub unit_price: Decimal,
}

impl OrderItem {
    /// Unit price times quantity, `None` if it overflows `Decimal`
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}
