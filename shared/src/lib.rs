//! Shared types for the food-truck order pipeline
//!
//! Order snapshots as delivered by the external order store, plus the small
//! formatting helpers every consumer needs.

pub mod order;
pub mod util;

// Re-exports
pub use order::{OrderItem, OrderSnapshot, OrderStatus};
pub use rust_decimal::Decimal;
pub use serde::{Deserialize, Serialize};
pub use util::format_money;
