//! Order snapshots
//!
//! Immutable values produced by the external order store. Every status change
//! produces a new snapshot with the same `id`; consumers never mutate them.

pub mod snapshot;
pub mod types;

// Re-exports
pub use snapshot::{OrderSnapshot, OrderStatus};
pub use types::OrderItem;
