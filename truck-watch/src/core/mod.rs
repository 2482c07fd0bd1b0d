//! Core: configuration, order routing and pipeline assembly

pub mod config;
pub mod pipeline;
pub mod watcher;

pub use config::WatchConfig;
pub use pipeline::{CustomerPipeline, StaffPipeline};
pub use watcher::OrderWatcher;
