use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::alert::{AlertTone, DEFAULT_VOLUME};
use crate::printing::{FEED_LINES, RECEIPT_WIDTH, ReceiptRenderer};

/// Watcher configuration
///
/// # Environment variables
///
/// Every setting can be overridden from the environment. Values that fail to
/// parse fall back to the default.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | RECEIPT_WIDTH | 42 | Characters per receipt line |
/// | RECEIPT_TIMEZONE | Australia/Sydney | IANA timezone for receipt timestamps |
/// | RECEIPT_FEED_LINES | 4 | Blank lines fed before the cut |
/// | PRINT_TIMEOUT_MS | 10000 | USB transfer timeout, 0 disables |
/// | PRINT_QUEUE_CAPACITY | 32 | Pending auto-print jobs before new ones are dropped |
/// | NOTIFICATION_DISMISS_MS | 10000 | Auto-dismiss delay, 0 disables |
/// | ALERT_VOLUME | 0.3 | New-order tone volume (0.0 - 1.0) |
/// | LOG_LEVEL | info | Default log filter when RUST_LOG is unset |
/// | LOG_DIR | (unset) | Directory for daily rolling log files |
///
/// # Example
///
/// ```ignore
/// RECEIPT_TIMEZONE=Australia/Perth PRINT_TIMEOUT_MS=0 truck-watch
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    pub receipt_width: usize,
    pub timezone: Tz,
    pub feed_lines: u8,
    /// USB transfer timeout (ms), 0 = wait for the hardware
    pub print_timeout_ms: u64,
    pub print_queue_capacity: usize,
    /// Notification auto-dismiss delay (ms), 0 = never
    pub notification_dismiss_ms: u64,
    pub alert_volume: f32,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl WatchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup
    ///
    /// Mostly for tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).map(|v| v.trim().to_string());

        Self {
            receipt_width: parse_or(parse("RECEIPT_WIDTH"), defaults.receipt_width)
                .max(MIN_RECEIPT_WIDTH),
            timezone: parse_or(parse("RECEIPT_TIMEZONE"), defaults.timezone),
            feed_lines: parse_or(parse("RECEIPT_FEED_LINES"), defaults.feed_lines),
            print_timeout_ms: parse_or(parse("PRINT_TIMEOUT_MS"), defaults.print_timeout_ms),
            print_queue_capacity: parse_or(
                parse("PRINT_QUEUE_CAPACITY"),
                defaults.print_queue_capacity,
            )
            .max(1),
            notification_dismiss_ms: parse_or(
                parse("NOTIFICATION_DISMISS_MS"),
                defaults.notification_dismiss_ms,
            ),
            alert_volume: parse_or::<f32>(parse("ALERT_VOLUME"), defaults.alert_volume)
                .clamp(0.0, 1.0),
            log_level: parse("LOG_LEVEL")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.log_level),
            log_dir: parse("LOG_DIR").filter(|v| !v.is_empty()),
        }
    }

    pub fn print_timeout(&self) -> Option<Duration> {
        (self.print_timeout_ms > 0).then(|| Duration::from_millis(self.print_timeout_ms))
    }

    pub fn notification_dismiss(&self) -> Duration {
        Duration::from_millis(self.notification_dismiss_ms)
    }

    pub fn receipt_renderer(&self) -> ReceiptRenderer {
        ReceiptRenderer::new(self.receipt_width, self.timezone).with_feed_lines(self.feed_lines)
    }

    pub fn alert_tone(&self) -> AlertTone {
        AlertTone::new(self.alert_volume)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            receipt_width: RECEIPT_WIDTH,
            timezone: chrono_tz::Australia::Sydney,
            feed_lines: FEED_LINES,
            print_timeout_ms: 10_000,
            print_queue_capacity: 32,
            notification_dismiss_ms: 10_000,
            alert_volume: DEFAULT_VOLUME,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// Narrowest line that still fits "TOTAL" and a price
const MIN_RECEIPT_WIDTH: usize = 16;

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
