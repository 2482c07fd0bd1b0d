//! Logging Infrastructure
//!
//! Structured logging setup for development (stdout) and installed
//! deployments (daily rolling files).

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::core::WatchConfig;

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, false, None);
}

/// Initialize the logger from configuration
pub fn init_logger_from_config(config: &WatchConfig) {
    init_logger_with_file(Some(&config.log_level), false, config.log_dir.as_deref());
}

/// Initialize the logger with optional file output
///
/// `RUST_LOG` takes precedence over `log_level`. A `log_dir` that does not
/// exist is ignored and logs go to stdout. Calling this more than once keeps
/// the first subscriber.
pub fn init_logger_with_file(log_level: Option<&str>, json: bool, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let writer = match log_dir.map(Path::new) {
        Some(dir) if dir.is_dir() => {
            BoxMakeWriter::new(tracing_appender::rolling::daily(dir, "truck-watch"))
        }
        _ => BoxMakeWriter::new(std::io::stdout),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false)
        .with_writer(writer);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("Logger already initialized");
    }
}
