//! # Logging
//!
//! Sets up the `tracing` subscriber for the binary.
//!
//! Output always goes to stdout. When `logging.log_dir` is set, a daily
//! rolling file `padcar.log` in that directory receives a copy. `RUST_LOG`
//! takes precedence over `logging.level`.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// File name prefix of the rolling log file
pub const LOG_FILE_NAME: &str = "padcar.log";

/// Builds the filter for a configured level, falling back to `info` if the
/// directive does not parse.
#[must_use]
pub fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.
///
/// The returned guard flushes the log file when dropped and must be held
/// until the process exits.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(&config.level));

    let (file_layer, guard) = if config.log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_for_valid_level() {
        assert_eq!(filter_for("debug").to_string(), "debug");
    }

    #[test]
    fn test_filter_for_invalid_level_falls_back() {
        assert_eq!(filter_for("padcar=loud").to_string(), "info");
    }
}
