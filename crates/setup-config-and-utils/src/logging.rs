//! Logging initialization for the setup tools.
//!
//! Thin wrapper over the observability crate. Every binary writes structured
//! JSONL to `~/.config/gateflow/logs/setup.jsonl` with secret fields redacted.

pub use observability::{init_with_config, LogConfig};

use std::path::PathBuf;

/// Initialize the logging system.
///
/// # Arguments
///
/// * `service_name` - Name recorded on every log line
/// * `level` - Default log level (trace, debug, info, warn, error); `RUST_LOG` wins
/// * `log_path` - JSONL file, or `None` for the default location
/// * `also_stderr` - Mirror log lines to stderr
///
/// # Example
///
/// ```ignore
/// init_logging("gateflow-setup", "info", None, false);
/// tracing::info!("setup started");
/// ```
pub fn init_logging(service_name: &str, level: &str, log_path: Option<PathBuf>, also_stderr: bool) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).to_string().to_ascii_lowercase(),
        log_path,
        also_stderr,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
