//! # Observability
//!
//! Centralized logging layer for the GateFlow setup tools.
//!
//! Binaries call `observability::init_with_config()` once at startup and use
//! standard `tracing` macros everywhere else. Every log line is written as
//! structured JSONL to a single file (`~/.config/gateflow/logs/setup.jsonl` by
//! default), optionally mirrored to stderr.
//!
//! Fields that look like secret material (`private_key`, `access_token`,
//! `api_key`, `secret`, `token`) are redacted by the JSON layer before they
//! reach disk, so a careless `debug!(token = %value)` can't leak a credential.
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "gateflow-setup".into(),
//!         default_level: "info".into(),
//!         also_stderr: false,
//!         ..Default::default()
//!     });
//!     tracing::info!("ready");
//! }
//! ```

mod file_writer;
mod json_layer;

use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use file_writer::{CentralLogWriter, WriterFactory};
pub use json_layer::{is_sensitive_field, JsonLayer, LogEntry, REDACTED};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every log line.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG`.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.config/gateflow/logs/setup.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Central log file location.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".config")
            .join("gateflow")
            .join("logs")
            .join("setup.jsonl")
    })
}

/// Initialize the observability layer with custom configuration.
///
/// If the log file cannot be opened the JSONL layer is skipped and, when
/// `also_stderr` is off, nothing is emitted at all. Logging must never stop a
/// setup step from running. Calling this twice is a no-op.
pub fn init_with_config(config: LogConfig) {
    let log_path = config.log_path.clone().or_else(default_log_path);

    let json_layer = log_path
        .as_ref()
        .and_then(|path| CentralLogWriter::new(path).ok())
        .map(|writer| {
            JsonLayer::new(config.service_name.clone(), WriterFactory::new(writer))
                .with_filter(env_filter(&config.default_level))
        });

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            service = %config.service_name,
            log_path = ?log_path.as_ref().map(|p| p.display().to_string()),
            "observability initialized"
        );
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
