//! # Observability
//!
//! Logging initialisation for the bot console crates.
//!
//! Binaries call `observability::init_with_config()` once at startup and use
//! the standard `tracing` macros everywhere else. Library crates never install
//! a subscriber themselves.
//!
//! Two sinks are supported:
//!
//! - a JSONL file (`~/.botconsole/logs/console.jsonl` by default), one
//!   structured entry per line, safe to `tail -f | jq`
//! - an optional compact stderr layer for interactive use
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "cli".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!     tracing::info!("ready");
//! }
//! ```

mod file;
mod json_layer;

pub use file::{default_log_path, CentralLogWriter};
pub use json_layer::{JsonLayer, LogEntry};

use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "cli", "watch").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.botconsole/logs/console.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Write JSONL entries to the log file.
    pub to_file: bool,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            to_file: true,
            also_stderr: false,
        }
    }
}

/// Initialize the logging system with default settings.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize the logging system with custom configuration.
///
/// If the log file cannot be opened the file sink is skipped and a stderr
/// layer is installed instead, so a read-only home directory never stops the
/// console from starting.
pub fn init_with_config(config: LogConfig) {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let log_path = config.log_path.clone().or_else(default_log_path);

    let (json_layer, file_error) = if config.to_file {
        match log_path.as_ref().map(CentralLogWriter::new) {
            Some(Ok(writer)) => (
                Some(JsonLayer::new(config.service_name.clone(), writer).with_filter(filter())),
                None,
            ),
            Some(Err(e)) => (None, Some(e.to_string())),
            None => (None, Some("home directory not found".to_string())),
        }
    } else {
        (None, None)
    };

    let want_stderr = config.also_stderr || file_error.is_some();
    let stderr_layer = want_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(filter())
    });

    // try_init: a second initialisation (tests, embedding) is not fatal
    let _ = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init();

    match file_error {
        Some(error) => tracing::warn!(error = %error, "log file unavailable, using stderr"),
        None => tracing::debug!(
            service = %config.service_name,
            log_path = ?log_path,
            "observability initialized"
        ),
    }
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
