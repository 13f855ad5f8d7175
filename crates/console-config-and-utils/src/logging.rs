//! Logging initialization for console binaries.
//!
//! Thin wrapper around the observability crate: structured JSONL goes to
//! `~/.botconsole/logs/console.jsonl`, stderr output is opt-in.

use crate::Paths;

/// Initialize logging for a console service.
///
/// `RUST_LOG` overrides `level`. Setting `BOTCONSOLE_LOG_STDERR=1` mirrors
/// log lines to stderr, which is useful while running `watch`.
pub fn init_logging(service_name: &str, level: &str, paths: Option<&Paths>) {
    let also_stderr = std::env::var("BOTCONSOLE_LOG_STDERR")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    observability::init_with_config(observability::LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path: paths.map(Paths::log_file),
        also_stderr,
        ..Default::default()
    });
}
