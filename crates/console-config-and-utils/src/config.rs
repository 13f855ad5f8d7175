//! Configuration management for the console.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Default bot server origin (the host serving `/api` and `/ws`).
pub const DEFAULT_SERVER_ORIGIN: &str = "http://127.0.0.1:8080";

const ENV_LOG_LEVEL: &str = "BOTCONSOLE_LOG_LEVEL";
const ENV_SERVER: &str = "BOTCONSOLE_SERVER";

/// Console configuration, stored as `~/.botconsole/config.json`.
///
/// Every field has a default so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Origin of the bot server, e.g. `https://bot.example.com`.
    pub server_origin: String,
    /// REST request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Realtime reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Realtime backoff base delay in milliseconds.
    pub reconnect_base_delay_ms: u64,
    /// Realtime backoff cap in milliseconds.
    pub reconnect_max_delay_ms: u64,
    /// Replay `subscribe` commands for known groups after every reconnect.
    pub resubscribe_on_open: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            server_origin: DEFAULT_SERVER_ORIGIN.to_string(),
            request_timeout_secs: 10,
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1_000,
            reconnect_max_delay_ms: 30_000,
            resubscribe_on_open: true,
        }
    }
}

impl Config {
    /// Load configuration from the config file (if present), then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override fields from environment-style variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
        if let Some(server) = lookup(ENV_SERVER).filter(|v| !v.is_empty()) {
            self.server_origin = server;
        }
    }

    /// Check values that would otherwise fail much later.
    pub fn validate(&self) -> CoreResult<()> {
        let origin = self.server_origin()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "server origin must be http or https, got {}",
                origin.scheme()
            )));
        }
        if self.reconnect_base_delay_ms == 0 {
            return Err(CoreError::Config(
                "reconnect_base_delay_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the server origin as a parsed URL.
    pub fn server_origin(&self) -> CoreResult<Url> {
        Url::parse(&self.server_origin).map_err(CoreError::from)
    }
}
