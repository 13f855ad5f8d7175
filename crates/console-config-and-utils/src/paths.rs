//! File system paths for the console.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Manages file system paths for the console.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for console files (~/.botconsole)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.botconsole`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".botconsole"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.botconsole).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.botconsole/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the stored credential path (~/.botconsole/auth_token).
    pub fn token_file(&self) -> PathBuf {
        self.base_dir.join("auth_token")
    }

    /// Get the logs directory (~/.botconsole/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file path (~/.botconsole/logs/console.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("console.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
