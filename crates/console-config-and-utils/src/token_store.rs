//! Persisted operator credential.
//!
//! The bearer token survives between CLI invocations and is re-read by the
//! realtime client each time it reconnects, so a `login` in another terminal
//! is picked up by a running `watch`.

use crate::{CoreResult, Paths};
use std::path::PathBuf;
use tracing::debug;

/// File-backed storage for the bearer token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Store located at `~/.botconsole/auth_token`.
    pub fn new(paths: &Paths) -> Self {
        Self {
            path: paths.token_file(),
        }
    }

    /// Store at an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read the stored token. A missing or blank file is `None`.
    pub fn load(&self) -> CoreResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a token, replacing any previous one.
    pub fn save(&self, token: &str) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token.trim())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %self.path.display(), "stored auth token");
        Ok(())
    }

    /// Remove the stored token. Clearing an empty store is not an error.
    pub fn clear(&self) -> CoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
