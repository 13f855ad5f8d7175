//! CLI command implementations.

mod auth;
mod groups;
mod plugins;
mod send;
mod watch;

pub use auth::{login, logout, status};
pub use groups::{groups_list, history};
pub use plugins::{plugins_action, plugins_list, plugins_set, plugins_show};
pub use send::{send, SendArgs};
pub use watch::watch;

use crate::output::OutputFormat;
use anyhow::{Context as _, Result};
use console_api::ApiClient;
use console_config_and_utils::{Config, Paths, TokenStore};
use console_realtime::RealtimeConfig;
use std::time::Duration;

/// Everything a command needs: resolved paths, effective configuration and
/// the output format.
#[derive(Debug, Clone)]
pub struct Context {
    pub paths: Paths,
    pub config: Config,
    pub format: OutputFormat,
}

impl Context {
    /// Load configuration and apply command-line overrides.
    pub fn load(
        server: Option<&str>,
        log_level: Option<&str>,
        format: OutputFormat,
    ) -> Result<Self> {
        let paths = Paths::new()?;
        paths.ensure_dirs()?;
        let config = Config::load(&paths).context("failed to load configuration")?;
        Self::from_parts(paths, config, server, log_level, format)
    }

    pub fn from_parts(
        paths: Paths,
        mut config: Config,
        server: Option<&str>,
        log_level: Option<&str>,
        format: OutputFormat,
    ) -> Result<Self> {
        if let Some(server) = server {
            config.server_origin = server.to_string();
        }
        if let Some(level) = log_level {
            config.log_level = level.to_string();
        }
        config.validate()?;

        Ok(Self {
            paths,
            config,
            format,
        })
    }

    pub fn token_store(&self) -> TokenStore {
        TokenStore::new(&self.paths)
    }

    /// REST client carrying the stored token, if any.
    pub fn api(&self) -> Result<ApiClient> {
        Ok(ApiClient::from_config(&self.config, self.token_store())?)
    }

    /// REST client that refuses to run without a stored token.
    pub fn authenticated_api(&self) -> Result<ApiClient> {
        let api = self.api()?;
        if !api.is_authenticated() {
            anyhow::bail!("Not logged in. Run 'botconsole login' first");
        }
        Ok(api)
    }

    pub fn realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            server_origin: self.config.server_origin.clone(),
            max_reconnect_attempts: self.config.max_reconnect_attempts,
            reconnect_base_delay: Duration::from_millis(self.config.reconnect_base_delay_ms),
            reconnect_max_delay: Duration::from_millis(self.config.reconnect_max_delay_ms),
            resubscribe_on_open: self.config.resubscribe_on_open,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn context(server: Option<&str>) -> (Result<Context>, TempDir) {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let ctx = Context::from_parts(paths, Config::default(), server, None, OutputFormat::Text);
        (ctx, dir)
    }

    #[test]
    fn test_server_flag_overrides_config() {
        let (ctx, _dir) = context(Some("https://bot.example.com"));
        let ctx = ctx.unwrap();
        assert_eq!(ctx.config.server_origin, "https://bot.example.com");
        assert_eq!(
            ctx.realtime_config().server_origin,
            "https://bot.example.com"
        );
    }

    #[test]
    fn test_invalid_server_flag_rejected() {
        let (ctx, _dir) = context(Some("ftp://bot.example.com"));
        assert!(ctx.is_err());
    }

    #[test]
    fn test_realtime_config_follows_config() {
        let dir = tempdir().unwrap();
        let config = Config {
            max_reconnect_attempts: 3,
            reconnect_base_delay_ms: 250,
            reconnect_max_delay_ms: 4_000,
            resubscribe_on_open: false,
            ..Default::default()
        };
        let ctx = Context::from_parts(
            Paths::with_base_dir(dir.path().to_path_buf()),
            config,
            None,
            Some("debug"),
            OutputFormat::Json,
        )
        .unwrap();

        let realtime = ctx.realtime_config();
        assert_eq!(realtime.max_reconnect_attempts, 3);
        assert_eq!(realtime.reconnect_base_delay, Duration::from_millis(250));
        assert_eq!(realtime.reconnect_max_delay, Duration::from_secs(4));
        assert!(!realtime.resubscribe_on_open);
        assert_eq!(ctx.config.log_level, "debug");
    }

    #[test]
    fn test_authenticated_api_requires_token() {
        let (ctx, _dir) = context(None);
        let ctx = ctx.unwrap();
        assert!(ctx.authenticated_api().is_err());

        ctx.token_store().save("abc").unwrap();
        assert_eq!(ctx.authenticated_api().unwrap().token(), Some("abc"));
    }
}
