//! REST client for the bot server.
//!
//! Covers the console's request/response surface: token login, bot and
//! group listings, group history, broadcast sending and plugin settings.
//! Live traffic goes through `console-realtime` instead.

mod client;
mod error;
mod message;
mod plugins;
mod types;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use message::{MessageContent, SendMessageRequest, SendResult};
pub use plugins::{
    ActionResult, ConfigField, Plugin, PluginAction, PluginInfo, PluginSetting,
    PluginSettingType, PluginSummary,
};
pub use types::{AuthResponse, BotInfo, ChatGroup, UserRole};

pub use console_realtime::ChatMessage;
