//! Real-time messaging client for the bot console.
//!
//! This crate provides:
//! - One WebSocket connection to the bot server's `/ws` endpoint
//! - Per-group subscriptions with handler tokens
//! - Automatic reconnection with capped exponential backoff
//! - A pluggable transport (`Connector`) so the client runs against fakes
//!
//! ```rust,ignore
//! let client = RealtimeClient::with_websocket(RealtimeConfig::default())?;
//! client.connect(&token, LifecycleCallbacks::new().on_open(|| println!("online"))).await;
//! let id = client.subscribe_to_group("42", |msg| println!("{}: {}", msg.nickname, msg.content)).await;
//! // ...
//! client.unsubscribe_from_group("42", id).await;
//! client.disconnect().await;
//! ```

mod client;
mod config;
mod error;
mod messages;
mod registry;
mod transport;

#[cfg(test)]
mod tests;

pub use client::{
    ConnectionState, CredentialSource, LifecycleCallback, LifecycleCallbacks, RealtimeClient,
    RealtimeEvent,
};
pub use config::RealtimeConfig;
pub use error::{RealtimeError, RealtimeResult};
pub use messages::{ChatMessage, InboundEvent, OutboundCommand};
pub use registry::{MessageHandler, Removal, SubscriptionId, SubscriptionRegistry};
pub use transport::{
    realtime_endpoint, realtime_url, Connector, FrameSink, FrameStream, TransportConnection,
    TransportFrame, WebSocketConnector,
};
