//! Realtime error types.

use thiserror::Error;

/// Realtime client error type.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Server origin cannot be turned into a WebSocket endpoint
    #[error("Invalid server origin: {0}")]
    InvalidOrigin(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,
}

/// Result type alias using RealtimeError.
pub type RealtimeResult<T> = Result<T, RealtimeError>;
