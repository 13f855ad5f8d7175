//! Error types for the REST client.

use console_config_and_utils::CoreError;
use thiserror::Error;

/// Errors returned by [`crate::ApiClient`].
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network or transport-level HTTP error, timeouts included.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the credential (HTTP 401). Log in again.
    #[error("Not authenticated, run `botconsole login`")]
    Unauthorized,

    /// Any other non-success status.
    #[error("Server error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server processed the request but reported a failure code.
    #[error("Request rejected ({code}): {message}")]
    Rejected { code: i64, message: String },

    /// Request failed client-side checks and was not sent.
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Token storage or configuration failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;
