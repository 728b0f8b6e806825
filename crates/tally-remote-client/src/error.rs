//! Error types for the remote clients

use thiserror::Error;

/// Remote client error
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed before a response arrived (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client could not be configured
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for remote operations
pub type Result<T> = std::result::Result<T, RemoteError>;
