//! Error types for the Tally SDK

use thiserror::Error;

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, TallyError>;

/// SDK error types
#[derive(Error, Debug)]
pub enum TallyError {
    /// The records service rejected the operation
    #[error("Application error: {message}")]
    Application { message: String },

    /// Remote tier error
    #[error("Remote error: {0}")]
    Remote(String),

    /// Local store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(feature = "client")]
impl From<tally_remote_client::RemoteError> for TallyError {
    fn from(err: tally_remote_client::RemoteError) -> Self {
        TallyError::Remote(err.to_string())
    }
}

impl From<serde_json::Error> for TallyError {
    fn from(err: serde_json::Error) -> Self {
        TallyError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for TallyError {
    fn from(err: toml::de::Error) -> Self {
        TallyError::Config(err.to_string())
    }
}

impl From<std::io::Error> for TallyError {
    fn from(err: std::io::Error) -> Self {
        TallyError::Storage(err.to_string())
    }
}
