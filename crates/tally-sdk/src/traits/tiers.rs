//! Primary remote and managed store traits

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Request method understood by the primary remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        })
    }
}

/// Why a tier failed to serve a call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TierError {
    /// Unreachable, timed out, or answered with something unreadable
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered and refused
    #[error("application failure: {0}")]
    Application(String),

    /// The addressed record does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

/// The primary records service
///
/// Resolves to the raw response body: an envelope
/// (`{"success": .., "data": .., "message": ..}`) or a bare array/object.
/// A `success: false` envelope is a successful call at this level; the
/// repository decides what it means.
#[async_trait]
pub trait PrimaryRemote: Send + Sync {
    async fn request(&self, path: &str, method: Method, body: Option<Value>) -> Result<Value, TierError>;
}

/// Query client over named collections of a managed store
#[async_trait]
pub trait ManagedStore: Send + Sync {
    async fn select(&self, collection: &str) -> Result<Vec<Value>, TierError>;

    /// Insert and return the stored row
    async fn insert(&self, collection: &str, row: Value) -> Result<Value, TierError>;

    /// Patch a row; `None` when no row has `id`
    async fn update(&self, collection: &str, id: &str, changes: Value) -> Result<Option<Value>, TierError>;

    /// Delete a row; `false` when no row had `id`
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, TierError>;
}
