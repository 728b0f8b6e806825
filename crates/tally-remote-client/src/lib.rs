//! HTTP clients for the Tally records services
//!
//! Two remote tiers sit behind the Tally data-access layer:
//!
//! - [`RemoteClient`]: the primary records service. Responses are returned as
//!   raw JSON because their shape is not stable across endpoints; callers
//!   normalize them.
//! - [`ManagedStoreClient`]: a PostgREST-style managed store used when the
//!   primary service is disabled or unreachable.
//!
//! # Example
//!
//! ```rust,no_run
//! use tally_remote_client::{RemoteClient, RemoteConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RemoteClient::new(RemoteConfig {
//!     base_url: "http://localhost:3000/api".into(),
//!     ..Default::default()
//! })?;
//!
//! let body = client.get("/finance/transactions").await?;
//! println!("{body}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod managed;
pub mod types;

// Re-export main types
pub use client::RemoteClient;
pub use error::{RemoteError, Result};
pub use managed::ManagedStoreClient;
pub use types::*;

pub use reqwest::Method as HttpMethod;
