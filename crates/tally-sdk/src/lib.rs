//! Tally SDK - resilient data access for business records
//!
//! Every screen of the Tally front end (finance, warehouse, workforce) reads
//! and writes its records through a [`Repository`]. A repository never leaves
//! the UI with nothing to show: it tries the data tiers in order and
//! degrades when one of them fails.
//!
//! # Architecture
//!
//! ```text
//! UI ──► Repository ──► SourceSelector ──┬─► Primary remote ──► RecordMapper
//!            │                           ├─► Managed store  ──► RecordMapper
//!            │                           └─► LocalStore
//!            └──── writes mirrored into ────► LocalStore
//! ```
//!
//! - **Primary remote**: the records service. Its responses drift in shape, so
//!   every payload goes through the [`mapper`].
//! - **Managed store**: a hosted table store, used when the primary service is
//!   switched off or has failed.
//! - **Local store**: a key/value blob that holds seed data and mirrored writes.
//!
//! Once the primary tier fails, a repository stays degraded for its lifetime.
//!
//! # Example
//!
//! ```rust,ignore
//! use tally_sdk::{payload, Repositories, TallyConfig};
//! use serde_json::json;
//!
//! let repos = Repositories::from_config(&TallyConfig::from_env())?;
//!
//! let movements = repos.movements.list().await;
//! let tx = repos
//!     .transactions
//!     .create(payload(json!({"amount": 100, "type": "INCOME"})))
//!     .await?;
//! ```

// Canonical record type
pub mod record;

// Payload normalization
pub mod mapper;

// Durable local store
pub mod store;

// Tier selection and degradation
pub mod source;

// Tier interfaces
pub mod traits;

// Structured repository events
pub mod events;

// Repositories
pub mod repository;

// Entity schemas
pub mod entities;

// Derived view-model summaries
pub mod summary;

// Configuration
pub mod config;

// Error types
pub mod error;

// HTTP tier adapters
#[cfg(feature = "client")]
pub mod remote;

pub use config::{ManagedConfig, PrimaryConfig, StoreBackendKind, StoreConfig, TallyConfig};
pub use error::{Result, TallyError};
pub use events::{Operation, RepositoryEvent, RepositoryEventKind, RepositoryEvents, TracingEvents};
pub use mapper::{EntitySchema, FieldDefault, FieldKind, FieldRule, RecordMapper};
pub use record::{RawPayload, Record};
pub use repository::{payload, Repositories, Repository, RepositoryBuilder, WritePolicy};
pub use source::{DegradationState, SourceSelector, SourceTier, TierCapabilities};
pub use store::{FileBackend, KeyValueBackend, LocalStore, MemoryBackend, UnavailableBackend};
pub use summary::{ShiftSummary, StockSummary, TransactionSummary};
pub use traits::{ManagedStore, Method, PrimaryRemote, TierError};

#[cfg(feature = "client")]
pub use tally_remote_client::{ManagedStoreClient, ManagedStoreConfig, RemoteClient, RemoteConfig};
