//! Structured repository events
//!
//! Repositories report fallbacks and failures through an injected
//! [`RepositoryEvents`] sink instead of writing to a fixed log. The default
//! sink forwards to `tracing`.

use crate::source::SourceTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Repository operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn is_write(&self) -> bool {
        !matches!(self, Operation::List)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

/// Event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RepositoryEventKind {
    /// A tier failed to serve a call
    TierFailed {
        tier: SourceTier,
        reason: String,
    },
    /// The primary tier was dropped for the rest of the session
    Degraded,
    /// A call was completed by a tier other than the first one planned
    FallbackServed {
        tier: SourceTier,
    },
    /// A collection response matched none of the known shapes
    UnrecognizedShape {
        tier: SourceTier,
        keys: Vec<String>,
    },
    /// A remote write was copied into the local store
    Mirrored {
        id: String,
    },
}

/// One event, stamped with its origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEvent {
    pub timestamp: DateTime<Utc>,
    /// Entity name of the emitting repository
    pub entity: String,
    pub operation: Operation,
    #[serde(flatten)]
    pub kind: RepositoryEventKind,
}

impl RepositoryEvent {
    pub fn new(entity: impl Into<String>, operation: Operation, kind: RepositoryEventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            entity: entity.into(),
            operation,
            kind,
        }
    }
}

/// Sink for repository events
pub trait RepositoryEvents: Send + Sync {
    fn record(&self, event: &RepositoryEvent);
}

/// Default sink: structured `tracing` output
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl RepositoryEvents for TracingEvents {
    fn record(&self, event: &RepositoryEvent) {
        let entity = event.entity.as_str();
        let operation = event.operation;
        match &event.kind {
            RepositoryEventKind::TierFailed { tier, reason } => {
                warn!(entity, %operation, %tier, reason = reason.as_str(), "tier failed");
            }
            RepositoryEventKind::Degraded => {
                info!(entity, %operation, "primary remote degraded for this session");
            }
            RepositoryEventKind::FallbackServed { tier } => {
                debug!(entity, %operation, %tier, "served by fallback tier");
            }
            RepositoryEventKind::UnrecognizedShape { tier, keys } => {
                warn!(entity, %operation, %tier, keys = ?keys, "unrecognized response shape, treating as empty");
            }
            RepositoryEventKind::Mirrored { id } => {
                debug!(entity, %operation, id = id.as_str(), "mirrored into local store");
            }
        }
    }
}
