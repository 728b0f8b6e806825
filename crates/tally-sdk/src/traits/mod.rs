//! Interfaces of the remote tiers
//!
//! Repositories only see these traits. The HTTP implementations live in
//! [`crate::remote`]; tests plug in fakes.

mod tiers;

pub use tiers::{ManagedStore, Method, PrimaryRemote, TierError};
