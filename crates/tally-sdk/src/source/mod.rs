//! Tier selection and sticky degradation
//!
//! A repository consults up to three tiers, in priority order:
//!
//! 1. **Primary remote** - the records service
//! 2. **Managed store** - hosted tables, when configured
//! 3. **Local store** - always present
//!
//! The selector turns that into a per-call plan. After the primary tier
//! fails once, the [`DegradationState`] flips and the primary tier drops out
//! of every later plan.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A data source a repository may consult
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    PrimaryRemote = 0,
    ManagedStore = 1,
    LocalStore = 2,
}

impl SourceTier {
    /// Lower is consulted first
    pub fn priority(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTier::PrimaryRemote => "primary_remote",
            SourceTier::ManagedStore => "managed_store",
            SourceTier::LocalStore => "local_store",
        }
    }
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a tier may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCapabilities {
    pub read: bool,
    pub write: bool,
}

impl TierCapabilities {
    pub const READ_WRITE: Self = Self { read: true, write: true };
    pub const READ_ONLY: Self = Self { read: true, write: false };

    pub fn allows(&self, write: bool) -> bool {
        if write {
            self.write
        } else {
            self.read
        }
    }
}

impl Default for TierCapabilities {
    fn default() -> Self {
        Self::READ_WRITE
    }
}

/// Sticky nominal/degraded flag
///
/// Starts nominal, flips to degraded at most once, and never flips back.
/// Clones share the flag, so a state can be handed to a repository and
/// observed from a test.
#[derive(Debug, Clone, Default)]
pub struct DegradationState {
    degraded: Arc<AtomicBool>,
}

impl DegradationState {
    pub fn nominal() -> Self {
        Self::default()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Mark degraded; `true` only for the call that made the transition
    pub fn degrade(&self) -> bool {
        !self.degraded.swap(true, Ordering::AcqRel)
    }
}

/// Per-repository tier planner
#[derive(Debug, Clone)]
pub struct SourceSelector {
    has_primary: bool,
    primary_enabled: bool,
    has_managed: bool,
    primary_caps: TierCapabilities,
    managed_caps: TierCapabilities,
    state: DegradationState,
}

impl SourceSelector {
    pub fn new(has_primary: bool, has_managed: bool, state: DegradationState) -> Self {
        Self {
            has_primary,
            primary_enabled: true,
            has_managed,
            primary_caps: TierCapabilities::default(),
            managed_caps: TierCapabilities::default(),
            state,
        }
    }

    /// Administrative switch for the primary tier
    pub fn with_primary_enabled(mut self, enabled: bool) -> Self {
        self.primary_enabled = enabled;
        self
    }

    pub fn with_capabilities(mut self, primary: TierCapabilities, managed: TierCapabilities) -> Self {
        self.primary_caps = primary;
        self.managed_caps = managed;
        self
    }

    pub fn state(&self) -> &DegradationState {
        &self.state
    }

    pub fn capabilities(&self, tier: SourceTier) -> TierCapabilities {
        match tier {
            SourceTier::PrimaryRemote => self.primary_caps,
            SourceTier::ManagedStore => self.managed_caps,
            SourceTier::LocalStore => TierCapabilities::READ_WRITE,
        }
    }

    /// Tiers to try for one call, in order; always ends with the local store
    pub fn plan(&self, write: bool) -> Vec<SourceTier> {
        let mut tiers = Vec::with_capacity(3);
        if self.has_primary
            && self.primary_enabled
            && !self.state.is_degraded()
            && self.primary_caps.allows(write)
        {
            tiers.push(SourceTier::PrimaryRemote);
        }
        if self.has_managed && self.managed_caps.allows(write) {
            tiers.push(SourceTier::ManagedStore);
        }
        tiers.push(SourceTier::LocalStore);
        tiers
    }

    /// Tier that would serve a read right now
    pub fn select(&self) -> SourceTier {
        self.plan(false)[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degradation_is_sticky() {
        let state = DegradationState::nominal();
        assert!(!state.is_degraded());
        assert!(state.degrade());
        assert!(!state.degrade());
        assert!(state.is_degraded());
    }

    #[test]
    fn test_clones_share_state() {
        let state = DegradationState::nominal();
        let observer = state.clone();
        state.degrade();
        assert!(observer.is_degraded());
    }

    #[test]
    fn test_plan_nominal_and_degraded() {
        let selector = SourceSelector::new(true, true, DegradationState::nominal());
        assert_eq!(
            selector.plan(false),
            vec![SourceTier::PrimaryRemote, SourceTier::ManagedStore, SourceTier::LocalStore]
        );

        selector.state().degrade();
        assert_eq!(selector.plan(false), vec![SourceTier::ManagedStore, SourceTier::LocalStore]);
        assert_eq!(selector.select(), SourceTier::ManagedStore);
    }

    #[test]
    fn test_plan_without_remote_tiers() {
        let selector = SourceSelector::new(false, false, DegradationState::nominal());
        assert_eq!(selector.plan(true), vec![SourceTier::LocalStore]);
    }

    #[test]
    fn test_primary_disabled_uses_managed() {
        let selector =
            SourceSelector::new(true, true, DegradationState::nominal()).with_primary_enabled(false);
        assert_eq!(selector.select(), SourceTier::ManagedStore);
    }

    #[test]
    fn test_read_only_primary_skipped_for_writes() {
        let selector = SourceSelector::new(true, false, DegradationState::nominal())
            .with_capabilities(TierCapabilities::READ_ONLY, TierCapabilities::READ_WRITE);
        assert_eq!(selector.plan(false)[0], SourceTier::PrimaryRemote);
        assert_eq!(selector.plan(true), vec![SourceTier::LocalStore]);
    }

    #[test]
    fn test_priority_order() {
        assert!(SourceTier::PrimaryRemote.priority() < SourceTier::ManagedStore.priority());
        assert!(SourceTier::ManagedStore < SourceTier::LocalStore);
    }
}
