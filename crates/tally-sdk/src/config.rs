//! Configuration
//!
//! Loaded from defaults, a TOML file, or `TALLY_*` environment variables.
//! Every field has a default, so an empty file is a valid (local-only)
//! configuration.

use crate::error::{Result, TallyError};
use crate::repository::WritePolicy;
use crate::store::LocalStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub primary: PrimaryConfig,
    pub managed: ManagedConfig,
    pub store: StoreConfig,
    /// Surface application errors of writes instead of completing them locally
    pub strict_writes: bool,
}

/// Primary records service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    /// Base URL; the tier is absent when unset
    pub url: Option<String>,
    /// Administrative switch
    pub enabled: bool,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Serve reads only; writes go to the lower tiers
    pub read_only: bool,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            url: None,
            enabled: true,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            read_only: false,
        }
    }
}

/// Managed table store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedConfig {
    /// Project URL; the tier is absent when unset
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ManagedConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Where the local store keeps its blob
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendKind {
    /// Process memory; lost on exit
    #[default]
    Memory,
    /// JSON files under `store.dir`
    File,
    /// No durable storage: seeds only, writes vanish
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackendKind,
    pub dir: Option<PathBuf>,
    /// Key of the shared blob
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::Memory,
            dir: None,
            key: LocalStore::DEFAULT_KEY.to_string(),
        }
    }
}

impl TallyConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| TallyError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by `TALLY_*` environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `TALLY_*` environment variables on top of this configuration
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source
    ///
    /// Unparsable values are ignored and the existing setting is kept.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("TALLY_PRIMARY_URL").filter(|v| !v.trim().is_empty()) {
            self.primary.url = Some(url);
        }
        if let Some(enabled) = lookup("TALLY_PRIMARY_ENABLED").and_then(|v| parse_flag(&v)) {
            self.primary.enabled = enabled;
        }
        if let Some(key) = lookup("TALLY_API_KEY").filter(|v| !v.is_empty()) {
            self.primary.api_key = Some(key);
        }
        if let Some(secs) = lookup("TALLY_TIMEOUT_SECS").and_then(|v| v.trim().parse::<u64>().ok()) {
            self.primary.timeout_secs = secs;
            self.managed.timeout_secs = secs;
        }
        if let Some(url) = lookup("TALLY_MANAGED_URL").filter(|v| !v.trim().is_empty()) {
            self.managed.url = Some(url);
        }
        if let Some(key) = lookup("TALLY_MANAGED_KEY").filter(|v| !v.is_empty()) {
            self.managed.api_key = Some(key);
        }
        if let Some(dir) = lookup("TALLY_STORE_DIR").filter(|v| !v.trim().is_empty()) {
            self.store.dir = Some(PathBuf::from(dir));
            self.store.backend = StoreBackendKind::File;
        }
        if let Some(key) = lookup("TALLY_STORE_KEY").filter(|v| !v.trim().is_empty()) {
            self.store.key = key;
        }
        if let Some(strict) = lookup("TALLY_STRICT_WRITES").and_then(|v| parse_flag(&v)) {
            self.strict_writes = strict;
        }
        self
    }

    /// Check combinations serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.store.backend == StoreBackendKind::File && self.store.dir.is_none() {
            return Err(TallyError::Config("store.backend = \"file\" requires store.dir".into()));
        }
        if self.store.key.trim().is_empty() {
            return Err(TallyError::Config("store.key must not be empty".into()));
        }
        if self.primary.timeout_secs == 0 || self.managed.timeout_secs == 0 {
            return Err(TallyError::Config("timeout_secs must be positive".into()));
        }
        if self.managed.url.is_some() && self.managed.api_key.is_none() {
            return Err(TallyError::Config("managed.url requires managed.api_key".into()));
        }
        Ok(())
    }

    pub fn write_policy(&self) -> WritePolicy {
        if self.strict_writes {
            WritePolicy::Strict
        } else {
            WritePolicy::Lenient
        }
    }

    /// Whether the primary tier will be consulted at all
    pub fn primary_active(&self) -> bool {
        self.primary.enabled && self.primary.url.is_some()
    }

    pub fn primary_timeout(&self) -> Duration {
        Duration::from_secs(self.primary.timeout_secs)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
