//! Configuration types for the remote clients

use serde::{Deserialize, Serialize};

/// Primary records service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL, including any API prefix (e.g. "https://erp.example.com/api")
    pub base_url: String,
    /// Optional bearer token
    pub api_key: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Managed store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedStoreConfig {
    /// Project URL; collections live under `{url}/rest/v1/{collection}`
    pub url: String,
    /// Anonymous or service key, sent as both `apikey` and bearer token
    pub api_key: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for ManagedStoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}
