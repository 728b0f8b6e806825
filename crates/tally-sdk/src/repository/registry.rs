//! One repository per entity kind, built from configuration

use super::{Repository, RepositoryBuilder};
use crate::config::{StoreBackendKind, StoreConfig, TallyConfig};
use crate::entities;
use crate::error::Result;
use crate::events::{RepositoryEvents, TracingEvents};
use crate::mapper::EntitySchema;
use crate::source::TierCapabilities;
use crate::store::{FileBackend, KeyValueBackend, LocalStore, MemoryBackend, UnavailableBackend};
use crate::traits::{ManagedStore, PrimaryRemote};
use std::sync::Arc;
use tracing::{info, warn};

/// The repositories of every module over one shared local store
///
/// Each repository degrades on its own: a failing finance endpoint does not
/// take the warehouse screens off the primary service.
#[derive(Debug)]
pub struct Repositories {
    pub transactions: Repository,
    pub accounts: Repository,
    pub payments: Repository,
    pub movements: Repository,
    pub shifts: Repository,
    store: LocalStore,
}

impl Repositories {
    /// Build the HTTP tiers and the local store described by `config`
    pub fn from_config(config: &TallyConfig) -> Result<Self> {
        config.validate()?;
        let store = open_store(&config.store)?;
        let (primary, managed) = remote_tiers(config)?;

        info!(
            primary = primary.is_some(),
            primary_enabled = config.primary.enabled,
            managed = managed.is_some(),
            store = ?config.store.backend,
            "repositories configured"
        );

        Ok(Self::with_tiers(config, primary, managed, store, Arc::new(TracingEvents)))
    }

    /// Repositories that only ever use `store`
    pub fn local_only(store: LocalStore) -> Self {
        Self::with_tiers(&TallyConfig::default(), None, None, store, Arc::new(TracingEvents))
    }

    /// Repositories over explicitly supplied tiers
    pub fn with_tiers(
        config: &TallyConfig,
        primary: Option<Arc<dyn PrimaryRemote>>,
        managed: Option<Arc<dyn ManagedStore>>,
        store: LocalStore,
        events: Arc<dyn RepositoryEvents>,
    ) -> Self {
        let build = |schema: &'static EntitySchema| {
            let mut builder = RepositoryBuilder::new(schema)
                .primary_enabled(config.primary.enabled)
                .capabilities(
                    if config.primary.read_only {
                        TierCapabilities::READ_ONLY
                    } else {
                        TierCapabilities::READ_WRITE
                    },
                    TierCapabilities::READ_WRITE,
                )
                .store(store.clone())
                .events(events.clone())
                .policy(config.write_policy())
                .timeout(config.primary_timeout());
            if let Some(primary) = &primary {
                builder = builder.primary(primary.clone());
            }
            if let Some(managed) = &managed {
                builder = builder.managed(managed.clone());
            }
            builder.build()
        };

        Self {
            transactions: build(&entities::TRANSACTIONS),
            accounts: build(&entities::ACCOUNTS),
            payments: build(&entities::PAYMENTS),
            movements: build(&entities::MOVEMENTS),
            shifts: build(&entities::SHIFTS),
            store,
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn all(&self) -> [&Repository; 5] {
        [
            &self.transactions,
            &self.accounts,
            &self.payments,
            &self.movements,
            &self.shifts,
        ]
    }

    /// Repository by entity name or module key
    pub fn get(&self, name: &str) -> Option<&Repository> {
        self.all()
            .into_iter()
            .find(|repo| repo.schema().entity == name || repo.schema().module_key == name)
    }
}

fn open_store(config: &StoreConfig) -> Result<LocalStore> {
    let backend: Arc<dyn KeyValueBackend> = match (config.backend, &config.dir) {
        (StoreBackendKind::File, Some(dir)) => Arc::new(FileBackend::new(dir)?),
        (StoreBackendKind::File, None) => {
            warn!("file store requested without a directory, using memory");
            Arc::new(MemoryBackend::new())
        }
        (StoreBackendKind::Memory, _) => Arc::new(MemoryBackend::new()),
        (StoreBackendKind::Unavailable, _) => Arc::new(UnavailableBackend),
    };
    Ok(LocalStore::with_key(backend, config.key.clone()))
}

type RemoteTiers = (Option<Arc<dyn PrimaryRemote>>, Option<Arc<dyn ManagedStore>>);

#[cfg(feature = "client")]
fn remote_tiers(config: &TallyConfig) -> Result<RemoteTiers> {
    use tally_remote_client::{ManagedStoreClient, ManagedStoreConfig, RemoteClient, RemoteConfig};

    let primary = match &config.primary.url {
        Some(url) => {
            let client = RemoteClient::new(RemoteConfig {
                base_url: url.clone(),
                api_key: config.primary.api_key.clone(),
                timeout_secs: config.primary.timeout_secs,
            })?;
            Some(Arc::new(client) as Arc<dyn PrimaryRemote>)
        }
        None => None,
    };

    let managed = match (&config.managed.url, &config.managed.api_key) {
        (Some(url), Some(api_key)) => {
            let client = ManagedStoreClient::new(ManagedStoreConfig {
                url: url.clone(),
                api_key: api_key.clone(),
                timeout_secs: config.managed.timeout_secs,
            })?;
            Some(Arc::new(client) as Arc<dyn ManagedStore>)
        }
        _ => None,
    };

    Ok((primary, managed))
}

#[cfg(not(feature = "client"))]
fn remote_tiers(config: &TallyConfig) -> Result<RemoteTiers> {
    if config.primary.url.is_some() || config.managed.url.is_some() {
        warn!("remote tiers configured but the `client` feature is disabled, using the local store only");
    }
    Ok((None, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceTier;

    #[tokio::test]
    async fn test_local_only_shares_one_store() {
        let repos = Repositories::local_only(LocalStore::in_memory());

        assert_eq!(repos.movements.list().await.len(), 4);
        assert_eq!(repos.transactions.list().await.len(), 3);

        assert_eq!(repos.store().read("warehouse.movements").len(), 4);
        assert_eq!(repos.store().read("finance.transactions").len(), 3);
        assert!(repos.store().read("workforce.shifts").is_empty());
    }

    #[test]
    fn test_lookup_by_name() {
        let repos = Repositories::local_only(LocalStore::in_memory());
        assert_eq!(repos.get("payments").map(|r| r.schema().id_prefix), Some("pay"));
        assert_eq!(repos.get("workforce.shifts").map(|r| r.schema().entity), Some("shifts"));
        assert!(repos.get("invoices").is_none());
    }

    #[cfg(feature = "client")]
    #[test]
    fn test_from_config_builds_remote_tiers() {
        let config = TallyConfig::default().with_overrides(|name| match name {
            "TALLY_PRIMARY_URL" => Some("http://127.0.0.1:9/api".into()),
            "TALLY_MANAGED_URL" => Some("http://127.0.0.1:9".into()),
            "TALLY_MANAGED_KEY" => Some("anon".into()),
            _ => None,
        });

        let repos = Repositories::from_config(&config).unwrap();
        for repo in repos.all() {
            assert_eq!(
                repo.tier_plan(),
                vec![SourceTier::PrimaryRemote, SourceTier::ManagedStore, SourceTier::LocalStore]
            );
        }
    }

    #[test]
    fn test_file_store_from_config() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = TallyConfig::default().with_overrides(|name| match name {
            "TALLY_STORE_DIR" => Some(temp.path().display().to_string()),
            _ => None,
        });

        let repos = Repositories::from_config(&config).unwrap();
        assert!(repos.store().is_available());
        assert_eq!(repos.shifts.tier_plan(), vec![SourceTier::LocalStore]);
    }
}
