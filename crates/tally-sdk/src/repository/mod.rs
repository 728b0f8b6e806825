//! Repositories: list/create/update/delete over the tier plan
//!
//! A [`Repository`] owns one entity kind. For every call it asks its
//! [`SourceSelector`] for a plan and walks it until a tier answers:
//!
//! - a failing primary tier degrades the repository for good, then the
//!   call continues on the next tier
//! - a failing managed store only affects the current call
//! - the local store always answers
//!
//! Writes served by a remote tier are mirrored into the local store so the
//! fallback dataset keeps what the user already saw.

mod registry;

pub use registry::Repositories;

use crate::error::{Result, TallyError};
use crate::events::{Operation, RepositoryEvent, RepositoryEventKind, RepositoryEvents, TracingEvents};
use crate::mapper::{shape, EntitySchema, Envelope, RecordMapper};
use crate::record::{RawPayload, Record};
use crate::source::{DegradationState, SourceSelector, SourceTier, TierCapabilities};
use crate::store::LocalStore;
use crate::traits::{ManagedStore, Method, PrimaryRemote, TierError};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How write failures on the primary tier are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Any failure degrades and the write completes on a lower tier
    #[default]
    Lenient,
    /// Application errors (the service said no) are returned to the caller
    Strict,
}

/// Data access for one entity kind
pub struct Repository {
    schema: &'static EntitySchema,
    mapper: RecordMapper,
    selector: SourceSelector,
    primary: Option<Arc<dyn PrimaryRemote>>,
    managed: Option<Arc<dyn ManagedStore>>,
    store: LocalStore,
    events: Arc<dyn RepositoryEvents>,
    policy: WritePolicy,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &self.schema.entity)
            .field("plan", &self.selector.plan(false))
            .field("degraded", &self.is_degraded())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Repository {
    pub fn builder(schema: &'static EntitySchema) -> RepositoryBuilder {
        RepositoryBuilder::new(schema)
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    pub fn mapper(&self) -> RecordMapper {
        self.mapper
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Whether the primary tier has been dropped for this repository
    pub fn is_degraded(&self) -> bool {
        self.selector.state().is_degraded()
    }

    /// Tiers a read would try right now
    pub fn tier_plan(&self) -> Vec<SourceTier> {
        self.selector.plan(false)
    }

    /// All records of this entity
    ///
    /// Never fails. A shape the mapper does not recognize is an empty list,
    /// not a failure.
    pub async fn list(&self) -> Vec<Record> {
        let plan = self.selector.plan(false);

        for (index, tier) in plan.iter().copied().enumerate() {
            let result = match tier {
                SourceTier::PrimaryRemote => self.list_primary().await,
                SourceTier::ManagedStore => self.list_managed().await,
                SourceTier::LocalStore => Ok(self.local_records()),
            };

            match result {
                Ok(records) => {
                    self.served(Operation::List, index, tier);
                    return records;
                }
                Err(err) => self.tier_failed(Operation::List, tier, &err),
            }
        }

        self.local_records()
    }

    /// One record by id, from whichever tier serves the list
    pub async fn get(&self, id: &str) -> Option<Record> {
        self.list().await.into_iter().find(|record| record.id() == id)
    }

    /// Create a record from canonical fields
    ///
    /// Undefined fields are left out of the remote payload. When no remote
    /// tier accepts the write it is completed locally with a generated id
    /// and the record is placed first in the local collection.
    pub async fn create(&self, data: RawPayload) -> Result<Record> {
        let plan = self.selector.plan(true);
        let wire = self.mapper.to_wire(&data);

        for (index, tier) in plan.iter().copied().enumerate() {
            let result = match tier {
                SourceTier::PrimaryRemote => self.create_primary(&data, &wire).await,
                SourceTier::ManagedStore => self.create_managed(&data, &wire).await,
                SourceTier::LocalStore => {
                    let record = self.create_local(&data);
                    self.served(Operation::Create, index, tier);
                    return Ok(record);
                }
            };

            match result {
                Ok(record) => {
                    self.mirror(Operation::Create, &record, true);
                    self.served(Operation::Create, index, tier);
                    return Ok(record);
                }
                Err(err) => {
                    self.tier_failed(Operation::Create, tier, &err);
                    self.surface(&err)?;
                }
            }
        }

        Ok(self.create_local(&data))
    }

    /// Apply a partial change set to one record
    ///
    /// Only the keys present in `changes` are sent. A null clears the field.
    /// Returns `None` when the serving tier does not know the id.
    pub async fn update(&self, id: &str, changes: RawPayload) -> Result<Option<Record>> {
        let plan = self.selector.plan(true);
        let wire = self.mapper.to_wire(&changes);
        let local_changes = self.mapper.canonicalize_partial(&changes);

        for (index, tier) in plan.iter().copied().enumerate() {
            let result = match tier {
                SourceTier::PrimaryRemote => self.update_primary(id, &local_changes, &wire).await,
                SourceTier::ManagedStore => self.update_managed(id, &local_changes, &wire).await,
                SourceTier::LocalStore => {
                    let updated = self.update_local(id, &local_changes);
                    self.served(Operation::Update, index, tier);
                    return Ok(updated);
                }
            };

            match result {
                Ok(Some(record)) => {
                    self.mirror(Operation::Update, &record, false);
                    self.served(Operation::Update, index, tier);
                    return Ok(Some(record));
                }
                Ok(None) => {
                    debug!(entity = self.schema.entity, %tier, id, "update target not found");
                    return Ok(None);
                }
                Err(err) => {
                    self.tier_failed(Operation::Update, tier, &err);
                    self.surface(&err)?;
                }
            }
        }

        Ok(self.update_local(id, &local_changes))
    }

    /// Delete one record
    ///
    /// Idempotent: deleting an id that does not exist succeeds. The local
    /// copy is removed whichever tier served the call.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let plan = self.selector.plan(true);

        for (index, tier) in plan.iter().copied().enumerate() {
            let result = match tier {
                SourceTier::PrimaryRemote => self.delete_primary(id).await,
                SourceTier::ManagedStore => self.delete_managed(id).await,
                SourceTier::LocalStore => Ok(()),
            };

            match result {
                Ok(()) => {
                    self.remove_local(id);
                    self.served(Operation::Delete, index, tier);
                    return Ok(());
                }
                Err(err) => {
                    self.tier_failed(Operation::Delete, tier, &err);
                    self.surface(&err)?;
                }
            }
        }

        self.remove_local(id);
        Ok(())
    }

    // === Primary Remote ===

    async fn list_primary(&self) -> std::result::Result<Vec<Record>, TierError> {
        let body = self.call_primary(self.schema.path.to_string(), Method::Get, None).await?;

        match shape::extract_collection(&body, self.schema.collection_key) {
            Some((shape_name, items)) => {
                debug!(entity = self.schema.entity, shape = shape_name, count = items.len(), "collection shape");
                Ok(self.mapper.to_canonical_all(&items))
            }
            None => {
                self.emit(
                    Operation::List,
                    RepositoryEventKind::UnrecognizedShape {
                        tier: SourceTier::PrimaryRemote,
                        keys: shape::describe(&body),
                    },
                );
                Ok(Vec::new())
            }
        }
    }

    async fn create_primary(&self, data: &RawPayload, wire: &RawPayload) -> std::result::Result<Record, TierError> {
        let body = self
            .call_primary(self.schema.path.to_string(), Method::Post, Some(Value::Object(wire.clone())))
            .await?;

        let returned = shape::extract_record(&body, self.schema.record_key);
        Ok(self.finish_create(data, returned))
    }

    async fn update_primary(
        &self,
        id: &str,
        changes: &RawPayload,
        wire: &RawPayload,
    ) -> std::result::Result<Option<Record>, TierError> {
        let result = self
            .call_primary(self.schema.record_path(id), Method::Put, Some(Value::Object(wire.clone())))
            .await;

        let body = match result {
            Ok(body) => body,
            Err(TierError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };

        let returned = shape::extract_record(&body, self.schema.record_key);
        Ok(Some(self.merge_update(id, changes, returned)))
    }

    async fn delete_primary(&self, id: &str) -> std::result::Result<(), TierError> {
        match self.call_primary(self.schema.record_path(id), Method::Delete, None).await {
            Ok(_) | Err(TierError::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// One primary request, with the success envelope checked
    async fn call_primary(&self, path: String, method: Method, body: Option<Value>) -> std::result::Result<Value, TierError> {
        let primary = self
            .primary
            .as_ref()
            .ok_or_else(|| TierError::Transport("primary remote not configured".into()))?;

        let response = self.bounded(primary.request(&path, method, body)).await?;

        let envelope = Envelope::parse(&response);
        if !envelope.is_success() {
            let message = envelope.message().unwrap_or("request rejected").to_string();
            return Err(TierError::Application(message));
        }
        Ok(response)
    }

    // === Managed Store ===

    fn managed(&self) -> std::result::Result<&Arc<dyn ManagedStore>, TierError> {
        self.managed
            .as_ref()
            .ok_or_else(|| TierError::Transport("managed store not configured".into()))
    }

    async fn list_managed(&self) -> std::result::Result<Vec<Record>, TierError> {
        let managed = self.managed()?;
        let rows = self.bounded(managed.select(self.schema.table)).await?;
        Ok(self.mapper.to_canonical_all(&rows))
    }

    async fn create_managed(&self, data: &RawPayload, wire: &RawPayload) -> std::result::Result<Record, TierError> {
        let managed = self.managed()?;
        let row = self
            .bounded(managed.insert(self.schema.table, Value::Object(wire.clone())))
            .await?;

        let returned = match row {
            Value::Object(returned) => Some(returned),
            _ => None,
        };
        Ok(self.finish_create(data, returned))
    }

    async fn update_managed(
        &self,
        id: &str,
        changes: &RawPayload,
        wire: &RawPayload,
    ) -> std::result::Result<Option<Record>, TierError> {
        let managed = self.managed()?;
        let row = self
            .bounded(managed.update(self.schema.table, id, Value::Object(wire.clone())))
            .await;

        match row {
            Ok(Some(Value::Object(returned))) => Ok(Some(self.merge_update(id, changes, Some(returned)))),
            Ok(Some(_)) => Ok(Some(self.merge_update(id, changes, None))),
            Ok(None) | Err(TierError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn delete_managed(&self, id: &str) -> std::result::Result<(), TierError> {
        let managed = self.managed()?;
        match self.bounded(managed.delete(self.schema.table, id)).await {
            Ok(_) | Err(TierError::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    // === Local Store ===

    fn local_records(&self) -> Vec<Record> {
        let schema = self.schema;
        self.store.read_or_seed(schema.module_key, || schema.seed_records())
    }

    fn ensure_seeded(&self) {
        let schema = self.schema;
        self.store.ensure_seeded(schema.module_key, || schema.seed_records());
    }

    fn update_local(&self, id: &str, changes: &RawPayload) -> Option<Record> {
        self.ensure_seeded();
        self.store.update_with(self.schema.module_key, id, |record| {
            self.mapper.apply_changes(id, record.fields(), changes)
        })
    }

    fn create_local(&self, data: &RawPayload) -> Record {
        let mut raw = data.clone();
        if self.mapper.find_id(&raw).is_none() {
            raw.insert("id".into(), Value::String(LocalStore::generate_id(self.schema.id_prefix)));
        }
        if let Some(field) = self.schema.timestamp_field {
            if raw.get(field).map_or(true, Value::is_null) {
                let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
                raw.insert(field.to_string(), Value::String(now));
            }
        }

        let record = self.mapper.to_canonical(&raw);
        self.ensure_seeded();
        self.store.prepend(self.schema.module_key, record.clone());
        record
    }

    fn remove_local(&self, id: &str) {
        self.ensure_seeded();
        if self.store.remove(self.schema.module_key, id) {
            debug!(entity = self.schema.entity, id, "removed local copy");
        }
    }

    /// Copy a remotely served write into the local fallback dataset
    fn mirror(&self, operation: Operation, record: &Record, insert: bool) {
        self.ensure_seeded();
        let module = self.schema.module_key;
        let mirrored = if insert {
            self.store.prepend(module, record.clone());
            true
        } else {
            self.store.replace(module, record)
        };
        if mirrored {
            self.emit(operation, RepositoryEventKind::Mirrored { id: record.id().to_string() });
        }
    }

    /// Record of a remote create: request data overlaid with whatever the
    /// tier returned, with a generated id when neither carries one
    fn finish_create(&self, data: &RawPayload, returned: Option<RawPayload>) -> Record {
        let mut merged = data.clone();
        if let Some(returned) = returned {
            merged.extend(returned);
        }
        if self.mapper.find_id(&merged).is_none() {
            merged.insert("id".into(), Value::String(LocalStore::generate_id(self.schema.id_prefix)));
        }
        self.mapper.to_canonical(&merged)
    }

    /// Full record after a remote update: local copy, then the fields the
    /// serving tier echoed back, then the change set
    fn merge_update(&self, id: &str, changes: &RawPayload, returned: Option<RawPayload>) -> Record {
        let base = self
            .store
            .read(self.schema.module_key)
            .into_iter()
            .find(|record| record.id() == id)
            .map(|record| record.fields().clone())
            .unwrap_or_default();

        let mut layered = returned
            .map(|returned| self.mapper.resolve_present(&returned))
            .unwrap_or_default();
        layered.extend(changes.clone());
        self.mapper.apply_changes(id, &base, &layered)
    }

    // === Bookkeeping ===

    async fn bounded<T, F>(&self, call: F) -> std::result::Result<T, TierError>
    where
        F: Future<Output = std::result::Result<T, TierError>>,
    {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| TierError::Transport(format!("timed out after {}s", limit.as_secs_f64())))?,
            None => call.await,
        }
    }

    fn tier_failed(&self, operation: Operation, tier: SourceTier, err: &TierError) {
        self.emit(
            operation,
            RepositoryEventKind::TierFailed {
                tier,
                reason: err.to_string(),
            },
        );
        if tier == SourceTier::PrimaryRemote && self.selector.state().degrade() {
            self.emit(operation, RepositoryEventKind::Degraded);
        }
    }

    /// Under the strict policy an application error ends the call
    fn surface(&self, err: &TierError) -> Result<()> {
        match (self.policy, err) {
            (WritePolicy::Strict, TierError::Application(message)) => Err(TallyError::Application {
                message: message.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn served(&self, operation: Operation, index: usize, tier: SourceTier) {
        if index > 0 {
            self.emit(operation, RepositoryEventKind::FallbackServed { tier });
        }
    }

    fn emit(&self, operation: Operation, kind: RepositoryEventKind) {
        self.events
            .record(&RepositoryEvent::new(self.schema.entity, operation, kind));
    }
}

/// Builder for [`Repository`]
///
/// Without remote tiers the repository runs on the local store alone.
pub struct RepositoryBuilder {
    schema: &'static EntitySchema,
    primary: Option<Arc<dyn PrimaryRemote>>,
    managed: Option<Arc<dyn ManagedStore>>,
    primary_enabled: bool,
    primary_caps: TierCapabilities,
    managed_caps: TierCapabilities,
    store: Option<LocalStore>,
    state: Option<DegradationState>,
    events: Option<Arc<dyn RepositoryEvents>>,
    policy: WritePolicy,
    timeout: Option<Duration>,
}

impl RepositoryBuilder {
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self {
            schema,
            primary: None,
            managed: None,
            primary_enabled: true,
            primary_caps: TierCapabilities::default(),
            managed_caps: TierCapabilities::default(),
            store: None,
            state: None,
            events: None,
            policy: WritePolicy::default(),
            timeout: None,
        }
    }

    pub fn primary(mut self, primary: Arc<dyn PrimaryRemote>) -> Self {
        self.primary = Some(primary);
        self
    }

    pub fn managed(mut self, managed: Arc<dyn ManagedStore>) -> Self {
        self.managed = Some(managed);
        self
    }

    /// Administrative switch; a disabled primary tier is never consulted
    pub fn primary_enabled(mut self, enabled: bool) -> Self {
        self.primary_enabled = enabled;
        self
    }

    pub fn capabilities(mut self, primary: TierCapabilities, managed: TierCapabilities) -> Self {
        self.primary_caps = primary;
        self.managed_caps = managed;
        self
    }

    /// Local store; defaults to a private in-memory one
    pub fn store(mut self, store: LocalStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Degradation flag; pass a clone to observe it from outside
    pub fn state(mut self, state: DegradationState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn events(mut self, events: Arc<dyn RepositoryEvents>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Upper bound for a single remote tier call
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Repository {
        let selector = SourceSelector::new(
            self.primary.is_some(),
            self.managed.is_some(),
            self.state.unwrap_or_default(),
        )
        .with_primary_enabled(self.primary_enabled)
        .with_capabilities(self.primary_caps, self.managed_caps);

        Repository {
            schema: self.schema,
            mapper: RecordMapper::new(self.schema),
            selector,
            primary: self.primary,
            managed: self.managed,
            store: self.store.unwrap_or_else(LocalStore::in_memory),
            events: self.events.unwrap_or_else(|| Arc::new(TracingEvents)),
            policy: self.policy,
            timeout: self.timeout,
        }
    }
}

/// Shorthand for building a payload from a JSON object literal
pub fn payload(value: Value) -> RawPayload {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities;
    use serde_json::json;

    #[tokio::test]
    async fn test_local_only_list_is_seeded() {
        let repo = Repository::builder(&entities::MOVEMENTS).build();
        assert_eq!(repo.tier_plan(), vec![SourceTier::LocalStore]);
        assert_eq!(repo.list().await.len(), 4);
    }

    #[tokio::test]
    async fn test_local_create_goes_first() {
        let repo = Repository::builder(&entities::TRANSACTIONS).build();
        let created = repo
            .create(payload(json!({"amount": 12.5, "type": "EXPENSE", "description": "Coffee"})))
            .await
            .unwrap();

        assert!(created.id().starts_with("tx-"));
        assert!(created.has("date"));
        let listed = repo.list().await;
        assert_eq!(listed[0].id(), created.id());
        assert_eq!(listed.len(), 4);
    }

    #[tokio::test]
    async fn test_local_update_and_delete() {
        let repo = Repository::builder(&entities::ACCOUNTS).build();
        let first = repo.list().await.remove(0);

        let updated = repo
            .update(first.id(), payload(json!({"name": "Renamed"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.text("name"), Some("Renamed"));
        assert_eq!(updated.id(), first.id());

        repo.delete(first.id()).await.unwrap();
        repo.delete(first.id()).await.unwrap();
        assert!(repo.get(first.id()).await.is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_none() {
        let repo = Repository::builder(&entities::SHIFTS).build();
        let before = repo.list().await;
        let result = repo.update("sh-missing", payload(json!({"role": "x"}))).await.unwrap();
        assert!(result.is_none());
        assert_eq!(repo.list().await, before);
    }

    #[test]
    fn test_payload_of_non_object_is_empty() {
        assert!(payload(json!([1, 2])).is_empty());
    }
}
