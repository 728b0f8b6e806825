//! Durable local store
//!
//! Records of every module live in one physical blob (a JSON array of
//! entries) under a single key. Each write rewrites the blob, keeping the
//! entries of other modules untouched. Reads never fail: a missing or
//! corrupt blob is an empty store.

mod backend;

pub use backend::{FileBackend, KeyValueBackend, MemoryBackend, UnavailableBackend};

use crate::record::Record;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;

/// One persisted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreEntry {
    pub entity_id: String,
    pub module_key: String,
    pub record_payload: Value,
}

impl StoreEntry {
    fn from_record(module_key: &str, record: &Record) -> Self {
        Self {
            entity_id: record.id().to_string(),
            module_key: module_key.to_string(),
            record_payload: Value::Object(record.fields().clone()),
        }
    }

    fn to_record(&self) -> Option<Record> {
        match &self.record_payload {
            Value::Object(fields) => Some(Record::new(self.entity_id.clone(), fields.clone())),
            _ => None,
        }
    }
}

/// Handle to the shared local blob
///
/// Clones share the backend and the read-modify-write lock.
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn KeyValueBackend>,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("key", &self.key)
            .field("available", &self.backend.is_available())
            .finish()
    }
}

impl LocalStore {
    /// Blob key used unless configured otherwise
    pub const DEFAULT_KEY: &'static str = "tally.local-store";

    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self::with_key(backend, Self::DEFAULT_KEY)
    }

    pub fn with_key(backend: Arc<dyn KeyValueBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// A store over a fresh in-memory backend
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// A store for hosts without durable storage
    pub fn unavailable() -> Self {
        Self::new(Arc::new(UnavailableBackend))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Records of one module, in stored order
    pub fn read(&self, module_key: &str) -> Vec<Record> {
        let _guard = self.guard();
        self.module_records(module_key)
    }

    /// Records of one module, seeding it on first access
    ///
    /// A module that has never been initialized gets `seed()` appended after
    /// whatever entries it already has, and is then marked initialized so a
    /// module emptied by deletes stays empty.
    pub fn read_or_seed(&self, module_key: &str, seed: impl FnOnce() -> Vec<Record>) -> Vec<Record> {
        let _guard = self.guard();

        if !self.is_available() {
            return seed();
        }
        if self.initialized().contains(module_key) {
            return self.module_records(module_key);
        }
        self.seed_module(module_key, seed)
    }

    /// Seed a module that has never been initialized, without reading it back
    pub fn ensure_seeded(&self, module_key: &str, seed: impl FnOnce() -> Vec<Record>) {
        let _guard = self.guard();
        if self.is_available() && !self.initialized().contains(module_key) {
            self.seed_module(module_key, seed);
        }
    }

    /// Replace one module's records, leaving other modules alone
    pub fn write_all(&self, module_key: &str, records: &[Record]) {
        let _guard = self.guard();
        self.replace_module(module_key, records);
        self.mark_initialized(module_key);
    }

    /// Insert at the front of a module (most recent first)
    ///
    /// An existing entry with the same id is replaced.
    pub fn prepend(&self, module_key: &str, record: Record) {
        let _guard = self.guard();
        let mut records = self.module_records(module_key);
        records.retain(|r| r.id() != record.id());
        records.insert(0, record);
        self.replace_module(module_key, &records);
    }

    /// Insert at the end of a module
    ///
    /// An existing entry with the same id is replaced.
    pub fn append(&self, module_key: &str, record: Record) {
        let _guard = self.guard();
        let mut records = self.module_records(module_key);
        records.retain(|r| r.id() != record.id());
        records.push(record);
        self.replace_module(module_key, &records);
    }

    /// Apply canonical changes to one record; `None` when the id is absent
    pub fn patch(&self, module_key: &str, id: &str, changes: &Map<String, Value>) -> Option<Record> {
        self.update_with(module_key, id, |record| record.with_changes(changes))
    }

    /// Replace one record by a value computed from it, under the store lock
    ///
    /// `None` when the id is absent; nothing is written then.
    pub fn update_with(&self, module_key: &str, id: &str, update: impl FnOnce(&Record) -> Record) -> Option<Record> {
        let _guard = self.guard();
        let mut records = self.module_records(module_key);
        let slot = records.iter_mut().find(|r| r.id() == id)?;
        let updated = update(slot);
        *slot = updated.clone();
        self.replace_module(module_key, &records);
        Some(updated)
    }

    /// Overwrite a record in place; `false` when its id is absent
    pub fn replace(&self, module_key: &str, record: &Record) -> bool {
        let _guard = self.guard();
        let mut records = self.module_records(module_key);
        let Some(slot) = records.iter_mut().find(|r| r.id() == record.id()) else {
            return false;
        };
        *slot = record.clone();
        self.replace_module(module_key, &records);
        true
    }

    /// Remove one record; `false` when it was not there
    pub fn remove(&self, module_key: &str, id: &str) -> bool {
        let _guard = self.guard();
        let mut records = self.module_records(module_key);
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return false;
        }
        self.replace_module(module_key, &records);
        true
    }

    pub fn contains(&self, module_key: &str, id: &str) -> bool {
        self.read(module_key).iter().any(|r| r.id() == id)
    }

    /// Fresh id for a locally created record, e.g. `tx-3f9a1c0b22d4`
    pub fn generate_id(prefix: &str) -> String {
        let random = Uuid::new_v4().simple().to_string();
        format!("{}-{}", prefix, &random[..12])
    }

    // === Private Implementation ===

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn marker_key(&self) -> String {
        format!("{}.modules", self.key)
    }

    fn load(&self) -> Vec<StoreEntry> {
        let Some(raw) = self.backend.get(&self.key) else {
            return Vec::new();
        };

        let items = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                warn!(key = %self.key, "local store blob is not a sequence, treating as empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "local store blob is unparsable, treating as empty");
                return Vec::new();
            }
        };

        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<StoreEntry>(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(key = %self.key, error = %e, "skipping malformed local store entry");
                    None
                }
            })
            .collect()
    }

    fn save(&self, entries: &[StoreEntry]) {
        let serialized = match serde_json::to_string(entries) {
            Ok(s) => s,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to serialize local store");
                return;
            }
        };
        if let Err(e) = self.backend.set(&self.key, &serialized) {
            warn!(key = %self.key, error = %e, "failed to persist local store");
        }
    }

    fn seed_module(&self, module_key: &str, seed: impl FnOnce() -> Vec<Record>) -> Vec<Record> {
        let mut records = self.module_records(module_key);
        let known: HashSet<String> = records.iter().map(|r| r.id().to_string()).collect();
        records.extend(seed().into_iter().filter(|r| !known.contains(r.id())));

        debug!(module = module_key, count = records.len(), "seeding local store");
        self.replace_module(module_key, &records);
        self.mark_initialized(module_key);
        records
    }

    fn module_records(&self, module_key: &str) -> Vec<Record> {
        self.load()
            .iter()
            .filter(|entry| entry.module_key == module_key)
            .filter_map(StoreEntry::to_record)
            .collect()
    }

    fn replace_module(&self, module_key: &str, records: &[Record]) {
        let mut entries: Vec<StoreEntry> = self
            .load()
            .into_iter()
            .filter(|entry| entry.module_key != module_key)
            .collect();
        entries.extend(records.iter().map(|r| StoreEntry::from_record(module_key, r)));
        self.save(&entries);
    }

    fn initialized(&self) -> HashSet<String> {
        self.backend
            .get(&self.marker_key())
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .map(|keys| keys.into_iter().collect())
            .unwrap_or_default()
    }

    fn mark_initialized(&self, module_key: &str) {
        let mut keys: Vec<String> = self.initialized().into_iter().collect();
        if keys.iter().any(|k| k == module_key) {
            return;
        }
        keys.push(module_key.to_string());
        keys.sort();
        match serde_json::to_string(&keys) {
            Ok(raw) => {
                if let Err(e) = self.backend.set(&self.marker_key(), &raw) {
                    warn!(key = %self.key, error = %e, "failed to persist module markers");
                }
            }
            Err(e) => warn!(key = %self.key, error = %e, "failed to serialize module markers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, amount: f64) -> Record {
        Record::new(id, json!({"amount": amount}).as_object().cloned().unwrap())
    }

    #[test]
    fn test_read_missing_blob_is_empty() {
        let store = LocalStore::in_memory();
        assert!(store.read("finance").is_empty());
    }

    #[test]
    fn test_corrupt_blob_reads_empty() {
        let backend = Arc::new(MemoryBackend::new());
        let store = LocalStore::new(backend.clone());

        backend.set(LocalStore::DEFAULT_KEY, "{not json").unwrap();
        assert!(store.read("finance").is_empty());

        backend.set(LocalStore::DEFAULT_KEY, r#"{"entityId":"x"}"#).unwrap();
        assert!(store.read("finance").is_empty());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let backend = Arc::new(MemoryBackend::new());
        let store = LocalStore::new(backend.clone());
        backend
            .set(
                LocalStore::DEFAULT_KEY,
                r#"[{"entityId":"a","moduleKey":"finance","recordPayload":{"amount":1}},
                    {"garbage":true},
                    {"entityId":"b","moduleKey":"finance","recordPayload":"oops"}]"#,
            )
            .unwrap();

        let records = store.read("finance");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), "a");
    }

    #[test]
    fn test_write_preserves_other_modules() {
        let store = LocalStore::in_memory();
        store.write_all("finance", &[record("tx-1", 10.0), record("tx-2", 20.0)]);
        store.write_all("warehouse", &[record("mv-1", 5.0)]);
        store.write_all("warehouse", &[record("mv-2", 6.0)]);

        let finance = store.read("finance");
        assert_eq!(finance.len(), 2);
        assert_eq!(finance[0], record("tx-1", 10.0));
        assert_eq!(finance[1], record("tx-2", 20.0));

        let warehouse = store.read("warehouse");
        assert_eq!(warehouse.len(), 1);
        assert_eq!(warehouse[0].id(), "mv-2");
    }

    #[test]
    fn test_prepend_patch_remove() {
        let store = LocalStore::in_memory();
        store.append("finance", record("tx-1", 1.0));
        store.prepend("finance", record("tx-2", 2.0));
        assert_eq!(store.read("finance")[0].id(), "tx-2");

        let patched = store
            .patch("finance", "tx-1", json!({"amount": 9.0}).as_object().unwrap())
            .unwrap();
        assert_eq!(patched.number("amount"), Some(9.0));
        assert!(store.patch("finance", "nope", &Map::new()).is_none());

        assert!(store.remove("finance", "tx-1"));
        assert!(!store.remove("finance", "tx-1"));
        assert!(!store.contains("finance", "tx-1"));
    }

    #[test]
    fn test_seed_only_once() {
        let store = LocalStore::in_memory();
        let seeded = store.read_or_seed("warehouse", || vec![record("mv-1", 1.0), record("mv-2", 2.0)]);
        assert_eq!(seeded.len(), 2);

        store.remove("warehouse", "mv-1");
        store.remove("warehouse", "mv-2");

        let again = store.read_or_seed("warehouse", || vec![record("mv-1", 1.0)]);
        assert!(again.is_empty());
    }

    #[test]
    fn test_seed_keeps_existing_entries_first() {
        let store = LocalStore::in_memory();
        store.prepend("finance", record("tx-new", 5.0));

        let records = store.read_or_seed("finance", || vec![record("tx-seed", 1.0), record("tx-new", 0.0)]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], record("tx-new", 5.0));
        assert_eq!(records[1].id(), "tx-seed");
    }

    #[test]
    fn test_unavailable_store_serves_seed_without_persisting() {
        let store = LocalStore::unavailable();
        let records = store.read_or_seed("finance", || vec![record("tx-1", 1.0)]);
        assert_eq!(records.len(), 1);

        store.prepend("finance", record("tx-2", 2.0));
        assert!(store.read("finance").is_empty());
    }

    #[test]
    fn test_generated_ids_use_prefix() {
        let a = LocalStore::generate_id("tx");
        let b = LocalStore::generate_id("tx");
        assert!(a.starts_with("tx-"));
        assert_eq!(a.len(), "tx-".len() + 12);
        assert_ne!(a, b);
    }

    #[test]
    fn test_ensure_seeded_runs_seed_once() {
        let store = LocalStore::in_memory();
        let mut calls = 0;
        store.ensure_seeded("warehouse", || {
            calls += 1;
            vec![record("mv-1", 1.0)]
        });
        store.ensure_seeded("warehouse", || {
            calls += 1;
            vec![record("mv-2", 2.0)]
        });

        assert_eq!(calls, 1);
        assert_eq!(store.read("warehouse").len(), 1);
    }

    #[test]
    fn test_update_with_missing_id_writes_nothing() {
        let store = LocalStore::in_memory();
        store.write_all("finance", &[record("tx-1", 5.0)]);

        assert!(store.update_with("finance", "tx-9", |r| r.clone()).is_none());
        let updated = store
            .update_with("finance", "tx-1", |r| Record::new(r.id(), Map::new()))
            .unwrap();
        assert!(updated.fields().is_empty());
        assert_eq!(store.read("finance"), vec![updated]);
    }
}
