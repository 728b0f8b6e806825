//! Fake tiers for repository tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tally_sdk::{
    ManagedStore, Method, PrimaryRemote, RepositoryEvent, RepositoryEventKind, RepositoryEvents, TierError,
};

type Handler = Box<dyn Fn(Method, &str, Option<&Value>) -> Result<Value, TierError> + Send + Sync>;

/// A request the fake primary received
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Scriptable primary remote with a call counter
pub struct FakePrimary {
    handler: Handler,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<SeenRequest>>,
}

impl FakePrimary {
    pub fn new(handler: impl Fn(Method, &str, Option<&Value>) -> Result<Value, TierError> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails at the transport level
    pub fn unreachable() -> Self {
        Self::new(|_, _, _| Err(TierError::Transport("connection refused".into())))
    }

    /// Every call answers with `body`
    pub fn responding(body: Value) -> Self {
        Self::new(move |_, _, _| Ok(body.clone()))
    }

    /// Every call answers `{"success": false, "message": ..}`
    pub fn rejecting(message: &str) -> Self {
        let body = json!({"success": false, "message": message});
        Self::responding(body)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrimaryRemote for FakePrimary {
    async fn request(&self, path: &str, method: Method, body: Option<Value>) -> Result<Value, TierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(SeenRequest {
            method,
            path: path.to_string(),
            body: body.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(method, path, body.as_ref())
    }
}

/// In-memory managed store that can be switched to failing
#[derive(Default)]
pub struct FakeManaged {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failing: AtomicBool,
    calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeManaged {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(table: &str, rows: Vec<Value>) -> Self {
        let managed = Self::default();
        managed.tables.lock().unwrap().insert(table.to_string(), rows);
        managed
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    fn enter(&self) -> Result<(), TierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(TierError::Transport("managed store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ManagedStore for FakeManaged {
    async fn select(&self, collection: &str) -> Result<Vec<Value>, TierError> {
        self.enter()?;
        Ok(self.rows(collection))
    }

    async fn insert(&self, collection: &str, mut row: Value) -> Result<Value, TierError> {
        self.enter()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(map) = row.as_object_mut() {
            map.entry("id").or_insert_with(|| json!(format!("row-{}", id)));
        }
        let mut tables = self.tables.lock().unwrap();
        tables.entry(collection.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, collection: &str, id: &str, changes: Value) -> Result<Option<Value>, TierError> {
        self.enter()?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(collection.to_string()).or_default();
        let Some(row) = rows.iter_mut().find(|row| row["id"] == id) else {
            return Ok(None);
        };
        if let (Some(target), Some(changes)) = (row.as_object_mut(), changes.as_object()) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, TierError> {
        self.enter()?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(collection.to_string()).or_default();
        let before = rows.len();
        rows.retain(|row| row["id"] != id);
        Ok(rows.len() != before)
    }
}

/// Event sink that keeps everything
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<RepositoryEvent>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<RepositoryEventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind.clone()).collect()
    }

    pub fn count(&self, matches: impl Fn(&RepositoryEventKind) -> bool) -> usize {
        self.kinds().iter().filter(|kind| matches(kind)).count()
    }
}

impl RepositoryEvents for RecordingEvents {
    fn record(&self, event: &RepositoryEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
