//! Canonical record type

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Untyped field map, as received from (or sent to) a remote tier
pub type RawPayload = Map<String, Value>;

/// A normalized domain record
///
/// Produced by the [`RecordMapper`](crate::mapper::RecordMapper) or read back
/// from the local store. Fields are keyed by their canonical names; a field
/// that is absent from the map is undefined. Records are never mutated in
/// place: [`Record::with_changes`] returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Record {
    /// Build a record from an id and canonical fields
    ///
    /// An `id` key inside `fields` is dropped; the explicit id wins.
    pub fn new(id: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Stable identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Canonical fields, excluding the id
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Raw value of a field, `None` when undefined
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// String value of a field
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Numeric value of a field
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    /// Boolean value of a field
    pub fn flag(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    /// Whether a field is defined
    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// A copy of this record with `changes` applied
    ///
    /// A null change clears the field. The id cannot be changed.
    pub fn with_changes(&self, changes: &Map<String, Value>) -> Record {
        let mut fields = self.fields.clone();
        for (key, value) in changes {
            if key == "id" {
                continue;
            }
            if value.is_null() {
                fields.remove(key);
            } else {
                fields.insert(key.clone(), value.clone());
            }
        }
        Record {
            id: self.id.clone(),
            fields,
        }
    }

    /// The record as a flat JSON object including its id
    pub fn to_payload(&self) -> RawPayload {
        let mut payload = Map::with_capacity(self.fields.len() + 1);
        payload.insert("id".to_string(), Value::String(self.id.clone()));
        payload.extend(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        payload
    }

    /// Decode into a typed view
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.to_payload()))
    }
}
