//! Record mapping between remote payloads and canonical records
//!
//! Mapping is total: every payload, however malformed, produces a
//! [`Record`] whose required fields are all defined. Nothing here fails and
//! nothing here has side effects.

mod coerce;
mod rules;
pub mod shape;

pub use coerce::coerce;
pub use rules::{EnumSpec, FieldDefault, FieldKind, FieldRule};
pub use shape::{Envelope, ShapeDetector};

use crate::record::{RawPayload, Record};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Everything the data layer knows about one entity kind
#[derive(Debug)]
pub struct EntitySchema {
    /// Entity name (e.g. "transactions")
    pub entity: &'static str,
    /// Partition key in the local store (e.g. "finance.transactions")
    pub module_key: &'static str,
    /// Prefix of locally generated ids (e.g. "tx")
    pub id_prefix: &'static str,
    /// Collection path on the primary service
    pub path: &'static str,
    /// Key a collection may be wrapped under (`{"transactions": [...]}`)
    pub collection_key: &'static str,
    /// Key a single record may be wrapped under (`{"transaction": {...}}`)
    pub record_key: &'static str,
    /// Collection name in the managed store
    pub table: &'static str,
    /// Id candidates after `id`
    pub id_sources: &'static [&'static str],
    /// Field stamped with the creation time of locally synthesized records
    pub timestamp_field: Option<&'static str>,
    pub rules: &'static [FieldRule],
    /// Raw payloads the local store is seeded with
    pub seed: fn() -> Vec<Value>,
}

impl EntitySchema {
    pub fn rule(&self, target: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|rule| rule.target == target)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().filter(|r| r.required).map(|r| r.target)
    }

    /// Primary service path of one record
    pub fn record_path(&self, id: &str) -> String {
        format!("{}/{}", self.path.trim_end_matches('/'), id)
    }

    /// Seed payloads mapped to canonical records
    pub fn seed_records(&'static self) -> Vec<Record> {
        let mapper = RecordMapper::new(self);
        (self.seed)()
            .iter()
            .filter_map(Value::as_object)
            .map(|raw| mapper.to_canonical(raw))
            .collect()
    }
}

/// Pure translation between raw payloads and canonical records
#[derive(Debug, Clone, Copy)]
pub struct RecordMapper {
    schema: &'static EntitySchema,
}

impl RecordMapper {
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    /// Normalize a raw payload into a canonical record
    pub fn to_canonical(&self, raw: &RawPayload) -> Record {
        let mut fields = Map::new();

        for rule in self.schema.rules {
            let value = rule
                .candidates()
                .find_map(|path| lookup(raw, path).and_then(|v| coerce(rule.kind, v)))
                .or_else(|| rule.default.resolve(&fields))
                .or_else(|| rule.required.then(|| rule.kind.zero()));

            if let Some(value) = value {
                fields.insert(rule.target.to_string(), value);
            }
        }

        let id = self.resolve_id(raw);
        Record::new(id, fields)
    }

    /// Map every object in `items`; non-objects are skipped
    pub fn to_canonical_all(&self, items: &[Value]) -> Vec<Record> {
        items
            .iter()
            .filter_map(Value::as_object)
            .map(|raw| self.to_canonical(raw))
            .collect()
    }

    /// Build a write payload from canonical fields
    ///
    /// Undefined and null fields are left out entirely: the service treats
    /// an absent key as "unchanged" and a null as "clear". Keys the schema
    /// does not know are passed through.
    pub fn to_wire(&self, canonical: &RawPayload) -> RawPayload {
        let mut wire = Map::new();

        for (key, value) in canonical {
            if value.is_null() {
                continue;
            }
            match self.schema.rule(key) {
                Some(rule) => {
                    if let Some(value) = coerce(rule.kind, value) {
                        wire.insert(rule.wire_name().to_string(), value);
                    }
                }
                None => {
                    wire.insert(key.clone(), value.clone());
                }
            }
        }

        wire
    }

    /// Normalize only the keys present in a change set
    ///
    /// Nulls are kept so that a local patch can clear a field.
    pub fn canonicalize_partial(&self, changes: &RawPayload) -> RawPayload {
        let mut out = Map::new();

        for (key, value) in changes {
            if key == "id" {
                continue;
            }
            if value.is_null() {
                out.insert(key.clone(), Value::Null);
                continue;
            }
            match self.schema.rule(key) {
                Some(rule) => {
                    if let Some(value) = coerce(rule.kind, value) {
                        out.insert(key.clone(), value);
                    }
                }
                None => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }

        out
    }

    /// Canonical values of the fields a payload actually carries
    ///
    /// Unlike [`to_canonical`](Self::to_canonical) nothing is defaulted, so
    /// the result can be layered over an existing record.
    pub fn resolve_present(&self, raw: &RawPayload) -> RawPayload {
        self.schema
            .rules
            .iter()
            .filter_map(|rule| {
                rule.candidates()
                    .find_map(|path| lookup(raw, path).and_then(|v| coerce(rule.kind, v)))
                    .map(|value| (rule.target.to_string(), value))
            })
            .collect()
    }

    /// Re-map a record after a canonical change set
    ///
    /// Nulls clear fields; cleared required fields come back as their zero
    /// value. Derived fields are recomputed unless `changes` sets them.
    pub fn apply_changes(&self, id: &str, base: &RawPayload, changes: &RawPayload) -> Record {
        let mut merged = base.clone();
        for (key, value) in changes {
            if value.is_null() {
                merged.remove(key);
            } else {
                merged.insert(key.clone(), value.clone());
            }
        }

        for rule in self.schema.rules {
            let derived = matches!(rule.default, FieldDefault::Derive(_));
            let explicit = changes.get(rule.target).is_some_and(|v| !v.is_null());
            if derived && !explicit {
                merged.remove(rule.target);
            }
        }

        merged.insert("id".into(), Value::String(id.to_string()));
        self.to_canonical(&merged)
    }

    /// Id carried by a payload, if any
    pub fn find_id(&self, raw: &RawPayload) -> Option<String> {
        std::iter::once("id")
            .chain(self.schema.id_sources.iter().copied())
            .find_map(|path| match lookup(raw, path) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
    }

    fn resolve_id(&self, raw: &RawPayload) -> String {
        self.find_id(raw).unwrap_or_else(|| self.content_id(raw))
    }

    /// Deterministic id for payloads that carry none
    fn content_id(&self, raw: &RawPayload) -> String {
        let bytes = serde_json::to_vec(raw).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        format!("{}-{}", self.schema.id_prefix, &hex::encode(digest)[..12])
    }
}

/// Resolve a dotted path; null counts as missing
fn lookup<'a>(raw: &'a RawPayload, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = raw.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    (!current.is_null()).then_some(current)
}
