//! Declarative mapping rules

use serde_json::{Map, Value};

/// Canonical values of an enumerated field and the remote aliases for each
#[derive(Debug, Clone, Copy)]
pub struct EnumSpec {
    /// `(canonical, aliases)` pairs; matching is case-insensitive
    pub variants: &'static [(&'static str, &'static [&'static str])],
    /// Category used when a value is not recognized
    pub fallback: &'static str,
}

impl EnumSpec {
    /// Canonical names in declaration order
    pub fn canonical_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.variants.iter().map(|(name, _)| *name)
    }
}

/// How a canonical field is coerced
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Free text; numbers and booleans are stringified
    Text,
    /// Finite number; anything unparsable becomes 0
    Number,
    /// Boolean; accepts "yes"/"no", "1"/"0" and friends
    Bool,
    /// Calendar date, `YYYY-MM-DD`
    Date,
    /// Time of day, `HH:MM`
    Time,
    /// Instant, RFC 3339 in UTC
    Timestamp,
    /// A referenced entity named by a string or a nested object
    Reference,
    /// One of a fixed set of categories
    Enum(&'static EnumSpec),
}

impl FieldKind {
    /// Value used for a required field when nothing else resolves
    pub fn zero(&self) -> Value {
        match self {
            FieldKind::Number => Value::from(0.0),
            FieldKind::Bool => Value::Bool(false),
            FieldKind::Enum(spec) => Value::String(spec.fallback.to_string()),
            _ => Value::String(String::new()),
        }
    }
}

/// Fallback for a field none of whose candidates resolved
#[derive(Debug, Clone, Copy)]
pub enum FieldDefault {
    /// Leave the field undefined (required fields still get the kind's zero)
    Absent,
    Text(&'static str),
    Number(f64),
    Bool(bool),
    /// Computed from the canonical fields resolved so far
    Derive(fn(&Map<String, Value>) -> Option<Value>),
}

impl FieldDefault {
    pub(crate) fn resolve(&self, resolved: &Map<String, Value>) -> Option<Value> {
        match self {
            FieldDefault::Absent => None,
            FieldDefault::Text(text) => Some(Value::String((*text).to_string())),
            FieldDefault::Number(n) => Some(Value::from(*n)),
            FieldDefault::Bool(b) => Some(Value::Bool(*b)),
            FieldDefault::Derive(derive) => derive(resolved),
        }
    }
}

/// Recipe for one canonical field
///
/// The canonical name is always tried first, then `sources` in order. A
/// source may be a dotted path into nested objects (`"location.name"`).
/// Rules are evaluated in declaration order, so a [`FieldDefault::Derive`]
/// sees every field declared before it.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub target: &'static str,
    pub kind: FieldKind,
    pub sources: &'static [&'static str],
    pub wire: Option<&'static str>,
    pub default: FieldDefault,
    pub required: bool,
}

impl FieldRule {
    pub const fn new(target: &'static str, kind: FieldKind) -> Self {
        Self {
            target,
            kind,
            sources: &[],
            wire: None,
            default: FieldDefault::Absent,
            required: false,
        }
    }

    pub const fn text(target: &'static str) -> Self {
        Self::new(target, FieldKind::Text)
    }

    pub const fn number(target: &'static str) -> Self {
        Self::new(target, FieldKind::Number)
    }

    pub const fn flag(target: &'static str) -> Self {
        Self::new(target, FieldKind::Bool)
    }

    pub const fn date(target: &'static str) -> Self {
        Self::new(target, FieldKind::Date)
    }

    pub const fn time(target: &'static str) -> Self {
        Self::new(target, FieldKind::Time)
    }

    pub const fn timestamp(target: &'static str) -> Self {
        Self::new(target, FieldKind::Timestamp)
    }

    pub const fn reference(target: &'static str) -> Self {
        Self::new(target, FieldKind::Reference)
    }

    pub const fn category(target: &'static str, spec: &'static EnumSpec) -> Self {
        Self::new(target, FieldKind::Enum(spec))
    }

    /// Candidate source fields, tried after the canonical name
    pub const fn from(mut self, sources: &'static [&'static str]) -> Self {
        self.sources = sources;
        self
    }

    /// Field name used in write payloads
    pub const fn wire(mut self, name: &'static str) -> Self {
        self.wire = Some(name);
        self
    }

    pub const fn or(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn wire_name(&self) -> &'static str {
        self.wire.unwrap_or(self.target)
    }

    /// Canonical name followed by the declared sources
    pub fn candidates(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.target).chain(self.sources.iter().copied())
    }
}
