//! Response envelopes and shape detection
//!
//! The records service answers with whatever shape the endpoint's author
//! chose: a bare array, `{"data": [...]}`, `{"data": {"transactions": [...]}}`
//! or `{"transactions": [...]}`. Instead of duck-typing at each call site,
//! the accepted shapes are listed here as predicate/extractor pairs and tried
//! in order.

use serde_json::{Map, Value};

/// A decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `{ "success": bool, "data"?: .., "message"?: .. }`
    Wrapped {
        success: bool,
        data: Option<Value>,
        message: Option<String>,
    },
    /// Anything else: a bare array or object, or nothing at all
    Bare(Value),
}

impl Envelope {
    /// Classify a response body
    pub fn parse(body: &Value) -> Self {
        if let Value::Object(map) = body {
            if let Some(Value::Bool(success)) = map.get("success") {
                return Envelope::Wrapped {
                    success: *success,
                    data: map.get("data").filter(|d| !d.is_null()).cloned(),
                    message: map
                        .get("message")
                        .or_else(|| map.get("error"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                };
            }
        }
        Envelope::Bare(body.clone())
    }

    /// Bare bodies count as success; failures arrive as transport errors
    pub fn is_success(&self) -> bool {
        match self {
            Envelope::Wrapped { success, .. } => *success,
            Envelope::Bare(_) => true,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Envelope::Wrapped { message, .. } => message.as_deref(),
            Envelope::Bare(_) => None,
        }
    }
}

/// One accepted response shape
#[derive(Debug, Clone, Copy)]
pub struct ShapeDetector {
    pub name: &'static str,
    /// Whether `body` has this shape, given the entity's key
    pub matches: fn(&Value, &str) -> bool,
    /// Pull the items out; only called when `matches` held
    pub extract: fn(&Value, &str) -> Vec<Value>,
}

/// Collection shapes, most specific first
pub const COLLECTION_SHAPES: &[ShapeDetector] = &[
    ShapeDetector {
        name: "bare-array",
        matches: |body, _| body.is_array(),
        extract: |body, _| array_at(Some(body)),
    },
    ShapeDetector {
        name: "data-array",
        matches: |body, _| body.get("data").is_some_and(Value::is_array),
        extract: |body, _| array_at(body.get("data")),
    },
    ShapeDetector {
        name: "data-keyed",
        matches: |body, key| {
            body.get("data")
                .and_then(|d| d.get(key))
                .is_some_and(Value::is_array)
        },
        extract: |body, key| array_at(body.get("data").and_then(|d| d.get(key))),
    },
    ShapeDetector {
        name: "keyed",
        matches: |body, key| body.get(key).is_some_and(Value::is_array),
        extract: |body, key| array_at(body.get(key)),
    },
    ShapeDetector {
        name: "data-items",
        matches: |body, _| {
            body.get("data")
                .and_then(|d| d.get("items"))
                .is_some_and(Value::is_array)
        },
        extract: |body, _| array_at(body.get("data").and_then(|d| d.get("items"))),
    },
    ShapeDetector {
        name: "items",
        matches: |body, _| body.get("items").is_some_and(Value::is_array),
        extract: |body, _| array_at(body.get("items")),
    },
];

/// Single-record shapes, most specific first
pub const RECORD_SHAPES: &[ShapeDetector] = &[
    ShapeDetector {
        name: "data-keyed",
        matches: |body, key| {
            body.get("data")
                .and_then(|d| d.get(key))
                .is_some_and(Value::is_object)
        },
        extract: |body, key| object_at(body.get("data").and_then(|d| d.get(key))),
    },
    ShapeDetector {
        name: "data-object",
        matches: |body, _| body.get("data").is_some_and(Value::is_object),
        extract: |body, _| object_at(body.get("data")),
    },
    ShapeDetector {
        name: "data-singleton",
        matches: |body, _| {
            body.get("data")
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .is_some_and(Value::is_object)
        },
        extract: |body, _| {
            object_at(body.get("data").and_then(Value::as_array).and_then(|items| items.first()))
        },
    },
    ShapeDetector {
        name: "keyed",
        matches: |body, key| body.get(key).is_some_and(Value::is_object),
        extract: |body, key| object_at(body.get(key)),
    },
    ShapeDetector {
        name: "bare-object",
        matches: |body, _| body.is_object() && body.get("success").is_none(),
        extract: |body, _| object_at(Some(body)),
    },
    ShapeDetector {
        name: "bare-singleton",
        matches: |body, _| {
            body.as_array()
                .and_then(|items| items.first())
                .is_some_and(Value::is_object)
        },
        extract: |body, _| object_at(body.as_array().and_then(|items| items.first())),
    },
];

/// First matching detector over `shapes`
pub fn detect<'a>(shapes: &'a [ShapeDetector], body: &Value, key: &str) -> Option<&'a ShapeDetector> {
    shapes.iter().find(|shape| (shape.matches)(body, key))
}

/// Items of a collection response, with the name of the shape that matched
pub fn extract_collection(body: &Value, key: &str) -> Option<(&'static str, Vec<Value>)> {
    detect(COLLECTION_SHAPES, body, key).map(|shape| (shape.name, (shape.extract)(body, key)))
}

/// The record inside a single-record response
pub fn extract_record(body: &Value, key: &str) -> Option<Map<String, Value>> {
    let shape = detect(RECORD_SHAPES, body, key)?;
    (shape.extract)(body, key)
        .into_iter()
        .next()
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
}

/// Top-level keys of a body, for diagnostics
pub fn describe(body: &Value) -> Vec<String> {
    match body {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Null => vec!["<null>".to_string()],
        Value::Array(_) => vec!["<array>".to_string()],
        other => vec![format!("<{}>", type_name(other))],
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        _ => "json",
    }
}

fn array_at(value: Option<&Value>) -> Vec<Value> {
    value
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn object_at(value: Option<&Value>) -> Vec<Value> {
    value.filter(|v| v.is_object()).cloned().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_classification() {
        let failed = Envelope::parse(&json!({"success": false, "message": "Period is closed"}));
        assert!(!failed.is_success());
        assert_eq!(failed.message(), Some("Period is closed"));

        let bare = Envelope::parse(&json!([{"id": 1}]));
        assert!(bare.is_success());

        // A "success" key that is not a bool does not make an envelope
        let odd = Envelope::parse(&json!({"success": "yes", "items": []}));
        assert!(matches!(odd, Envelope::Bare(_)));
    }

    #[test]
    fn test_collection_shapes() {
        let cases = [
            (json!([{"id": "a"}, {"id": "b"}]), "bare-array"),
            (json!({"success": true, "data": [{"id": "a"}, {"id": "b"}]}), "data-array"),
            (json!({"success": true, "data": {"movements": [{"id": "a"}, {"id": "b"}], "total": 2}}), "data-keyed"),
            (json!({"movements": [{"id": "a"}, {"id": "b"}]}), "keyed"),
            (json!({"data": {"items": [{"id": "a"}, {"id": "b"}]}}), "data-items"),
        ];

        for (body, expected) in cases {
            let (shape, items) = extract_collection(&body, "movements").unwrap();
            assert_eq!(shape, expected);
            assert_eq!(items.len(), 2, "shape {}", expected);
        }
    }

    #[test]
    fn test_unrecognized_collection_shape() {
        assert!(extract_collection(&json!({"success": true, "data": {"count": 3}}), "shifts").is_none());
        assert!(extract_collection(&json!("ok"), "shifts").is_none());
        assert!(extract_collection(&Value::Null, "shifts").is_none());
    }

    #[test]
    fn test_record_shapes() {
        let keyed = json!({"success": true, "data": {"shift": {"id": "s1"}, "warnings": []}});
        assert_eq!(extract_record(&keyed, "shift").unwrap()["id"], "s1");

        let data = json!({"success": true, "data": {"id": "s2"}});
        assert_eq!(extract_record(&data, "shift").unwrap()["id"], "s2");

        let bare = json!({"id": "s3", "employee": "Ana"});
        assert_eq!(extract_record(&bare, "shift").unwrap()["id"], "s3");

        let rows = json!([{"id": "s4"}]);
        assert_eq!(extract_record(&rows, "shift").unwrap()["id"], "s4");

        assert!(extract_record(&json!({"success": true}), "shift").is_none());
    }
}
