//! Total coercions from loosely typed JSON into canonical values
//!
//! `None` means "this candidate does not count, try the next one". Numbers
//! and enums never return `None` for a defined input: garbage becomes 0 or
//! the enum's fallback category.

use super::rules::{EnumSpec, FieldKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

const TIME_FORMATS: &[&str] = &[
    "%H:%M:%S%.f",
    "%H:%M",
    "%I:%M %p",
    "%I:%M%p",
    "%I:%M:%S %p",
];

/// Keys that name a nested referenced entity, in preference order
const LABEL_KEYS: &[&str] = &["name", "label", "title", "code", "id"];

/// Coerce `value` for a field of `kind`
pub fn coerce(kind: FieldKind, value: &Value) -> Option<Value> {
    if value.is_null() {
        return None;
    }
    match kind {
        FieldKind::Text => text(value).map(Value::String),
        FieldKind::Number => match value {
            Value::Object(_) | Value::Array(_) => None,
            _ => Some(Value::from(number(value))),
        },
        FieldKind::Bool => boolean(value).map(Value::Bool),
        FieldKind::Date => date(value).map(Value::String),
        FieldKind::Time => time(value).map(Value::String),
        FieldKind::Timestamp => timestamp(value).map(Value::String),
        FieldKind::Reference => reference(value).map(Value::String),
        FieldKind::Enum(spec) => Some(Value::String(category(spec, value).to_string())),
    }
}

pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(_) => reference(value),
        _ => None,
    }
}

/// Safe numeric parse; never NaN or infinite
pub fn number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_number(s),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    // Accounting notation: (12.50) is negative
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .collect();

    let parsed = cleaned.parse::<f64>().unwrap_or(0.0);
    if negative {
        -parsed
    } else {
        parsed
    }
}

pub fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "on" | "active" | "enabled" => Some(true),
            "false" | "no" | "n" | "0" | "off" | "inactive" | "disabled" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn reference(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => LABEL_KEYS.iter().find_map(|key| match map.get(*key) {
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }),
        _ => None,
    }
}

pub fn date(value: &Value) -> Option<String> {
    parse_instant(value)
        .map(|dt| dt.date())
        .or_else(|| value.as_str().and_then(|s| parse_date(s.trim())))
        .map(|d| d.format(DATE_FORMAT).to_string())
}

pub fn time(value: &Value) -> Option<String> {
    let parsed = match value {
        Value::String(s) => {
            let s = s.trim();
            parse_time(s).or_else(|| parse_datetime(s).map(|dt| dt.time()))
        }
        _ => parse_instant(value).map(|dt| dt.time()),
    };
    parsed.map(|t| t.format(TIME_FORMAT).to_string())
}

pub fn timestamp(value: &Value) -> Option<String> {
    let instant = match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| parse_datetime(s).map(|dt| dt.and_utc()))
                .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc()))
                .or_else(|| s.parse::<f64>().ok().and_then(from_epoch))
        }
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        Value::Object(map) => return map.get("$date").and_then(timestamp),
        _ => None,
    };
    instant.map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Match a value against an enum's canonical names and aliases
pub fn category(spec: &EnumSpec, value: &Value) -> &'static str {
    let Some(raw) = reference(value) else {
        return spec.fallback;
    };
    let needle = raw.trim().replace(['-', ' '], "_");

    spec.variants
        .iter()
        .find(|(name, aliases)| {
            name.eq_ignore_ascii_case(&needle)
                || aliases.iter().any(|alias| alias.eq_ignore_ascii_case(&needle))
        })
        .map(|(name, _)| *name)
        .unwrap_or(spec.fallback)
}

/// A date-time in the value's own offset, for strings, epochs and `$date` objects
fn parse_instant(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            parse_datetime(s).or_else(|| {
                // Compact forms like "20240305" are not epochs
                if s.len() >= 10 && s.chars().all(|c| c.is_ascii_digit()) {
                    s.parse::<f64>().ok().and_then(from_epoch).map(|dt| dt.naive_utc())
                } else {
                    None
                }
            })
        }
        Value::Number(n) => n.as_f64().and_then(from_epoch).map(|dt| dt.naive_utc()),
        Value::Object(map) => map.get("$date").and_then(parse_instant),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

/// Epoch seconds or milliseconds; anything past 1e11 is taken as millis
fn from_epoch(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    if n > 1e11 {
        DateTime::from_timestamp_millis(n as i64)
    } else {
        DateTime::from_timestamp(n as i64, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DIRECTION: EnumSpec = EnumSpec {
        variants: &[("RECEIPT", &["IN", "INBOUND"]), ("SHIPMENT", &["OUT", "OUTBOUND"])],
        fallback: "ADJUSTMENT",
    };

    #[test]
    fn test_number_is_total() {
        assert_eq!(number(&json!(12.5)), 12.5);
        assert_eq!(number(&json!("1,250.75")), 1250.75);
        assert_eq!(number(&json!("$ 99")), 99.0);
        assert_eq!(number(&json!("(40.00)")), -40.0);
        assert_eq!(number(&json!("abc")), 0.0);
        assert_eq!(number(&json!({"nested": 1})), 0.0);
        assert_eq!(number(&json!([1, 2])), 0.0);
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(date(&json!("2024-03-05T10:15:00Z")).as_deref(), Some("2024-03-05"));
        assert_eq!(date(&json!("2024-03-05T23:30:00-05:00")).as_deref(), Some("2024-03-05"));
        assert_eq!(date(&json!("2024-03-05")).as_deref(), Some("2024-03-05"));
        assert_eq!(date(&json!("2024/03/05")).as_deref(), Some("2024-03-05"));
        assert_eq!(date(&json!("2024-03-05 08:00:00")).as_deref(), Some("2024-03-05"));
        assert_eq!(date(&json!(1709633700000_i64)).as_deref(), Some("2024-03-05"));
        assert_eq!(date(&json!({"$date": "2024-03-05T00:00:00Z"})).as_deref(), Some("2024-03-05"));
        assert_eq!(date(&json!("next tuesday")), None);
    }

    #[test]
    fn test_time_formats() {
        assert_eq!(time(&json!("08:30")).as_deref(), Some("08:30"));
        assert_eq!(time(&json!("8:05")).as_deref(), Some("08:05"));
        assert_eq!(time(&json!("17:45:59")).as_deref(), Some("17:45"));
        assert_eq!(time(&json!("5:30 PM")).as_deref(), Some("17:30"));
        assert_eq!(time(&json!("2024-03-05T22:10:00Z")).as_deref(), Some("22:10"));
        assert_eq!(time(&json!("late")), None);
    }

    #[test]
    fn test_timestamp_normalizes_to_utc() {
        assert_eq!(
            timestamp(&json!("2024-03-05T10:00:00+02:00")).as_deref(),
            Some("2024-03-05T08:00:00Z")
        );
        assert_eq!(
            timestamp(&json!("2024-03-05")).as_deref(),
            Some("2024-03-05T00:00:00Z")
        );
    }

    #[test]
    fn test_reference_accepts_flat_and_nested() {
        assert_eq!(reference(&json!("Main Warehouse")).as_deref(), Some("Main Warehouse"));
        assert_eq!(reference(&json!({"id": 4, "name": "Dock B"})).as_deref(), Some("Dock B"));
        assert_eq!(reference(&json!({"code": "WH-2"})).as_deref(), Some("WH-2"));
        assert_eq!(reference(&json!({"x": true})), None);
    }

    #[test]
    fn test_category_aliases_and_fallback() {
        assert_eq!(category(&DIRECTION, &json!("IN")), "RECEIPT");
        assert_eq!(category(&DIRECTION, &json!("outbound")), "SHIPMENT");
        assert_eq!(category(&DIRECTION, &json!("receipt")), "RECEIPT");
        assert_eq!(category(&DIRECTION, &json!("sideways")), "ADJUSTMENT");
        assert_eq!(category(&DIRECTION, &json!({"code": "OUT"})), "SHIPMENT");
        assert_eq!(category(&DIRECTION, &json!([1])), "ADJUSTMENT");
    }

    #[test]
    fn test_boolean_words() {
        assert_eq!(boolean(&json!("Yes")), Some(true));
        assert_eq!(boolean(&json!(0)), Some(false));
        assert_eq!(boolean(&json!("maybe")), None);
    }
}
