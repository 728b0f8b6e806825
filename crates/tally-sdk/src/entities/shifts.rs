//! Workforce shifts

use crate::mapper::{EntitySchema, EnumSpec, FieldDefault, FieldRule};
use chrono::NaiveTime;
use serde_json::{json, Map, Value};

pub static SHIFT_STATUS: EnumSpec = EnumSpec {
    variants: &[
        ("SCHEDULED", &["planned", "upcoming", "assigned"]),
        ("IN_PROGRESS", &["active", "started", "ongoing", "clocked_in"]),
        ("COMPLETED", &["done", "finished", "closed", "clocked_out"]),
        ("CANCELLED", &["canceled", "no_show", "dropped"]),
    ],
    fallback: "SCHEDULED",
};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Length of a shift in hours; an end before the start wraps past midnight
fn shift_hours(fields: &Map<String, Value>) -> Option<Value> {
    let start = parse_time(fields.get("start_time")?)?;
    let end = parse_time(fields.get("end_time")?)?;

    let mut minutes = (end - start).num_minutes();
    if minutes < 0 {
        minutes += MINUTES_PER_DAY;
    }
    Some(Value::from((minutes as f64 / 60.0 * 100.0).round() / 100.0))
}

fn parse_time(value: &Value) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.as_str()?, "%H:%M").ok()
}

static RULES: &[FieldRule] = &[
    FieldRule::reference("employee")
        .from(&["employee_name", "staff", "worker", "assignee"])
        .required(),
    FieldRule::text("role").from(&["position", "job_title", "employee.role"]),
    FieldRule::date("date").from(&["shift_date", "day", "start"]).wire("shift_date").required(),
    FieldRule::time("start_time").from(&["start", "starts_at", "clock_in"]).required(),
    FieldRule::time("end_time").from(&["end", "ends_at", "clock_out"]).required(),
    FieldRule::number("hours")
        .from(&["duration_hours", "total_hours"])
        .or(FieldDefault::Derive(shift_hours)),
    FieldRule::category("status", &SHIFT_STATUS).from(&["state", "shift_status"]).required(),
    FieldRule::reference("location").from(&["site", "store", "location_name"]),
    FieldRule::timestamp("created_at").from(&["createdAt"]),
];

fn seed() -> Vec<Value> {
    vec![
        json!({
            "id": "sh-7001",
            "employee": "Dana Ruiz",
            "role": "Picker",
            "date": "2024-03-04",
            "start_time": "06:00",
            "end_time": "14:00",
            "status": "COMPLETED",
            "location": "Main warehouse"
        }),
        json!({
            "id": "sh-7002",
            "employee": "Sam Okafor",
            "role": "Forklift operator",
            "date": "2024-03-04",
            "start_time": "14:00",
            "end_time": "22:30",
            "status": "COMPLETED",
            "location": "Main warehouse"
        }),
        json!({
            "id": "sh-7003",
            "employee": "Lee Park",
            "role": "Night supervisor",
            "date": "2024-03-05",
            "start_time": "22:00",
            "end_time": "06:00",
            "status": "SCHEDULED",
            "location": "Dock B"
        }),
    ]
}

pub static SHIFTS: EntitySchema = EntitySchema {
    entity: "shifts",
    module_key: "workforce.shifts",
    id_prefix: "sh",
    path: "/workforce/shifts",
    collection_key: "shifts",
    record_key: "shift",
    table: "shifts",
    id_sources: &["_id", "shift_id"],
    timestamp_field: Some("created_at"),
    rules: RULES,
    seed,
};
