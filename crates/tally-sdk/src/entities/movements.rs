//! Warehouse stock movements

use crate::mapper::{EntitySchema, EnumSpec, FieldDefault, FieldRule};
use serde_json::{json, Value};

/// Direction of a stock movement
///
/// The warehouse service has used `IN`/`OUT` and several spellings of
/// receipt and shipment over time.
pub static MOVEMENT_TYPE: EnumSpec = EnumSpec {
    variants: &[
        ("RECEIPT", &["in", "inbound", "receive", "received", "incoming", "purchase"]),
        ("SHIPMENT", &["out", "outbound", "ship", "shipped", "outgoing", "issue", "sale"]),
        ("TRANSFER", &["move", "relocation", "internal"]),
        ("ADJUSTMENT", &["adjust", "correction", "count", "stocktake", "writeoff"]),
    ],
    fallback: "ADJUSTMENT",
};

static RULES: &[FieldRule] = &[
    FieldRule::reference("item")
        .from(&["item_name", "product", "sku", "item.sku"])
        .required(),
    FieldRule::number("quantity").from(&["qty", "units", "amount"]).required(),
    FieldRule::category("movement_type", &MOVEMENT_TYPE)
        .from(&["type", "direction", "movementType"])
        .required(),
    FieldRule::reference("location")
        .from(&["warehouse", "site", "location_name", "bin"])
        .or(FieldDefault::Text("Main warehouse")),
    FieldRule::timestamp("created_at").from(&["createdAt", "timestamp"]),
    FieldRule::date("date")
        .from(&["movement_date", "moved_at", "created_at"])
        .wire("movement_date")
        .required(),
    FieldRule::text("reference").from(&["ref", "document", "po_number", "order_number"]),
    FieldRule::text("note").from(&["notes", "comment", "remarks"]),
];

fn seed() -> Vec<Value> {
    vec![
        json!({
            "id": "mv-3001",
            "item": "Corrugated box, large",
            "quantity": 500,
            "movement_type": "RECEIPT",
            "location": "Main warehouse",
            "date": "2024-03-01",
            "reference": "PO-1187"
        }),
        json!({
            "id": "mv-3002",
            "item": "Corrugated box, large",
            "quantity": 120,
            "movement_type": "SHIPMENT",
            "location": "Main warehouse",
            "date": "2024-03-02",
            "reference": "SO-5521"
        }),
        json!({
            "id": "mv-3003",
            "item": "Packing tape",
            "quantity": 48,
            "movement_type": "RECEIPT",
            "location": "Dock B",
            "date": "2024-03-04",
            "reference": "PO-1190"
        }),
        json!({
            "id": "mv-3004",
            "item": "Pallet wrap",
            "quantity": 6,
            "movement_type": "TRANSFER",
            "location": "Overflow store",
            "date": "2024-03-06",
            "note": "Moved to overflow for aisle rework"
        }),
    ]
}

pub static MOVEMENTS: EntitySchema = EntitySchema {
    entity: "movements",
    module_key: "warehouse.movements",
    id_prefix: "mv",
    path: "/warehouse/movements",
    collection_key: "movements",
    record_key: "movement",
    table: "stock_movements",
    id_sources: &["_id", "movement_id"],
    timestamp_field: Some("created_at"),
    rules: RULES,
    seed,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::RecordMapper;
    use crate::repository::payload;

    #[test]
    fn test_in_and_out_aliases() {
        let mapper = RecordMapper::new(&MOVEMENTS);
        let inbound = mapper.to_canonical(&payload(json!({"movement_type": "IN"})));
        let outbound = mapper.to_canonical(&payload(json!({"type": "out"})));
        let unknown = mapper.to_canonical(&payload(json!({"movement_type": "sideways"})));

        assert_eq!(inbound.text("movement_type"), Some("RECEIPT"));
        assert_eq!(outbound.text("movement_type"), Some("SHIPMENT"));
        assert_eq!(unknown.text("movement_type"), Some("ADJUSTMENT"));
    }

    #[test]
    fn test_location_string_or_object() {
        let mapper = RecordMapper::new(&MOVEMENTS);
        let flat = mapper.to_canonical(&payload(json!({"location": "Dock A"})));
        let nested = mapper.to_canonical(&payload(json!({"location": {"id": 2, "name": "Dock C"}})));
        let missing = mapper.to_canonical(&payload(json!({"item": {"sku": "TP-48"}})));

        assert_eq!(flat.text("location"), Some("Dock A"));
        assert_eq!(nested.text("location"), Some("Dock C"));
        assert_eq!(missing.text("location"), Some("Main warehouse"));
        assert_eq!(missing.text("item"), Some("TP-48"));
    }
}
