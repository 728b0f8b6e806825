//! Finance ledger transactions

use crate::mapper::{EntitySchema, EnumSpec, FieldDefault, FieldRule};
use serde_json::{json, Value};

pub static TRANSACTION_TYPE: EnumSpec = EnumSpec {
    variants: &[
        ("INCOME", &["credit", "in", "deposit", "revenue", "sale"]),
        ("EXPENSE", &["debit", "out", "withdrawal", "cost", "purchase"]),
        ("TRANSFER", &["move", "internal"]),
    ],
    fallback: "EXPENSE",
};

pub static TRANSACTION_STATUS: EnumSpec = EnumSpec {
    variants: &[
        ("POSTED", &["posted", "cleared", "complete", "completed", "reconciled"]),
        ("PENDING", &["pending", "draft", "open", "unposted"]),
        ("VOID", &["void", "voided", "cancelled", "canceled", "reversed"]),
    ],
    fallback: "PENDING",
};

static RULES: &[FieldRule] = &[
    FieldRule::timestamp("created_at").from(&["createdAt", "inserted_at", "timestamp"]),
    FieldRule::date("date")
        .from(&["transaction_date", "txn_date", "posted_at", "created_at"])
        .wire("transaction_date")
        .required(),
    FieldRule::text("description")
        .from(&["memo", "narration", "details", "note"])
        .required(),
    FieldRule::number("amount").from(&["value", "total", "amount.value"]).required(),
    FieldRule::category("type", &TRANSACTION_TYPE)
        .from(&["transaction_type", "kind", "direction"])
        .required(),
    FieldRule::reference("category")
        .from(&["category_name", "category.name"])
        .or(FieldDefault::Text("Uncategorized")),
    FieldRule::reference("account").from(&["account_name", "account.name", "account_id"]),
    FieldRule::category("status", &TRANSACTION_STATUS)
        .from(&["state", "transaction_status"])
        .required(),
    FieldRule::text("reference").from(&["ref", "reference_number", "doc_no"]),
];

fn seed() -> Vec<Value> {
    vec![
        json!({
            "id": "tx-1001",
            "date": "2024-03-01",
            "description": "Invoice #2041 - Northwind Traders",
            "amount": 4250.00,
            "type": "INCOME",
            "category": "Sales",
            "account": "Operating Account",
            "status": "POSTED",
            "reference": "INV-2041"
        }),
        json!({
            "id": "tx-1002",
            "date": "2024-03-03",
            "description": "Warehouse lease - March",
            "amount": 1800.00,
            "type": "EXPENSE",
            "category": "Rent",
            "account": "Operating Account",
            "status": "POSTED",
            "reference": "LEASE-0324"
        }),
        json!({
            "id": "tx-1003",
            "date": "2024-03-05",
            "description": "Packaging supplies",
            "amount": 312.40,
            "type": "EXPENSE",
            "category": "Supplies",
            "account": "Company Card",
            "status": "PENDING"
        }),
    ]
}

pub static TRANSACTIONS: EntitySchema = EntitySchema {
    entity: "transactions",
    module_key: "finance.transactions",
    id_prefix: "tx",
    path: "/finance/transactions",
    collection_key: "transactions",
    record_key: "transaction",
    table: "transactions",
    id_sources: &["_id", "transaction_id", "uuid"],
    timestamp_field: Some("created_at"),
    rules: RULES,
    seed,
};
