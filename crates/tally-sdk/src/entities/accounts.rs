//! Chart of accounts

use crate::mapper::{EntitySchema, EnumSpec, FieldDefault, FieldRule};
use serde_json::{json, Value};

pub static ACCOUNT_TYPE: EnumSpec = EnumSpec {
    variants: &[
        ("ASSET", &["asset", "assets", "bank", "cash"]),
        ("LIABILITY", &["liability", "liabilities", "credit_card", "loan"]),
        ("EQUITY", &["equity", "capital"]),
        ("REVENUE", &["revenue", "income", "sales"]),
        ("EXPENSE", &["expense", "expenses", "cost"]),
    ],
    fallback: "ASSET",
};

static RULES: &[FieldRule] = &[
    FieldRule::text("name").from(&["account_name", "title", "label"]).required(),
    FieldRule::text("code").from(&["account_code", "number", "gl_code"]),
    FieldRule::category("type", &ACCOUNT_TYPE)
        .from(&["account_type", "kind", "category"])
        .required(),
    FieldRule::number("balance")
        .from(&["current_balance", "balance.amount", "amount"])
        .required(),
    FieldRule::text("currency")
        .from(&["currency_code", "balance.currency"])
        .or(FieldDefault::Text("USD")),
    FieldRule::flag("active").from(&["is_active", "enabled", "status"]).or(FieldDefault::Bool(true)),
    FieldRule::timestamp("created_at").from(&["createdAt", "opened_at"]),
];

fn seed() -> Vec<Value> {
    vec![
        json!({
            "id": "acc-1000",
            "name": "Operating Account",
            "code": "1000",
            "type": "ASSET",
            "balance": 18250.75,
            "currency": "USD"
        }),
        json!({
            "id": "acc-2100",
            "name": "Company Card",
            "code": "2100",
            "type": "LIABILITY",
            "balance": 1312.40,
            "currency": "USD"
        }),
        json!({
            "id": "acc-4000",
            "name": "Sales",
            "code": "4000",
            "type": "REVENUE",
            "balance": 42500.00,
            "currency": "USD"
        }),
    ]
}

pub static ACCOUNTS: EntitySchema = EntitySchema {
    entity: "accounts",
    module_key: "finance.accounts",
    id_prefix: "acc",
    path: "/finance/accounts",
    collection_key: "accounts",
    record_key: "account",
    table: "accounts",
    id_sources: &["_id", "account_id"],
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
    fn test_nested_balance_and_status_flag() {
        let mapper = RecordMapper::new(&ACCOUNTS);
        let record = mapper.to_canonical(&payload(json!({
            "account_name": "Payroll",
            "account_type": "bank",
            "balance": {"amount": "2,000", "currency": "EUR"},
            "status": "inactive"
        })));

        assert_eq!(record.text("type"), Some("ASSET"));
        assert_eq!(record.number("balance"), Some(2000.0));
        assert_eq!(record.text("currency"), Some("EUR"));
        assert_eq!(record.flag("active"), Some(false));
    }

    #[test]
    fn test_defaults() {
        let mapper = RecordMapper::new(&ACCOUNTS);
        let record = mapper.to_canonical(&payload(json!({"name": "Petty cash"})));
        assert_eq!(record.flag("active"), Some(true));
        assert_eq!(record.text("currency"), Some("USD"));
        assert_eq!(record.number("balance"), Some(0.0));
    }
}
