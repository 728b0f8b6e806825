//! Outgoing payments

use crate::mapper::{EntitySchema, EnumSpec, FieldRule};
use serde_json::{json, Value};

pub static PAYMENT_METHOD: EnumSpec = EnumSpec {
    variants: &[
        ("BANK_TRANSFER", &["bank", "transfer", "wire", "ach", "sepa"]),
        ("CARD", &["credit_card", "debit_card", "visa", "mastercard"]),
        ("CASH", &["petty_cash"]),
        ("CHECK", &["cheque"]),
    ],
    fallback: "BANK_TRANSFER",
};

pub static PAYMENT_STATUS: EnumSpec = EnumSpec {
    variants: &[
        ("SCHEDULED", &["pending", "queued", "planned"]),
        ("PAID", &["completed", "complete", "settled", "sent", "success"]),
        ("FAILED", &["declined", "rejected", "bounced", "error"]),
    ],
    fallback: "SCHEDULED",
};

static RULES: &[FieldRule] = &[
    FieldRule::reference("payee")
        .from(&["payee_name", "vendor", "recipient", "beneficiary.name"])
        .required(),
    FieldRule::number("amount").from(&["total", "value"]).required(),
    FieldRule::date("date")
        .from(&["payment_date", "paid_at", "due_date", "created_at"])
        .wire("payment_date")
        .required(),
    FieldRule::category("method", &PAYMENT_METHOD)
        .from(&["payment_method", "channel"])
        .required(),
    FieldRule::category("status", &PAYMENT_STATUS).from(&["state"]).required(),
    FieldRule::reference("account").from(&["account_name", "from_account", "source_account"]),
    FieldRule::text("reference").from(&["ref", "invoice", "invoice_number"]),
    FieldRule::timestamp("created_at").from(&["createdAt"]),
];

fn seed() -> Vec<Value> {
    vec![
        json!({
            "id": "pay-5001",
            "payee": "Harbor Logistics",
            "amount": 960.00,
            "date": "2024-03-04",
            "method": "BANK_TRANSFER",
            "status": "PAID",
            "account": "Operating Account",
            "reference": "HL-7782"
        }),
        json!({
            "id": "pay-5002",
            "payee": "Brightline Utilities",
            "amount": 415.25,
            "date": "2024-03-15",
            "method": "CARD",
            "status": "SCHEDULED",
            "account": "Company Card"
        }),
    ]
}

pub static PAYMENTS: EntitySchema = EntitySchema {
    entity: "payments",
    module_key: "finance.payments",
    id_prefix: "pay",
    path: "/finance/payments",
    collection_key: "payments",
    record_key: "payment",
    table: "payments",
    id_sources: &["_id", "payment_id"],
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
    fn test_vendor_object_and_method_alias() {
        let mapper = RecordMapper::new(&PAYMENTS);
        let record = mapper.to_canonical(&payload(json!({
            "payment_id": "P-9",
            "vendor": {"id": 12, "name": "Acme Corp"},
            "total": "250",
            "paid_at": 1709856000,
            "payment_method": "Credit Card",
            "state": "settled"
        })));

        assert_eq!(record.id(), "P-9");
        assert_eq!(record.text("payee"), Some("Acme Corp"));
        assert_eq!(record.number("amount"), Some(250.0));
        assert_eq!(record.text("date"), Some("2024-03-08"));
        assert_eq!(record.text("method"), Some("CARD"));
        assert_eq!(record.text("status"), Some("PAID"));
    }
}
