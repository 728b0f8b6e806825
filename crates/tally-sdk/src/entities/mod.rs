//! Entity schemas of the Tally modules
//!
//! One static [`EntitySchema`] per entity kind. Each carries the mapping
//! rules for drifting remote payloads, the alias tables of its enumerated
//! fields, and the seed records shown before anything else is known.

mod accounts;
mod movements;
mod payments;
mod shifts;
mod transactions;

pub use accounts::{ACCOUNTS, ACCOUNT_TYPE};
pub use movements::{MOVEMENTS, MOVEMENT_TYPE};
pub use payments::{PAYMENTS, PAYMENT_METHOD, PAYMENT_STATUS};
pub use shifts::{SHIFTS, SHIFT_STATUS};
pub use transactions::{TRANSACTIONS, TRANSACTION_STATUS, TRANSACTION_TYPE};

use crate::mapper::EntitySchema;

/// Every schema, finance first
pub static ALL: &[&EntitySchema] = &[&TRANSACTIONS, &ACCOUNTS, &PAYMENTS, &MOVEMENTS, &SHIFTS];

/// Schema by entity name or module key
pub fn by_name(name: &str) -> Option<&'static EntitySchema> {
    ALL.iter()
        .copied()
        .find(|schema| schema.entity == name || schema.module_key == name)
}
