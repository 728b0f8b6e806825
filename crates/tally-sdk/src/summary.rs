//! Derived view-model summaries
//!
//! Reductions over a list of records as returned by a repository. Records
//! with missing or odd fields still count; their amounts are zero.

use crate::record::Record;
use serde::{Deserialize, Serialize};

/// Income and expense totals of a set of transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub income: f64,
    pub expense: f64,
    /// `income - expense`
    pub balance: f64,
    /// Transactions counted (voided ones are not)
    pub count: usize,
}

impl TransactionSummary {
    pub fn from_records(records: &[Record]) -> Self {
        let mut summary = Self::default();
        for record in records {
            if record.text("status") == Some("VOID") {
                continue;
            }
            let amount = record.number("amount").unwrap_or(0.0).abs();
            match record.text("type") {
                Some("INCOME") => summary.income += amount,
                Some("EXPENSE") => summary.expense += amount,
                _ => {}
            }
            summary.count += 1;
        }
        summary.balance = summary.income - summary.expense;
        summary
    }
}

/// Stock flow of a set of movements
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StockSummary {
    pub received: f64,
    pub shipped: f64,
    /// `received - shipped`; transfers and adjustments do not move it
    pub net: f64,
    pub count: usize,
}

impl StockSummary {
    pub fn from_records(records: &[Record]) -> Self {
        Self::reduce(records.iter())
    }

    /// Flow of a single item
    pub fn for_item(records: &[Record], item: &str) -> Self {
        Self::reduce(records.iter().filter(|r| r.text("item") == Some(item)))
    }

    fn reduce<'a>(records: impl Iterator<Item = &'a Record>) -> Self {
        let mut summary = Self::default();
        for record in records {
            let quantity = record.number("quantity").unwrap_or(0.0).abs();
            match record.text("movement_type") {
                Some("RECEIPT") => summary.received += quantity,
                Some("SHIPMENT") => summary.shipped += quantity,
                _ => {}
            }
            summary.count += 1;
        }
        summary.net = summary.received - summary.shipped;
        summary
    }
}

/// Hours of a set of shifts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftSummary {
    /// Hours of every shift that is not cancelled
    pub scheduled_hours: f64,
    pub completed_hours: f64,
    pub count: usize,
}

impl ShiftSummary {
    pub fn from_records(records: &[Record]) -> Self {
        let mut summary = Self::default();
        for record in records {
            let hours = record.number("hours").unwrap_or(0.0);
            match record.text("status") {
                Some("CANCELLED") => {}
                Some("COMPLETED") => {
                    summary.scheduled_hours += hours;
                    summary.completed_hours += hours;
                }
                _ => summary.scheduled_hours += hours,
            }
            summary.count += 1;
        }
        summary
    }
}
