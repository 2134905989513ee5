use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Year = i32;

/// One business-development event, stamped with the year of the file it
/// came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub year: Year,
    /// Categorical columns, keyed by header. Values are kept verbatim.
    pub group_keys: HashMap<String, String>,
    /// Amount in units of 10k currency. Always finite.
    pub amount: f64,
}

impl Record {
    pub fn new(year: Year, group_keys: HashMap<String, String>, amount: f64) -> Self {
        Self {
            year,
            group_keys,
            amount,
        }
    }

    /// Label for a grouping field. A record without the column, or with a
    /// blank cell, falls into the empty-string group.
    pub fn label(&self, field: &str) -> &str {
        self.group_keys.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.group_keys.contains_key(field)
    }
}

pub fn total_amount(records: &[Record]) -> f64 {
    records.iter().map(|r| r.amount).sum()
}
