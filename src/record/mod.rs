//! Extracted directory listings
//!
//! A [`Record`] is one professional listing as scraped from a results page.
//! Every attribute is free text; an empty string means the page did not
//! carry that piece of data.

mod filter;

pub use filter::{Predicate, RecordFilter};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One professional listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Display name; the natural key used for deduplication
    pub title: String,

    /// Credentials line (e.g. "Licensed Mental Health Counselor, LMHC")
    #[serde(default)]
    pub credentials: String,

    /// Verification badge label
    #[serde(default)]
    pub verified: String,

    /// Free-text statement / bio excerpt
    #[serde(default)]
    pub statement: String,

    /// Phone number exactly as displayed
    #[serde(default)]
    pub phone: String,

    /// Physical location line
    #[serde(default)]
    pub location: String,

    /// Absolute profile URL
    #[serde(default)]
    pub link: String,

    /// "Accepting new clients" label
    #[serde(default)]
    pub accepting_appointments: String,
}

impl Record {
    /// Creates a record with only the natural key set
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Returns true if the listing advertises that it accepts new clients
    pub fn is_accepting(&self) -> bool {
        !self.accepting_appointments.is_empty()
    }
}

/// Collapses records sharing a title into one, last occurrence wins
///
/// The surviving record keeps the position where its title was first seen,
/// so the output order is deterministic for a given input order. Running
/// this on an already deduplicated sequence returns it unchanged.
pub fn dedup_records(records: Vec<Record>) -> Vec<Record> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut unique: Vec<Record> = Vec::with_capacity(records.len());

    for record in records {
        match positions.get(&record.title) {
            Some(&index) => unique[index] = record,
            None => {
                positions.insert(record.title.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    unique
}
