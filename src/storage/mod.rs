// src/storage/mod.rs

//! Job persistence.
//!
//! A single SQLite table holds every record ever scraped, keyed by identity
//! hash. Excluded records are kept for auditing; delivery state lives next
//! to the record (`sent_to_user`, `sent_at`).

mod sqlite;

use std::collections::BTreeMap;

use crate::models::JobRecord;

pub use sqlite::JobStore;

/// A record as read back from the store.
#[derive(Debug, Clone)]
pub struct StoredJob {
    pub id: i64,
    pub identity_hash: String,
    pub record: JobRecord,
    pub sent_to_user: bool,
    /// RFC 3339 timestamp of delivery
    pub sent_at: Option<String>,
}

/// Aggregate counts for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total: usize,
    /// Unsent and not excluded
    pub unsent: usize,
    pub filtered: usize,
    pub by_platform: BTreeMap<String, usize>,
}
