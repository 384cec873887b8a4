//! Registry domain model: records, lookup keys, and snapshots.
//!
//! A [`Snapshot`] is one complete copy of the upstream register, keyed by the
//! normalized registration number. It is the unit of atomic replacement: the
//! store always holds exactly one live snapshot and readers never observe a
//! partially-built one.

pub mod mirror;
pub mod normalize;
pub mod refresh;
pub mod store;

pub use mirror::{MirrorError, SnapshotMirror};
pub use normalize::{ParseError, normalize};
pub use refresh::{RefreshCoordinator, RefreshError, RefreshKind, RefreshOutcome};
pub use store::RegistryStore;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One upstream-registered producer entry.
///
/// All fields are opaque text; upstream is inconsistent about which fields it
/// populates, so any of them may be empty. A record has no identity beyond
/// its registration number and is immutable once constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub registration_number: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub vat_number: String,
    #[serde(default)]
    pub tax_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
}

/// Derive the lookup key for a raw registration number.
///
/// Trim plus uppercase is the only key space used for storage and lookup.
/// Numbers differing only by case or surrounding whitespace collide to the
/// same entry.
pub fn lookup_key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// One complete, atomically-installed copy of the lookup table plus its fetch
/// timestamp. `fetched_at` is `None` only for the empty snapshot a store
/// holds before the first successful refresh.
#[derive(Debug, Clone)]
pub struct Snapshot {
    entries: HashMap<String, Record>,
    fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// The empty snapshot held before the first successful refresh.
    pub fn empty() -> Self {
        Self { entries: HashMap::new(), fetched_at: None }
    }

    /// Build a snapshot from normalized records.
    ///
    /// Keys are derived with [`lookup_key`]; on collision the last record in
    /// document order wins silently.
    pub fn from_records(records: Vec<Record>, fetched_at: DateTime<Utc>) -> Self {
        let mut entries = HashMap::with_capacity(records.len());
        for record in records {
            entries.insert(lookup_key(&record.registration_number), record);
        }
        Self { entries, fetched_at: Some(fetched_at) }
    }

    /// Rebuild a snapshot from already-keyed entries (mirror restore path).
    pub fn from_entries(entries: HashMap<String, Record>, fetched_at: Option<DateTime<Utc>>) -> Self {
        Self { entries, fetched_at }
    }

    /// Exact-match lookup by an already-normalized key.
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.entries.get(key)
    }

    /// Iterate over `(key, record)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Record)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}
