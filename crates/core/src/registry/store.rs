//! In-memory lookup store with atomic snapshot replacement.
//!
//! Readers load the current [`Snapshot`] through an `ArcSwap`, so a lookup
//! observes either the old or the new snapshot in full, never a mix. The
//! loading flag is the refresh coordinator's exclusivity guard; it is the
//! only other piece of shared mutable state in the process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use chrono::{DateTime, Duration, Utc};

use super::{Record, Snapshot, lookup_key};

/// Exact-match, key-normalized lookup table over the live snapshot.
pub struct RegistryStore {
    current: ArcSwap<Snapshot>,
    loading: AtomicBool,
}

impl RegistryStore {
    /// Create a store holding the empty snapshot.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
            loading: AtomicBool::new(false),
        }
    }

    /// Normalize `raw_query` the same way keys were normalized at build time,
    /// then exact-match. Pure read; never blocks on I/O.
    pub fn lookup(&self, raw_query: &str) -> Option<Record> {
        self.current.load().get(&lookup_key(raw_query)).cloned()
    }

    /// Atomically replace the live snapshot.
    pub fn install(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// A cheap read handle on the live snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Timestamp of the last successful install, if any.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.current.load().fetched_at()
    }

    /// Time since the last successful install; `None` before the first one.
    pub fn age(&self) -> Option<Duration> {
        self.last_update().map(|fetched_at| Utc::now() - fetched_at)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Claim the refresh slot. Returns false when a refresh is already in
    /// flight; the caller must then treat its trigger as a no-op.
    pub fn begin_refresh(&self) -> bool {
        self.loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the refresh slot. Called on success and failure alike.
    pub fn end_refresh(&self) {
        self.loading.store(false, Ordering::SeqCst);
    }
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new()
    }
}
