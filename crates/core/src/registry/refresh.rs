//! Refresh coordination.
//!
//! The coordinator decides whether a refresh is due, enforces at-most-one
//! refresh in flight, and runs the pipeline: fetch, normalize, install, then
//! mirror to disk. Success and failure both return the state machine to idle;
//! there is no failed state, because the previously installed snapshot stays
//! authoritative until a newer one fully replaces it.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};

use super::{ParseError, RegistryStore, Snapshot, SnapshotMirror, normalize};
use crate::error::FetchError;
use crate::fetcher::SnapshotFetcher;

/// What triggered a refresh. Only forced triggers bypass the TTL gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// Admin/API trigger; ignores the TTL.
    Forced,
    /// Wall-clock trigger from the daily scheduler.
    Scheduled,
    /// A lookup request found the store empty and is waiting on the result.
    Lazy,
}

impl RefreshKind {
    fn is_forced(self) -> bool {
        matches!(self, RefreshKind::Forced)
    }
}

/// How a refresh trigger was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was fetched and installed.
    Refreshed { entries: usize },
    /// Non-forced trigger under the TTL; nothing to do.
    Fresh,
    /// Another refresh holds the slot; this trigger was a no-op.
    AlreadyRefreshing,
}

/// A refresh that ran and failed. The previous snapshot is untouched.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Orchestrates fetch, normalize, snapshot install, and mirroring.
pub struct RefreshCoordinator {
    fetcher: Arc<dyn SnapshotFetcher>,
    store: Arc<RegistryStore>,
    mirror: Arc<SnapshotMirror>,
    ttl: Duration,
}

impl RefreshCoordinator {
    pub fn new(
        fetcher: Arc<dyn SnapshotFetcher>,
        store: Arc<RegistryStore>,
        mirror: Arc<SnapshotMirror>,
        ttl: Duration,
    ) -> Self {
        Self { fetcher, store, mirror, ttl }
    }

    /// Run one refresh, subject to the TTL gate and the exclusivity guard.
    ///
    /// Errors abort the refresh before install; lookups keep answering from
    /// the previous snapshot. Mirror failures are logged, never propagated:
    /// refresh success is defined by the in-memory install alone.
    pub async fn refresh(&self, kind: RefreshKind) -> Result<RefreshOutcome, RefreshError> {
        if !kind.is_forced()
            && let Some(age) = self.store.age()
            && age < self.ttl
        {
            return Ok(RefreshOutcome::Fresh);
        }

        if !self.store.begin_refresh() {
            tracing::debug!(?kind, "refresh already in flight; trigger dropped");
            return Ok(RefreshOutcome::AlreadyRefreshing);
        }
        let _slot = RefreshSlot { store: &self.store };

        self.run(kind).await
    }

    async fn run(&self, kind: RefreshKind) -> Result<RefreshOutcome, RefreshError> {
        let started = Instant::now();
        tracing::info!(?kind, "starting register refresh");

        let raw = self.fetcher.fetch().await?;
        let fetched_bytes = raw.len();

        // Parsing a multi-hundred-MB document is CPU-bound; keep it off the
        // request-serving threads.
        let records = tokio::task::spawn_blocking(move || normalize(&raw))
            .await
            .map_err(|e| ParseError::Malformed(format!("parser task failed: {e}")))??;

        if records.is_empty() {
            tracing::warn!("refresh extracted zero records; installing empty snapshot");
        }

        let snapshot = Snapshot::from_records(records, Utc::now());
        let entries = snapshot.len();
        self.store.install(snapshot);

        let mirror = Arc::clone(&self.mirror);
        let installed = self.store.snapshot();
        match tokio::task::spawn_blocking(move || mirror.save(&installed)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "snapshot not persisted; in-memory cache unaffected");
            }
            Err(e) => tracing::warn!(error = %e, "snapshot persist task failed"),
        }

        tracing::info!(
            ?kind,
            entries,
            fetched_bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "register refresh complete"
        );
        Ok(RefreshOutcome::Refreshed { entries })
    }
}

/// Clears the loading flag on every exit path, error or not.
struct RefreshSlot<'a> {
    store: &'a RegistryStore,
}

impl Drop for RefreshSlot<'_> {
    fn drop(&mut self) {
        self.store.end_refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Record;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::sync::Notify;

    const ONE_PRODUCER: &str = r#"<Producers>
        <Producer>
            <RegistrationNumber>de999</RegistrationNumber>
            <Name>Acme</Name>
        </Producer>
    </Producers>"#;

    enum Reply {
        Document(&'static str),
        RateLimited,
        Garbage,
    }

    struct StubFetcher {
        reply: Reply,
        calls: AtomicUsize,
        gate: Option<Notify>,
    }

    impl StubFetcher {
        fn document(doc: &'static str) -> Self {
            Self { reply: Reply::Document(doc), calls: AtomicUsize::new(0), gate: None }
        }

        fn rate_limited() -> Self {
            Self { reply: Reply::RateLimited, calls: AtomicUsize::new(0), gate: None }
        }

        fn gated(doc: &'static str) -> Self {
            Self {
                reply: Reply::Document(doc),
                calls: AtomicUsize::new(0),
                gate: Some(Notify::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotFetcher for StubFetcher {
        async fn fetch(&self) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match self.reply {
                Reply::Document(doc) => Ok(Bytes::from_static(doc.as_bytes())),
                Reply::RateLimited => Err(FetchError::RateLimited),
                Reply::Garbage => Ok(Bytes::from_static(b"<Producers><Producer>")),
            }
        }
    }

    struct Fixture {
        fetcher: Arc<StubFetcher>,
        store: Arc<RegistryStore>,
        coordinator: Arc<RefreshCoordinator>,
        _dir: TempDir,
    }

    fn fixture(fetcher: StubFetcher, ttl: Duration) -> Fixture {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(fetcher);
        let store = Arc::new(RegistryStore::new());
        let mirror = Arc::new(SnapshotMirror::new(dir.path().join("cache.json")));
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&fetcher) as Arc<dyn SnapshotFetcher>,
            Arc::clone(&store),
            mirror,
            ttl,
        ));
        Fixture { fetcher, store, coordinator, _dir: dir }
    }

    fn warm(store: &RegistryStore, number: &str, age: Duration) {
        let record = Record { registration_number: number.into(), ..Default::default() };
        store.install(Snapshot::from_records(vec![record], Utc::now() - age));
    }

    #[tokio::test]
    async fn test_refresh_installs_and_persists() {
        let fx = fixture(StubFetcher::document(ONE_PRODUCER), Duration::hours(24));

        let outcome = fx.coordinator.refresh(RefreshKind::Forced).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { entries: 1 });
        assert_eq!(fx.store.lookup("DE999").unwrap().company_name, "Acme");
        assert!(!fx.store.is_loading());

        let mirrored = SnapshotMirror::new(fx._dir.path().join("cache.json"))
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(mirrored.len(), 1);
    }

    #[tokio::test]
    async fn test_ttl_gates_non_forced_triggers() {
        let fx = fixture(StubFetcher::document(ONE_PRODUCER), Duration::hours(24));
        warm(&fx.store, "DE1", Duration::hours(1));

        let outcome = fx.coordinator.refresh(RefreshKind::Scheduled).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Fresh);
        let outcome = fx.coordinator.refresh(RefreshKind::Lazy).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Fresh);
        assert_eq!(fx.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_stale_snapshot_refreshes_on_schedule() {
        let fx = fixture(StubFetcher::document(ONE_PRODUCER), Duration::hours(24));
        warm(&fx.store, "DE1", Duration::hours(25));

        let outcome = fx.coordinator.refresh(RefreshKind::Scheduled).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { entries: 1 });
        assert_eq!(fx.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_forced_ignores_ttl() {
        let fx = fixture(StubFetcher::document(ONE_PRODUCER), Duration::hours(24));
        warm(&fx.store, "DE1", Duration::hours(1));

        let outcome = fx.coordinator.refresh(RefreshKind::Forced).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { entries: 1 });
    }

    #[tokio::test]
    async fn test_concurrent_triggers_run_one_fetch() {
        let fx = fixture(StubFetcher::gated(ONE_PRODUCER), Duration::hours(24));

        let coordinator = Arc::clone(&fx.coordinator);
        let first = tokio::spawn(async move { coordinator.refresh(RefreshKind::Forced).await });

        // let the first refresh claim the slot and block in fetch
        while fx.fetcher.calls() == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        let second = fx.coordinator.refresh(RefreshKind::Forced).await.unwrap();
        assert_eq!(second, RefreshOutcome::AlreadyRefreshing);

        fx.fetcher.gate.as_ref().unwrap().notify_one();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first, RefreshOutcome::Refreshed { entries: 1 });
        assert_eq!(fx.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_snapshot() {
        let fx = fixture(StubFetcher::rate_limited(), Duration::hours(24));
        warm(&fx.store, "DE1", Duration::hours(48));
        let before = fx.store.last_update();

        let result = fx.coordinator.refresh(RefreshKind::Forced).await;
        assert!(matches!(result, Err(RefreshError::Fetch(FetchError::RateLimited))));

        assert_eq!(fx.store.len(), 1);
        assert!(fx.store.lookup("DE1").is_some());
        assert_eq!(fx.store.last_update(), before);
        assert!(!fx.store.is_loading());
    }

    #[tokio::test]
    async fn test_parse_failure_keeps_previous_snapshot() {
        let fx = fixture(
            StubFetcher { reply: Reply::Garbage, calls: AtomicUsize::new(0), gate: None },
            Duration::hours(24),
        );
        warm(&fx.store, "DE1", Duration::hours(48));

        let result = fx.coordinator.refresh(RefreshKind::Scheduled).await;
        assert!(matches!(result, Err(RefreshError::Parse(ParseError::Malformed(_)))));
        assert_eq!(fx.store.len(), 1);
        assert!(!fx.store.is_loading());
    }

    #[tokio::test]
    async fn test_zero_records_is_success() {
        let fx = fixture(
            StubFetcher::document("<Unknown><Layout/></Unknown>"),
            Duration::hours(24),
        );

        let outcome = fx.coordinator.refresh(RefreshKind::Forced).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { entries: 0 });
        assert!(fx.store.is_empty());
        assert!(fx.store.last_update().is_some());
    }

    #[tokio::test]
    async fn test_mirror_failure_does_not_fail_refresh() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let fetcher = Arc::new(StubFetcher::document(ONE_PRODUCER));
        let store = Arc::new(RegistryStore::new());
        let mirror = Arc::new(SnapshotMirror::new(blocker.join("cache.json")));
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&fetcher) as Arc<dyn SnapshotFetcher>,
            Arc::clone(&store),
            mirror,
            Duration::hours(24),
        );

        let outcome = coordinator.refresh(RefreshKind::Forced).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed { entries: 1 });
        assert_eq!(store.len(), 1);
    }
}
