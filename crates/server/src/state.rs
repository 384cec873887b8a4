//! Shared state for the HTTP routing layer.

use std::sync::Arc;
use std::time::Instant;

use regcache_core::config::AppConfig;
use regcache_core::registry::{RefreshCoordinator, RegistryStore};

/// Handles injected into every route handler.
///
/// The store serves reads, the coordinator owns all cache writes; routes
/// never touch the snapshot directly.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<RegistryStore>,
    pub coordinator: Arc<RefreshCoordinator>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<RegistryStore>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            coordinator,
            started_at: Instant::now(),
        }
    }
}
