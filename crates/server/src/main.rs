//! regcached entry point.
//!
//! Boots the lookup service: restores the persisted snapshot (if any) before
//! the HTTP phase begins, spawns the daily refresh scheduler, then serves.
//! Logging goes to stderr as JSON lines.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use regcache_client::RegisterClient;
use regcache_core::config::AppConfig;
use regcache_core::registry::{RefreshCoordinator, RegistryStore, SnapshotMirror};

mod error;
mod routes;
mod scheduler;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    config.require_upstream_url()?;

    let store = Arc::new(RegistryStore::new());
    let mirror = Arc::new(SnapshotMirror::new(&config.cache_file));
    match mirror.load() {
        Ok(Some(snapshot)) => {
            tracing::info!(entries = snapshot.len(), "restored register snapshot from disk");
            store.install(snapshot);
        }
        Ok(None) => tracing::info!("no persisted snapshot; cache starts empty"),
        Err(e) => {
            tracing::warn!(error = %e, "could not restore persisted snapshot; cache starts empty");
        }
    }

    let fetcher = Arc::new(RegisterClient::from_app(&config)?);
    let coordinator = Arc::new(RefreshCoordinator::new(
        fetcher,
        Arc::clone(&store),
        mirror,
        config.ttl(),
    ));

    tokio::spawn(scheduler::run(Arc::clone(&coordinator), config.refresh_hour));

    let bind = config.bind.clone();
    let state = AppState::new(config, store, coordinator);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(addr = %bind, "regcached listening");
    axum::serve(listener, app).await?;

    Ok(())
}
