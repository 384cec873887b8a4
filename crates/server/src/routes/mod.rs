//! HTTP routing layer.
//!
//! Thin by design: each route module maps one URL path onto calls into the
//! core. Cache semantics live in `regcache-core`; handlers only translate
//! between HTTP and the store/coordinator surface.

pub mod health;
pub mod lookup;
pub mod refresh;
pub mod stats;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/api/lookup", get(lookup::lookup))
        .route("/api/stats", get(stats::stats))
        .route("/admin/refresh", post(refresh::refresh))
        .with_state(state)
}
