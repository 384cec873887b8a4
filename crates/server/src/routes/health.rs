//! Liveness endpoint.

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub uptime: u64,
    pub cache: CacheHealth,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHealth {
    pub entries: usize,
    pub last_update: Option<DateTime<Utc>>,
    /// Seconds since the last successful refresh.
    pub age: Option<i64>,
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health_impl(&state))
}

pub fn health_impl(state: &AppState) -> HealthResponse {
    HealthResponse {
        ok: true,
        uptime: state.started_at.elapsed().as_secs(),
        cache: CacheHealth {
            entries: state.store.len(),
            last_update: state.store.last_update(),
            age: state.store.age().map(|age| age.num_seconds()),
        },
    }
}
