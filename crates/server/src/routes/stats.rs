//! Cache statistics endpoint.
//!
//! This is also where the outcome of an asynchronous forced refresh becomes
//! observable: entry count and lastUpdate move on success, stay put on
//! failure.

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub entries: usize,
    pub last_update: Option<DateTime<Utc>>,
    pub age_minutes: Option<i64>,
    pub is_loading: bool,
    pub ttl_hours: i64,
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(stats_impl(&state))
}

pub fn stats_impl(state: &AppState) -> StatsResponse {
    StatsResponse {
        entries: state.store.len(),
        last_update: state.store.last_update(),
        age_minutes: state.store.age().map(|age| age.num_minutes()),
        is_loading: state.store.is_loading(),
        ttl_hours: state.config.ttl_hours,
    }
}
