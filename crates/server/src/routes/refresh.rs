//! Forced refresh endpoint.
//!
//! Fire-and-forget: the refresh runs on a background task whose outcome is
//! only logged, and the response returns immediately with the current entry
//! count. Progress is observable via the stats endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;

use regcache_core::registry::RefreshKind;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub ok: bool,
    /// Entry count at the time the refresh was triggered.
    pub entries: usize,
}

pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError> {
    refresh_impl(&state, &headers).map(Json)
}

pub fn refresh_impl(state: &AppState, headers: &HeaderMap) -> Result<RefreshResponse, ApiError> {
    if let Some(expected) = &state.config.admin_key {
        let presented = headers.get("x-admin-key").and_then(|value| value.to_str().ok());
        if presented != Some(expected.as_str()) {
            return Err(ApiError::Unauthorized);
        }
    }

    let coordinator = Arc::clone(&state.coordinator);
    tokio::spawn(async move {
        match coordinator.refresh(RefreshKind::Forced).await {
            Ok(outcome) => tracing::info!(?outcome, "forced refresh finished"),
            Err(e) => tracing::error!(error = %e, "forced refresh failed"),
        }
    });

    Ok(RefreshResponse { ok: true, entries: state.store.len() })
}
