//! Registration number lookup endpoint.
//!
//! Reads only the in-memory snapshot and never waits on the network, with
//! one exception: the first-ever query against a still-empty store triggers
//! a lazy refresh and waits for it, because there is nothing to answer from
//! yet.

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use regcache_core::Record;
use regcache_core::registry::{RefreshKind, RefreshOutcome, lookup_key};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the lookup endpoint.
#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub key: Option<String>,
}

/// Response body for a lookup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    pub ok: bool,
    pub registered: bool,
    pub status: &'static str,
    pub key: String,
    pub company: Option<String>,
    pub details: Option<Record>,
    pub checked_at: DateTime<Utc>,
    pub cache_age: Option<i64>,
}

pub async fn lookup(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> Result<Json<LookupResponse>, ApiError> {
    lookup_impl(&state, params).await.map(Json)
}

pub async fn lookup_impl(state: &AppState, params: LookupParams) -> Result<LookupResponse, ApiError> {
    let raw_key = params
        .key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(ApiError::MissingKey)?
        .to_string();

    if state.store.is_empty() {
        match state.coordinator.refresh(RefreshKind::Lazy).await {
            Ok(RefreshOutcome::Refreshed { entries }) => {
                tracing::info!(entries, "lazy refresh filled the empty store");
            }
            Ok(RefreshOutcome::Fresh) => {}
            Ok(RefreshOutcome::AlreadyRefreshing) => {
                if state.store.is_empty() {
                    return Err(ApiError::Unavailable(
                        "register snapshot is still loading".into(),
                    ));
                }
            }
            Err(e) => {
                return Err(ApiError::Unavailable(format!(
                    "register snapshot unavailable: {}",
                    e
                )));
            }
        }
    }

    let record = state.store.lookup(&raw_key);
    let registered = record.is_some();

    Ok(LookupResponse {
        ok: true,
        registered,
        status: if registered { "registered" } else { "not_found" },
        key: lookup_key(&raw_key),
        company: record.as_ref().map(|r| r.company_name.clone()),
        details: record,
        checked_at: Utc::now(),
        cache_age: state.store.age().map(|age| age.num_seconds()),
    })
}
