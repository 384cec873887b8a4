//! Structured errors for the regcache HTTP surface.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// JSON body for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Errors a route handler can answer with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The `key` query parameter is required.
    #[error("missing required query parameter: key")]
    MissingKey,

    /// No snapshot is available to answer lookups yet.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Admin credential missing or wrong.
    #[error("unauthorized")]
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::MissingKey => (StatusCode::BAD_REQUEST, "missing_key"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
        };

        let body = Json(ErrorResponse { error: self.to_string(), code: code.to_string() });
        (status, body).into_response()
    }
}
