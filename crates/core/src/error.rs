//! Fetch error taxonomy.
//!
//! Declared in core rather than in the HTTP client so the refresh coordinator
//! can classify failures without depending on any particular transport.

/// Errors from retrieving the upstream register document.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Upstream did not answer within the configured deadline.
    #[error("fetch timeout: {0}")]
    Timeout(String),

    /// Response body exceeded the configured byte cap.
    #[error("response too large: {0}")]
    TooLarge(String),

    /// DNS or connection-level failure.
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    /// Upstream answered HTTP 429; back off before retrying.
    #[error("rate limited by upstream")]
    RateLimited,

    /// Any other non-2xx answer, with status and body preserved for diagnostics.
    #[error("upstream error: status {status}")]
    Upstream { status: u16, body: String },
}
