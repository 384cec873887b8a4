//! Bounded fetch of the upstream register document.
//!
//! ### Limits
//! - Response size capped at `max_bytes`: rejected via `Content-Length` when
//!   the upstream advertises one, and enforced again while streaming the body
//!   (chunked responses advertise nothing).
//! - Total wait capped at `timeout`; a full download legitimately takes
//!   minutes, so this is generous but finite.
//!
//! ### Credential
//! Carried in the position the upstream documents: a named header or a named
//! query parameter, per configuration.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use regcache_core::config::{AppConfig, CredentialIn};
use regcache_core::error::FetchError;
use regcache_core::fetcher::SnapshotFetcher;

/// Longest upstream error body kept for diagnostics.
const MAX_ERROR_BODY: usize = 2048;

/// Configuration for the register fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// URL of the upstream register document.
    pub url: String,

    /// Access credential; attached only when non-empty.
    pub api_key: String,

    /// Transport position of the credential.
    pub credential_in: CredentialIn,

    /// Header or query parameter name carrying the credential.
    pub credential_name: String,

    /// User agent string (default: "regcache/0.1").
    pub user_agent: String,

    /// Request timeout (default: 5 minutes).
    pub timeout: Duration,

    /// Maximum response body size in bytes (default: 512MB).
    pub max_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            credential_in: CredentialIn::Header,
            credential_name: "X-Api-Key".to_string(),
            user_agent: "regcache/0.1".to_string(),
            timeout: Duration::from_secs(300),
            max_bytes: 512 * 1024 * 1024,
        }
    }
}

impl FetchConfig {
    /// Derive a fetch configuration from the application configuration.
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            url: config.upstream_url.clone(),
            api_key: config.api_key.clone(),
            credential_in: config.credential_in,
            credential_name: config.credential_name.clone(),
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_bytes: config.max_bytes,
        }
    }
}

/// HTTP fetcher for the upstream register document.
pub struct RegisterClient {
    http: reqwest::Client,
    config: FetchConfig,
}

impl RegisterClient {
    /// Create a new register client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::Unreachable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Create a new register client from the application configuration.
    pub fn from_app(config: &AppConfig) -> Result<Self, FetchError> {
        Self::new(FetchConfig::from_app(config))
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl SnapshotFetcher for RegisterClient {
    /// Fetch the raw register document, or fail without retained state.
    async fn fetch(&self) -> Result<Bytes, FetchError> {
        let start = Instant::now();

        let mut request = self
            .http
            .get(&self.config.url)
            .header("Accept", "application/xml,text/xml;q=0.9,*/*;q=0.8");

        if !self.config.api_key.is_empty() {
            request = match self.config.credential_in {
                CredentialIn::Header => {
                    request.header(self.config.credential_name.as_str(), &self.config.api_key)
                }
                CredentialIn::Query => request.query(&[(
                    self.config.credential_name.as_str(),
                    self.config.api_key.as_str(),
                )]),
            };
        }

        let mut response = request.send().await.map_err(classify)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                body: truncate(body),
            });
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(FetchError::TooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(FetchError::TooLarge(format!(
                    "body exceeds {} bytes",
                    self.config.max_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched register document"
        );

        Ok(body.freeze())
    }
}

/// Map transport-level reqwest failures onto the fetch taxonomy.
fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else {
        FetchError::Unreachable(err.to_string())
    }
}

fn truncate(body: String) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    body.chars().take(MAX_ERROR_BODY).collect()
}
