//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (REGCACHE_*)
//! 2. TOML config file (if REGCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Where the access credential travels on the upstream request.
///
/// The upstream documents the transport position; it is configured, never
/// inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialIn {
    Header,
    Query,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REGCACHE_*)
/// 2. TOML config file (if REGCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// URL of the upstream register document.
    ///
    /// Set via REGCACHE_UPSTREAM_URL. Required before the first fetch.
    #[serde(default)]
    pub upstream_url: String,

    /// Access credential for the upstream. Attached only when non-empty.
    ///
    /// Set via REGCACHE_API_KEY.
    #[serde(default)]
    pub api_key: String,

    /// Transport position of the credential: "header" or "query".
    #[serde(default = "default_credential_in")]
    pub credential_in: CredentialIn,

    /// Header name or query parameter name carrying the credential.
    #[serde(default = "default_credential_name")]
    pub credential_name: String,

    /// Fetch timeout in milliseconds. The upstream may hang or throttle;
    /// a full download legitimately takes minutes.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response size in bytes. Upstream documents reach hundreds of
    /// megabytes; anything past this cap aborts the fetch.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Minimum snapshot age before a non-forced refresh proceeds.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,

    /// Path of the on-disk snapshot mirror.
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,

    /// Listen address for the HTTP server.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Local hour (0-23) at which the daily scheduled refresh fires.
    #[serde(default = "default_refresh_hour")]
    pub refresh_hour: u32,

    /// User-Agent string for upstream requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Credential required by POST /admin/refresh. Unset disables the check.
    #[serde(default)]
    pub admin_key: Option<String>,
}

fn default_credential_in() -> CredentialIn {
    CredentialIn::Header
}

fn default_credential_name() -> String {
    "X-Api-Key".into()
}

fn default_timeout_ms() -> u64 {
    300_000
}

fn default_max_bytes() -> usize {
    512 * 1024 * 1024
}

fn default_ttl_hours() -> i64 {
    24
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("./data/register-cache.json")
}

fn default_bind() -> String {
    "0.0.0.0:8080".into()
}

fn default_refresh_hour() -> u32 {
    3
}

fn default_user_agent() -> String {
    "regcache/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upstream_url: String::new(),
            api_key: String::new(),
            credential_in: default_credential_in(),
            credential_name: default_credential_name(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            ttl_hours: default_ttl_hours(),
            cache_file: default_cache_file(),
            bind: default_bind(),
            refresh_hour: default_refresh_hour(),
            user_agent: default_user_agent(),
            admin_key: None,
        }
    }
}

impl AppConfig {
    /// Fetch timeout as a Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache TTL as a chrono Duration, comparable with snapshot age.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ttl_hours)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("REGCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("REGCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check that the upstream URL is configured (for fail-fast startup).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no upstream URL is set.
    pub fn require_upstream_url(&self) -> Result<&str, ConfigError> {
        if self.upstream_url.is_empty() {
            return Err(ConfigError::Missing {
                field: "upstream_url".into(),
                hint: "Set REGCACHE_UPSTREAM_URL environment variable".into(),
            });
        }
        Ok(&self.upstream_url)
    }
}
