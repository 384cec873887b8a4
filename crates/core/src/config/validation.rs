//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use thiserror::Error;

use crate::config::AppConfig;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0
    /// - `timeout_ms` is under 1s or above 1 hour
    /// - `ttl_hours` is not positive
    /// - `refresh_hour` is not a valid hour of day
    /// - `user_agent` or `credential_name` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }

        if self.timeout_ms < 1_000 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 1000ms".into() });
        }
        if self.timeout_ms > 3_600_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 1 hour (3600000ms)".into(),
            });
        }

        if self.ttl_hours < 1 {
            return Err(ConfigError::Invalid { field: "ttl_hours".into(), reason: "must be at least 1".into() });
        }

        if self.refresh_hour > 23 {
            return Err(ConfigError::Invalid { field: "refresh_hour".into(), reason: "must be 0-23".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.credential_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "credential_name".into(),
                reason: "must not be empty".into(),
            });
        }

        Ok(())
    }
}
