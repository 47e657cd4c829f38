//! Runtime configuration for a probe run.
//!
//! Credentials and the target environment come from the process
//! environment (`CAREWALK_*` variables) or a config file loaded by the
//! CLI; nothing here is compiled in.

use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors reading configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable '{name}'")]
    MissingVar { name: &'static str },

    #[error("invalid value for '{name}': {message}")]
    InvalidValue { name: &'static str, message: String },
}

/// Connection settings for the remote scheduling API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub tenant: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Read configuration from `CAREWALK_BASE_URL`, `CAREWALK_TENANT`,
    /// `CAREWALK_USERNAME`, `CAREWALK_PASSWORD` and the optional
    /// `CAREWALK_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout = match std::env::var("CAREWALK_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    name: "CAREWALK_TIMEOUT_SECS",
                    message: format!("'{}' is not a whole number of seconds", raw),
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(ApiConfig {
            base_url: required("CAREWALK_BASE_URL")?,
            tenant: required("CAREWALK_TENANT")?,
            username: required("CAREWALK_USERNAME")?,
            password: required("CAREWALK_PASSWORD")?,
            timeout,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar { name }),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
