//! Config file loading. A TOML file takes precedence when given;
//! otherwise the `CAREWALK_*` environment variables are used.

use std::path::Path;
use std::time::Duration;

use carewalk_engine::{ApiConfig, ConfigError};
use serde::Deserialize;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error(transparent)]
    Env(#[from] ConfigError),
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    api: ApiSection,
}

#[derive(Debug, Deserialize)]
struct ApiSection {
    base_url: String,
    tenant: String,
    username: String,
    password: String,
    timeout_secs: Option<u64>,
}

pub fn load(path: Option<&Path>) -> Result<ApiConfig, SettingsError> {
    let Some(path) = path else {
        return Ok(ApiConfig::from_env()?);
    };

    let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let parsed: FileConfig = toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    Ok(ApiConfig {
        base_url: parsed.api.base_url,
        tenant: parsed.api.tenant,
        username: parsed.api.username,
        password: parsed.api.password,
        timeout: Duration::from_secs(parsed.api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
