//! Startup configuration.
//!
//! Loaded once, either from the process environment or from a JSON file.
//! A missing or blank remote section keeps the coordinator in LOCAL mode.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const ENV_REMOTE_URL: &str = "FLEET_REMOTE_URL";
pub const ENV_REMOTE_KEY: &str = "FLEET_REMOTE_KEY";
pub const ENV_CACHE_PATH: &str = "FLEET_CACHE_PATH";
pub const ENV_REFRESH_INTERVAL: &str = "FLEET_REFRESH_INTERVAL_SECS";
pub const ENV_HISTORY_SCAN_LIMIT: &str = "FLEET_HISTORY_SCAN_LIMIT";

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_HISTORY_SCAN_LIMIT: usize = 200;

/// Connection parameters for the remote tabular store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Both parameters are present and non-blank.
    pub fn is_usable(&self) -> bool {
        !self.url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub remote: Option<RemoteConfig>,
    /// SQLite file holding the local cache. `None` keeps the cache in memory.
    pub cache_path: Option<PathBuf>,
    pub refresh_interval_secs: u64,
    /// Upper bound on rows scanned when resolving an audit row key.
    pub history_scan_limit: usize,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            remote: None,
            cache_path: None,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            history_scan_limit: DEFAULT_HISTORY_SCAN_LIMIT,
        }
    }
}

impl FleetConfig {
    /// Read configuration from `FLEET_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = FleetConfig::default();

        let url = lookup(ENV_REMOTE_URL).unwrap_or_default();
        let key = lookup(ENV_REMOTE_KEY).unwrap_or_default();
        if !url.is_empty() || !key.is_empty() {
            config.remote = Some(RemoteConfig::new(url, key));
        }

        if let Some(path) = lookup(ENV_CACHE_PATH).filter(|p| !p.is_empty()) {
            config.cache_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_REFRESH_INTERVAL) {
            config.refresh_interval_secs = parse_number(ENV_REFRESH_INTERVAL, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HISTORY_SCAN_LIMIT) {
            config.history_scan_limit = parse_number(ENV_HISTORY_SCAN_LIMIT, &raw)?;
        }
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// The remote section, only if it can actually be used.
    pub fn usable_remote(&self) -> Option<&RemoteConfig> {
        self.remote.as_ref().filter(|r| r.is_usable())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: raw.to_string(),
    })
}
