use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;
pub mod store;

pub use store::ConfigStore;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Free-form per-service settings, flattened into a [`ConfigStore`]
    #[serde(default)]
    pub services: toml::Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deadline for a single badge request, covering dispatch and rendering
    #[serde(default = "default_request_timeout", with = "duration_serde::duration")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Backend selection, e.g. `mem://`
    #[serde(default = "default_cache_uri")]
    pub uri: String,
    /// How often expired entries are swept from the cache
    #[serde(default = "default_sweep_interval", with = "duration_serde::duration")]
    pub sweep_interval: Duration,
    /// Lifetime of cached badge fingerprints and rendered SVGs
    #[serde(default = "default_badge_ttl", with = "duration_serde::duration")]
    pub badge_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_connect_timeout", with = "duration_serde::duration")]
    pub connect_timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}
fn default_cache_uri() -> String {
    DEFAULT_CACHE_URI.to_string()
}
fn default_sweep_interval() -> Duration {
    DEFAULT_CACHE_SWEEP_INTERVAL
}
fn default_badge_ttl() -> Duration {
    DEFAULT_BADGE_TTL
}
fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            uri: default_cache_uri(),
            sweep_interval: default_sweep_interval(),
            badge_ttl: default_badge_ttl(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A missing file is not an error: every setting has a default and the
    /// service handlers that need credentials simply stay disabled.
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> AppResult<Self> {
        let path = config_file.as_ref();
        if !path.exists() {
            info!(
                "Config file {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents).map_err(|e| {
            AppError::configuration(format!("Unable to parse {}: {}", path.display(), e))
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Settings exposed to service handlers
    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::from_table(&self.services)
    }
}
