//! Service settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `storefront.toml`, then `STOREFRONT__*` environment variables, e.g.
//! `STOREFRONT__SERVER__PORT=9090` or `STOREFRONT__STORE__BACKEND=memory`.
//! Connection details for the record store and Redis stay in their own
//! `from_env()` configs in the `common` crate.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Default session lifetime: 7 days
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 604_800;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub session: SessionSettings,
    pub store: StoreSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Remote REST record store
    Http,
    /// In-process store, optionally seeded from a JSON file
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    #[serde(default)]
    pub seed_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub backend: CacheBackend,
}

impl AppConfig {
    /// Load settings from `storefront.toml` (if present) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("storefront")
    }

    /// Load settings with `file` (extension optional) as the file layer
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080_i64)?
            .set_default("session.ttl_seconds", DEFAULT_SESSION_TTL_SECONDS as i64)?
            .set_default("store.backend", "http")?
            .set_default("cache.backend", "redis")?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("STOREFRONT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
