//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OGP_SERVER_*)
//! 2. The plain `PORT` environment variable
//! 3. TOML config file (if OGP_SERVER_CONFIG_FILE set)
//! 4. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OGP_SERVER_*)
/// 2. `PORT` environment variable (maps to `listen`)
/// 3. TOML config file (if OGP_SERVER_CONFIG_FILE set)
/// 4. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Whether resolved images are cached at all.
    ///
    /// Set via OGP_SERVER_CACHE_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Path to the JSON cache file.
    ///
    /// Set via OGP_SERVER_CACHE_FILE environment variable.
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,

    /// Milliseconds between automatic cache commits, 0 disables.
    ///
    /// Set via OGP_SERVER_AUTOCOMMIT_MS environment variable.
    #[serde(default = "default_autocommit_ms")]
    pub autocommit_ms: u64,

    /// TCP port to listen on, 0 to not bind at all.
    ///
    /// Set via OGP_SERVER_LISTEN or PORT environment variables.
    #[serde(default = "default_listen")]
    pub listen: u16,

    /// User-Agent string for page fetches.
    ///
    /// Set via OGP_SERVER_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Page fetch timeout in milliseconds.
    ///
    /// Set via OGP_SERVER_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per page.
    ///
    /// Set via OGP_SERVER_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Allow fetching pages on private or loopback addresses.
    ///
    /// Set via OGP_SERVER_ALLOW_PRIVATE_HOSTS environment variable.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

fn default_true() -> bool {
    true
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("./ogpserver.cache")
}

fn default_autocommit_ms() -> u64 {
    60_000
}

fn default_listen() -> u16 {
    8080
}

fn default_user_agent() -> String {
    "ogp-server/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_bytes() -> usize {
    2_097_152 // 2MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_file: default_cache_file(),
            autocommit_ms: default_autocommit_ms(),
            listen: default_listen(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            allow_private_hosts: false,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Autocommit period, `None` when disabled.
    pub fn autocommit(&self) -> Option<Duration> {
        (self.autocommit_ms > 0).then(|| Duration::from_millis(self.autocommit_ms))
    }

    /// Port to bind, `None` when the server should not listen.
    pub fn listen_port(&self) -> Option<u16> {
        (self.listen > 0).then_some(self.listen)
    }

    /// The cache shape this configuration asks for.
    pub fn cache_config(&self) -> CacheConfig {
        if self.cache_enabled {
            CacheConfig::File { path: self.cache_file.clone(), autocommit: self.autocommit() }
        } else {
            CacheConfig::Disabled
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OGP_SERVER_`
    /// 2. `PORT`
    /// 3. TOML file from `OGP_SERVER_CONFIG_FILE` (if set)
    /// 4. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OGP_SERVER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment
            .merge(Env::raw().only(&["PORT"]).map(|_| "listen".into()))
            .merge(
                Env::prefixed("OGP_SERVER_")
                    .map(|key| key.as_str().to_lowercase().into())
                    .split("__"),
            );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
