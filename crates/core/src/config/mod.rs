//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::CacheNames;

mod validation;

pub use validation::ConfigError;

/// Caching policy applied to versioned assets (CSS, JS, images).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetStrategy {
    /// Serve from cache when present; only go to the network on a miss.
    #[default]
    CacheFirst,
    /// Always try the network; fall back to the cache when it fails.
    NetworkFirst,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin of the application whose requests are intercepted.
    ///
    /// Set via SHELLCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Deployment version tag namespacing every cache set.
    ///
    /// Changing it invalidates everything cached by previous deployments.
    /// Set via SHELLCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix shared by all cache-set names.
    ///
    /// Set via SHELLCACHE_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Paths pre-populated into the shell cache set at install.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Path suffixes of resources cached lazily on first successful fetch.
    #[serde(default = "default_on_demand_extensions")]
    pub on_demand_extensions: Vec<String>,

    /// Cached document served to navigations when the network is unavailable.
    #[serde(default = "default_navigation_fallback")]
    pub navigation_fallback: String,

    /// Caching policy for versioned assets.
    ///
    /// Set via SHELLCACHE_ASSET_STRATEGY (`cache_first` or `network_first`).
    #[serde(default)]
    pub asset_strategy: AssetStrategy,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SHELLCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SHELLCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum concurrent fetches while pre-populating the shell.
    #[serde(default = "default_precache_concurrency")]
    pub precache_concurrency: usize,
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_cache_prefix() -> String {
    "shellcache".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/css/style.css",
        "/js/app.js",
        "/manifest.json",
        "/images/icons/icon-192.png",
        "/images/icons/icon-512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_on_demand_extensions() -> Vec<String> {
    vec![".pdf".into()]
}

fn default_navigation_fallback() -> String {
    "/index.html".into()
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    20 * 1024 * 1024 // 20MB, documents can be large
}

fn default_precache_concurrency() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            db_path: default_db_path(),
            manifest: default_manifest(),
            on_demand_extensions: default_on_demand_extensions(),
            navigation_fallback: default_navigation_fallback(),
            asset_strategy: AssetStrategy::default(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            precache_concurrency: default_precache_concurrency(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {other}") }),
        }
    }

    /// Cache-set names belonging to the configured deployment version.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::for_version(&self.cache_prefix, &self.version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    /// Extract and validate configuration from a prepared figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
