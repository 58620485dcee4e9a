//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `version` or `cache_prefix` is empty or contains whitespace
    /// - a `manifest` entry or `navigation_fallback` does not start with `/`
    /// - an `on_demand_extensions` entry does not start with `.`
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `precache_concurrency` is 0 or exceeds 32
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        for (field, value) in [("version", &self.version), ("cache_prefix", &self.cache_prefix)] {
            if value.is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(invalid(field, "must not contain whitespace"));
            }
        }

        if let Some(path) = self.manifest.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("manifest", format!("path {path:?} must start with '/'")));
        }
        if self.manifest.is_empty() {
            tracing::warn!("manifest is empty; the shell cache set will start empty");
        }

        if !self.navigation_fallback.starts_with('/') {
            return Err(invalid("navigation_fallback", "must start with '/'"));
        }

        if let Some(ext) = self
            .on_demand_extensions
            .iter()
            .find(|e| !e.starts_with('.') || e.len() < 2)
        {
            return Err(invalid("on_demand_extensions", format!("{ext:?} must look like \".pdf\"")));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 100MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.precache_concurrency == 0 || self.precache_concurrency > 32 {
            return Err(invalid("precache_concurrency", "must be between 1 and 32"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        Ok(())
    }
}
