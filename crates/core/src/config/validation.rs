//! Configuration validation rules.
//!
//! Checks applied to `AppConfig` after it has been loaded from environment,
//! files, or defaults.

use crate::config::AppConfig;
use crate::url::resolve_asset;
use thiserror::Error;

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
    /// Returns `ConfigError::Missing` if `generation` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - a dynamic prefix does not start with `/`
    /// - a static asset or the offline fallback does not resolve against `origin`
    /// - the resolved offline fallback is not one of the resolved static assets
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "generation".into(),
                hint: "Set SHELTER_GENERATION to a version token such as ff-v3".into(),
            });
        }

        let origin = self.origin_url()?;

        if let Some(prefix) = self.dynamic_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "dynamic_prefixes".into(),
                reason: format!("{prefix:?} must start with '/'"),
            });
        }

        let mut assets = Vec::with_capacity(self.static_assets.len());
        for asset in &self.static_assets {
            let url = resolve_asset(&origin, asset).map_err(|e| ConfigError::Invalid {
                field: "static_assets".into(),
                reason: format!("{asset}: {e}"),
            })?;
            assets.push(url);
        }

        let fallback = resolve_asset(&origin, &self.offline_fallback)
            .map_err(|e| ConfigError::Invalid { field: "offline_fallback".into(), reason: e.to_string() })?;
        if !assets.contains(&fallback) {
            return Err(ConfigError::Invalid {
                field: "offline_fallback".into(),
                reason: format!("{fallback} is not listed in static_assets"),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.dynamic_prefixes.is_empty() {
            tracing::warn!("no dynamic_prefixes configured; every same-origin GET will be served cache-first");
        }

        Ok(())
    }
}
