//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELTER_*)
//! 2. TOML config file (if SHELTER_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::GenerationId;
use crate::url::{canonicalize, resolve_asset};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELTER_*)
/// 2. TOML config file (if SHELTER_CONFIG_FILE set)
/// 3. Built-in defaults
///
/// List values given through the environment use figment's array syntax,
/// e.g. `SHELTER_DYNAMIC_PREFIXES='["/search", "/api"]'`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Current cache generation. Bump on every deploy.
    ///
    /// Set via SHELTER_GENERATION environment variable.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Origin of the application being fronted.
    ///
    /// Set via SHELTER_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Assets pre-populated into every new generation.
    ///
    /// Paths resolve against `origin`; absolute URLs are kept.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Path prefixes served network-first.
    #[serde(default = "default_dynamic_prefixes")]
    pub dynamic_prefixes: Vec<String>,

    /// Document served when a navigation fails offline.
    ///
    /// Must be one of `static_assets`.
    #[serde(default = "default_offline_fallback")]
    pub offline_fallback: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELTER_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the proxy listens on.
    ///
    /// Set via SHELTER_LISTEN environment variable.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// User-Agent string for requests the proxy originates (asset provisioning).
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_generation() -> String {
    "ff-v2".into()
}

fn default_origin() -> String {
    "http://127.0.0.1:5000".into()
}

fn default_static_assets() -> Vec<String> {
    ["/", "/offline.html", "/manifest.json", "/icons/apple.png", "/icons/banana.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_dynamic_prefixes() -> Vec<String> {
    vec!["/search".into()]
}

fn default_offline_fallback() -> String {
    "/offline.html".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shelter-cache.sqlite")
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}

fn default_user_agent() -> String {
    "shelter/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: default_generation(),
            origin: default_origin(),
            static_assets: default_static_assets(),
            dynamic_prefixes: default_dynamic_prefixes(),
            offline_fallback: default_offline_fallback(),
            db_path: default_db_path(),
            listen: default_listen(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Configuration resolved into the typed values the proxy runs on.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub generation: GenerationId,
    pub origin: Url,
    pub static_assets: Vec<Url>,
    pub dynamic_prefixes: Vec<String>,
    pub offline_fallback: Url,
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELTER_`
    /// 2. TOML file from `SHELTER_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(std::env::var("SHELTER_CONFIG_FILE").ok().map(PathBuf::from))
    }

    /// Same as [`AppConfig::load`] with an explicit TOML file in place of
    /// `SHELTER_CONFIG_FILE`.
    pub fn load_from(file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_path) = file {
            figment = figment.merge(Toml::file(config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELTER_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed application origin.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        canonicalize(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Resolve paths and identifiers into [`ProxySettings`].
    pub fn settings(&self) -> Result<ProxySettings, ConfigError> {
        let origin = self.origin_url()?;

        let static_assets = self
            .static_assets
            .iter()
            .map(|asset| {
                resolve_asset(&origin, asset).map_err(|e| ConfigError::Invalid {
                    field: "static_assets".into(),
                    reason: format!("{asset}: {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let offline_fallback = resolve_asset(&origin, &self.offline_fallback)
            .map_err(|e| ConfigError::Invalid { field: "offline_fallback".into(), reason: e.to_string() })?;

        Ok(ProxySettings {
            generation: GenerationId::new(self.generation.clone()),
            origin,
            static_assets,
            dynamic_prefixes: self.dynamic_prefixes.clone(),
            offline_fallback,
        })
    }
}
