//! Configuration loading.
//!
//! `api.base_url` is required; every other section may be omitted and takes
//! the documented defaults. Unknown keys are rejected.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable consulted when no explicit path is given.
pub const CONFIG_ENV_VAR: &str = "SEACE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeaceConfig {
    pub api: ApiSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matcher: MatcherSettings,
    #[serde(default)]
    pub trend: TrendSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSettings {
    /// Apps Script web app URL (`https://script.google.com/macros/s/.../exec`).
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Where the response cache mirrors its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    #[default]
    None,
    Lmdb,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheSettings {
    pub persist: PersistMode,
    /// LMDB environment directory or JSON file, depending on `persist`.
    pub path: Option<PathBuf>,
    pub default_ttl_ms: u64,
    /// LMDB map size.
    pub max_size_mb: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            persist: PersistMode::None,
            path: None,
            default_ttl_ms: 5 * 60 * 1000,
            max_size_mb: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MatcherSettings {
    pub threshold: f64,
    pub same_object_only: bool,
    pub earlier_only: bool,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            threshold: 0.25,
            same_object_only: false,
            earlier_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TrendSettings {
    /// Relative margin around the historical average, as a fraction.
    pub margin: f64,
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self { margin: 0.10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LogSettings {
    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl SeaceConfig {
    /// Resolve the config path (explicit, then `SEACE_CONFIG`), parse and
    /// validate it.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(config_path_from_env)
            .ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(invalid("api.base_url", base_url, "must not be empty"));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(invalid("api.base_url", base_url, "must be an http(s) url"));
        }
        if self.api.request_timeout_ms == 0 {
            return Err(invalid("api.request_timeout_ms", "0", "must be > 0"));
        }
        if self.cache.default_ttl_ms == 0 {
            return Err(invalid("cache.default_ttl_ms", "0", "must be > 0"));
        }
        if self.cache.persist != PersistMode::None {
            match &self.cache.path {
                None => {
                    return Err(invalid(
                        "cache.path",
                        "",
                        "required when cache.persist is lmdb or json",
                    ))
                }
                Some(p) if p.as_os_str().is_empty() => {
                    return Err(invalid("cache.path", "", "must not be empty"))
                }
                Some(_) => {}
            }
        }
        if self.cache.persist == PersistMode::Lmdb && self.cache.max_size_mb == 0 {
            return Err(invalid("cache.max_size_mb", "0", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.matcher.threshold) {
            return Err(invalid(
                "matcher.threshold",
                &self.matcher.threshold.to_string(),
                "must be within [0, 1]",
            ));
        }
        if !(self.trend.margin >= 0.0 && self.trend.margin.is_finite()) {
            return Err(invalid(
                "trend.margin",
                &self.trend.margin.to_string(),
                "must be a finite value >= 0",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}
