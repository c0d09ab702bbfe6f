//! Session layer configuration.
//!
//! This module handles loading the endpoint paths, credential lifetimes and
//! refresh policy used by the API client and credential store.
//!
//! Configuration is stored at `~/.config/foodcam-session/config.json`. A
//! missing file yields the defaults, which match the FoodCam backend.

use std::path::{Path, PathBuf};

use chrono::Duration;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::TtlClass;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "foodcam-session";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Longest credential lifetime a config may ask for (ten years)
pub const MAX_TTL_DAYS: i64 = 3650;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find {0} directory")]
    NoDirectory(&'static str),

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Credential lifetime for {0} sessions must be between 1 and 3650 days")]
    InvalidTtl(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Origin every relative request path is resolved against
    pub base_url: String,
    pub login_path: String,
    pub refresh_path: String,
    pub blacklist_path: String,
    /// Differs between backend versions, so it is never hardcoded
    pub current_user_path: String,
    /// Treat 403 like 401 and attempt a refresh
    pub refresh_on_forbidden: bool,
    pub short_ttl_days: i64,
    pub extended_ttl_days: i64,
    pub request_timeout_secs: u64,
    /// Route handed to the navigator when the session cannot be recovered
    pub login_route: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            login_path: "/api/token/".to_string(),
            refresh_path: "/api/token/refresh/".to_string(),
            blacklist_path: "/api/token/blacklist/".to_string(),
            current_user_path: "/accounts/api/user/".to_string(),
            refresh_on_forbidden: true,
            short_ttl_days: 1,
            extended_ttl_days: 30,
            request_timeout_secs: 30,
            login_route: "login".to_string(),
        }
    }
}

impl SessionConfig {
    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        let io_err = |source| ConfigError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(io_err)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        if !(1..=MAX_TTL_DAYS).contains(&self.short_ttl_days) {
            return Err(ConfigError::InvalidTtl("short"));
        }
        if !(1..=MAX_TTL_DAYS).contains(&self.extended_ttl_days) {
            return Err(ConfigError::InvalidTtl("extended"));
        }
        Ok(())
    }

    /// Lifetime for `class`; out-of-range day counts are clamped
    pub fn ttl(&self, class: TtlClass) -> Duration {
        let days = match class {
            TtlClass::Short => self.short_ttl_days,
            TtlClass::Extended => self.extended_ttl_days,
        };
        Duration::days(days.clamp(0, MAX_TTL_DAYS))
    }

    /// Whether a response status should start the refresh protocol
    pub fn is_refresh_trigger(&self, status: StatusCode) -> bool {
        status == StatusCode::UNAUTHORIZED
            || (self.refresh_on_forbidden && status == StatusCode::FORBIDDEN)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoDirectory("config"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory the file credential backend writes into
    pub fn cache_dir() -> Result<PathBuf, ConfigError> {
        let cache_dir = dirs::cache_dir().ok_or(ConfigError::NoDirectory("cache"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_backend_routes() {
        let config = SessionConfig::default();
        assert_eq!(config.refresh_path, "/api/token/refresh/");
        assert_eq!(config.blacklist_path, "/api/token/blacklist/");
        assert_eq!(config.current_user_path, "/accounts/api/user/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ttl_classes() {
        let config = SessionConfig::default();
        assert_eq!(config.ttl(TtlClass::Short), Duration::days(1));
        assert_eq!(config.ttl(TtlClass::Extended), Duration::days(30));
    }

    #[test]
    fn test_refresh_trigger_respects_forbidden_flag() {
        let mut config = SessionConfig::default();
        assert!(config.is_refresh_trigger(StatusCode::UNAUTHORIZED));
        assert!(config.is_refresh_trigger(StatusCode::FORBIDDEN));
        assert!(!config.is_refresh_trigger(StatusCode::NOT_FOUND));

        config.refresh_on_forbidden = false;
        assert!(config.is_refresh_trigger(StatusCode::UNAUTHORIZED));
        assert!(!config.is_refresh_trigger(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"base_url": "https://foodcam.example", "refresh_on_forbidden": false}"#)
            .unwrap();

        let config = SessionConfig::load_from(&path).unwrap();
        assert_eq!(config.base_url, "https://foodcam.example");
        assert!(!config.refresh_on_forbidden);
        assert_eq!(config.login_route, "login");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SessionConfig {
            base_url: "not a url".to_string(),
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBaseUrl { .. })));

        let config = SessionConfig {
            base_url: "ftp://foodcam.example".to_string(),
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBaseUrl { .. })));

        let config = SessionConfig {
            extended_ttl_days: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTtl("extended"))));
    }

    #[test]
    fn test_oversized_ttl_is_rejected_and_clamped() {
        let config = SessionConfig {
            extended_ttl_days: 1_000_000_000,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTtl("extended"))));
        assert_eq!(config.ttl(TtlClass::Extended), Duration::days(MAX_TTL_DAYS));

        let config = SessionConfig {
            short_ttl_days: i64::MAX,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTtl("short"))));
        assert_eq!(config.ttl(TtlClass::Short), Duration::days(MAX_TTL_DAYS));
    }
}
