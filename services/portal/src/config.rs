//! services/portal/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub api_timeout: Duration,
    pub log_level: Level,
    pub token_path: PathBuf,
    pub cache_retention: Duration,
    pub refetch_on_focus: bool,
    pub refetch_on_reconnect: bool,
    pub notification_timeout: Duration,
    pub app_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api/v1".to_string(),
            api_timeout: Duration::from_millis(30_000),
            log_level: Level::INFO,
            token_path: PathBuf::from(".portal/auth_token"),
            cache_retention: Duration::from_secs(60),
            refetch_on_focus: false,
            refetch_on_reconnect: false,
            notification_timeout: Duration::from_millis(5_000),
            app_name: "Learning Platform".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Backend Settings ---
        let api_url = lookup("PORTAL_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "PORTAL_API_URL".to_string(),
                format!("'{}' is not an http(s) URL", api_url),
            ));
        }

        let api_timeout = match lookup("PORTAL_API_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse_u64("PORTAL_API_TIMEOUT_MS", &raw)?),
            None => defaults.api_timeout,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Session Persistence ---
        let token_path = lookup("PORTAL_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.token_path);

        // --- Cache Policy ---
        let cache_retention = match lookup("PORTAL_CACHE_RETENTION_SECS") {
            Some(raw) => Duration::from_secs(parse_u64("PORTAL_CACHE_RETENTION_SECS", &raw)?),
            None => defaults.cache_retention,
        };
        let refetch_on_focus = match lookup("PORTAL_REFETCH_ON_FOCUS") {
            Some(raw) => parse_bool("PORTAL_REFETCH_ON_FOCUS", &raw)?,
            None => defaults.refetch_on_focus,
        };
        let refetch_on_reconnect = match lookup("PORTAL_REFETCH_ON_RECONNECT") {
            Some(raw) => parse_bool("PORTAL_REFETCH_ON_RECONNECT", &raw)?,
            None => defaults.refetch_on_reconnect,
        };

        // --- UI Settings ---
        let notification_timeout = match lookup("PORTAL_NOTIFICATION_TIMEOUT_MS") {
            Some(raw) => {
                Duration::from_millis(parse_u64("PORTAL_NOTIFICATION_TIMEOUT_MS", &raw)?)
            }
            None => defaults.notification_timeout,
        };
        let app_name = lookup("PORTAL_APP_NAME").unwrap_or(defaults.app_name);

        Ok(Self {
            api_url,
            api_timeout,
            log_level,
            token_path,
            cache_retention,
            refetch_on_focus,
            refetch_on_reconnect,
            notification_timeout,
            app_name,
        })
    }
}

fn parse_u64(name: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' is not a boolean", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000/api/v1");
        assert_eq!(config.api_timeout, Duration::from_secs(30));
        assert_eq!(config.cache_retention, Duration::from_secs(60));
        assert!(!config.refetch_on_focus);
        assert!(!config.refetch_on_reconnect);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("PORTAL_API_URL", "https://learn.example.com/api/v1/"),
            ("PORTAL_API_TIMEOUT_MS", "1500"),
            ("PORTAL_REFETCH_ON_FOCUS", "true"),
            ("RUST_LOG", "debug"),
        ])
        .unwrap();
        assert_eq!(config.api_url, "https://learn.example.com/api/v1");
        assert_eq!(config.api_timeout, Duration::from_millis(1500));
        assert!(config.refetch_on_focus);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            config_from(&[("PORTAL_API_TIMEOUT_MS", "soon")]),
            Err(ConfigError::InvalidValue(name, _)) if name == "PORTAL_API_TIMEOUT_MS"
        ));
        assert!(matches!(
            config_from(&[("PORTAL_API_URL", "ftp://nope")]),
            Err(ConfigError::InvalidValue(name, _)) if name == "PORTAL_API_URL"
        ));
    }
}
