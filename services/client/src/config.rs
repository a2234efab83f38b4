//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:1337/api";
pub const DEFAULT_TOKEN_STORE: &str = "./.todo/tokens.json";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: Url,
    pub token_store_path: PathBuf,
    pub http_timeout: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to keep tests hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Backend ---
        let base_url_str =
            lookup("TODO_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = parse_base_url(&base_url_str)?;

        let timeout_str = lookup("TODO_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|| DEFAULT_HTTP_TIMEOUT_SECS.to_string());
        let http_timeout = match timeout_str.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                return Err(ConfigError::InvalidValue(
                    "TODO_HTTP_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a positive number of seconds", timeout_str),
                ))
            }
        };

        // --- Local State ---
        let token_store_path = lookup("TODO_TOKEN_STORE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_STORE));

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_base_url,
            token_store_path,
            http_timeout,
            log_level,
        })
    }

    /// A configuration pointing at `base_url`, with defaults for everything else.
    pub fn for_base_url(base_url: &str, token_store_path: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: parse_base_url(base_url)?,
            token_store_path,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            log_level: Level::INFO,
        })
    }
}

/// Parses the base URL and guarantees a trailing slash so relative paths join
/// underneath it instead of replacing its last segment.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| ConfigError::InvalidValue("TODO_API_BASE_URL".to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidValue(
            "TODO_API_BASE_URL".to_string(),
            format!("'{raw}' cannot be used as a base URL"),
        ));
    }
    Ok(url)
}
