//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
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
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Opaque bearer token for the upstream messaging API. Never parsed.
    pub intercom_access_token: String,
    pub intercom_base_url: String,
    /// Optional anonymous key required on this service's own endpoint.
    /// Opaque; compared byte-for-byte, never parsed.
    pub api_key: Option<String>,
    pub search_page_cap: u32,
    pub fetch_batch_size: usize,
    pub batch_pause: Duration,
    pub budget: Duration,
    pub budget_margin: Duration,
    pub fetch_timeout_cap: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Upstream Credentials ---
        let intercom_access_token = std::env::var("INTERCOM_ACCESS_TOKEN")
            .map_err(|_| ConfigError::MissingVar("INTERCOM_ACCESS_TOKEN".to_string()))?;
        let intercom_base_url = std::env::var("INTERCOM_BASE_URL")
            .unwrap_or_else(|_| "https://api.intercom.io".to_string());
        let api_key = std::env::var("API_KEY").ok().filter(|k| !k.is_empty());

        // --- Load Pipeline Tunables ---
        let search_page_cap = parse_var("SEARCH_PAGE_CAP", 150u32)?;
        let fetch_batch_size = parse_var("FETCH_BATCH_SIZE", 10usize)?;
        let batch_pause = Duration::from_millis(parse_var("BATCH_PAUSE_MS", 100u64)?);
        let budget = Duration::from_secs(parse_var("BUDGET_SECS", 60u64)?);
        let budget_margin = Duration::from_secs(parse_var("BUDGET_MARGIN_SECS", 5u64)?);
        let fetch_timeout_cap = Duration::from_secs(parse_var("FETCH_TIMEOUT_SECS", 15u64)?);

        Ok(Self {
            bind_address,
            log_level,
            intercom_access_token,
            intercom_base_url,
            api_key,
            search_page_cap,
            fetch_batch_size,
            batch_pause,
            budget,
            budget_margin,
            fetch_timeout_cap,
        })
    }
}

/// Parses an optional numeric environment variable, falling back to a default.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}' is not a valid number", raw))
        }),
    }
}
