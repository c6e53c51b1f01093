//! Configuration module - environment variable parsing

use std::env;

use uuid::Uuid;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Backing store base URL
    pub store_url: String,
    /// Backing store API key
    pub store_api_key: String,
    /// Match to play back
    pub match_id: Uuid,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Initial playback speed multiplier
    pub playback_speed: f64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store_url: env::var("STORE_URL").map_err(|_| ConfigError::Missing("STORE_URL"))?,

            store_api_key: env::var("STORE_API_KEY")
                .map_err(|_| ConfigError::Missing("STORE_API_KEY"))?,

            match_id: env::var("MATCH_ID")
                .map_err(|_| ConfigError::Missing("MATCH_ID"))?
                .parse()
                .map_err(|_| ConfigError::InvalidMatchId)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            playback_speed: match env::var("PLAYBACK_SPEED") {
                Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidSpeed)?,
                Err(_) => 1.0,
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("MATCH_ID is not a valid UUID")]
    InvalidMatchId,

    #[error("PLAYBACK_SPEED is not a valid number")]
    InvalidSpeed,
}
