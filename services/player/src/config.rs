use avatar_teacher_core::{PlayerSettings, topic::DEFAULT_AVATAR_VIDEO};
use reqwest::Url;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub default_video_url: String,
    pub settle_delay: Duration,
    pub toast_timeout: Duration,
    pub toast_fade: Duration,
    /// How long the simulated narration plays before it ends.
    pub track_duration: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_base_url =
            std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        validate_base_url("API_BASE_URL", &api_base_url)?;

        let default_video_url = std::env::var("DEFAULT_VIDEO_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AVATAR_VIDEO.to_string());

        let settle_delay = Duration::from_millis(parse_var("SETTLE_DELAY_MS", 100)?);
        let toast_timeout = Duration::from_millis(parse_var("TOAST_TIMEOUT_MS", 3000)?);
        let toast_fade = Duration::from_millis(parse_var("TOAST_FADE_MS", 300)?);
        let track_duration = Duration::from_secs(parse_var("SIMULATED_TRACK_SECS", 5)?);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_base_url,
            default_video_url,
            settle_delay,
            toast_timeout,
            toast_fade,
            track_duration,
            log_level,
        })
    }

    /// The core player tunables derived from this configuration.
    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            default_video_url: self.default_video_url.clone(),
            settle_delay: self.settle_delay,
            toast_timeout: self.toast_timeout,
            toast_fade: self.toast_fade,
        }
    }
}

/// Checks that `value` can serve as the root of the topic API.
pub fn validate_base_url(var: &str, value: &str) -> Result<(), ConfigError> {
    let url =
        Url::parse(value).map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue(
            var.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(())
}

fn parse_var(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
