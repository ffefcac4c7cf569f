//! Client configuration from the environment

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8000/ws";
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("QUIZ_SERVER_URL must be a ws:// or wss:// URL, got {0:?}")]
    InvalidServerUrl(String),
    #[error("QUIZ_RESPONSE_TIMEOUT_SECS must be a whole number of seconds, got {0:?}")]
    InvalidTimeout(String),
    #[error("QUIZ_LOG_FORMAT must be \"text\" or \"json\", got {0:?}")]
    InvalidLogFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
    /// `None` waits for service replies indefinitely
    pub response_timeout: Option<Duration>,
    pub log_format: LogFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            response_timeout: Some(Duration::from_secs(DEFAULT_RESPONSE_TIMEOUT_SECS)),
            log_format: LogFormat::Text,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("QUIZ_SERVER_URL") {
            let url = url.trim();
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(ConfigError::InvalidServerUrl(url.to_string()));
            }
            config.server_url = url.to_string();
        }

        if let Some(raw) = lookup("QUIZ_RESPONSE_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
            config.response_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(raw) = lookup("QUIZ_LOG_FORMAT") {
            config.log_format = match raw.trim().to_ascii_lowercase().as_str() {
                "text" | "" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => return Err(ConfigError::InvalidLogFormat(raw)),
            };
        }

        Ok(config)
    }
}
