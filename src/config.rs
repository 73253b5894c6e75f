//! Configuration module for loading and parsing TOML configuration files.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable consulted for the vendor API key when the
/// configuration file does not provide one.
pub const API_KEY_ENV: &str = "FINNHUB_API_KEY";

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream feed configuration.
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Upstream market-data feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Vendor WebSocket URL. The auth token is appended as a query
    /// parameter at connect time.
    pub url: String,
    /// Vendor API key. When absent the feed runs in permanently
    /// disabled mode and the rest of the server still starts.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base reconnect backoff delay in seconds. Doubles per attempt.
    pub reconnect_base_delay_secs: u64,
    /// Maximum automatic reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Cooldown after the vendor rate-limits a connect, in seconds.
    pub rate_limit_cooldown_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "wss://ws.finnhub.io".to_string(),
            api_key: None,
            reconnect_base_delay_secs: 5,
            max_reconnect_attempts: 5,
            rate_limit_cooldown_secs: 300,
        }
    }
}

impl FeedConfig {
    /// Base reconnect delay as a [`Duration`].
    #[must_use]
    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_base_delay_secs)
    }

    /// Rate-limit cooldown as a [`Duration`].
    #[must_use]
    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Arguments
    /// * `content` - TOML content as string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides: `HOST`, `PORT` and the vendor
    /// API key from [`API_KEY_ENV`].
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
        if self.feed.api_key.is_none()
            && let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.is_empty()
        {
            self.feed.api_key = Some(key);
        }
        self
    }

    /// Validates the configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.url.is_empty() {
            return Err(ConfigError::InvalidValue(
                "feed url cannot be empty".to_string(),
            ));
        }
        if !self.feed.url.starts_with("ws://") && !self.feed.url.starts_with("wss://") {
            return Err(ConfigError::InvalidValue(format!(
                "feed url must be a ws:// or wss:// URL: {}",
                self.feed.url
            )));
        }
        if self.feed.reconnect_base_delay_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "feed reconnect_base_delay_secs must be positive".to_string(),
            ));
        }
        if self.feed.max_reconnect_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "feed max_reconnect_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[server]
host = "127.0.0.1"
port = 3000

[feed]
url = "wss://ws.example.com"
api_key = "test-key"
reconnect_base_delay_secs = 2
max_reconnect_attempts = 3
rate_limit_cooldown_secs = 60
"#;

        let config = Config::parse(toml_content).expect("should parse");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.feed.url, "wss://ws.example.com");
        assert_eq!(config.feed.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.feed.reconnect_base_delay(), Duration::from_secs(2));
        assert_eq!(config.feed.max_reconnect_attempts, 3);
        assert_eq!(config.feed.rate_limit_cooldown(), Duration::from_secs(60));
    }

    #[test]
    fn test_defaults_without_key() {
        let config = Config::parse("").expect("empty config should parse");
        assert_eq!(config.server.port, 8080);
        assert!(config.feed.api_key.is_none());
        assert_eq!(config.feed.reconnect_base_delay_secs, 5);
        assert_eq!(config.feed.max_reconnect_attempts, 5);
        assert_eq!(config.feed.rate_limit_cooldown_secs, 300);
    }

    #[test]
    fn test_validation_rejects_non_ws_url() {
        let toml_content = r#"
[feed]
url = "https://ws.example.com"
reconnect_base_delay_secs = 5
max_reconnect_attempts = 5
rate_limit_cooldown_secs = 300
"#;
        assert!(Config::parse(toml_content).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_backoff() {
        let toml_content = r#"
[feed]
url = "wss://ws.example.com"
reconnect_base_delay_secs = 0
max_reconnect_attempts = 5
rate_limit_cooldown_secs = 300
"#;
        assert!(Config::parse(toml_content).is_err());
    }
}
