//! Configuration management for ragchat
//!
//! Supports configuration via:
//! 1. Config file (~/.config/ragchat/config.toml)
//! 2. Environment variables (RAGCHAT_SERVER_URL, RAGCHAT_API_PREFIX, etc.)
//! 3. CLI arguments (override file/env settings)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend server settings
    pub server: ServerSettings,

    /// Streaming chat settings
    pub stream: StreamSettings,

    /// Export settings
    pub export: ExportSettings,

    /// Persisted session settings
    pub session: SessionSettings,
}

/// Backend server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server origin, e.g. http://localhost:8000
    pub url: String,

    /// Prefix mounted in front of every REST route
    pub api_prefix: String,

    /// Timeout for regular (non-streaming) requests
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            api_prefix: "/api".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ServerSettings {
    /// Base URL for REST calls (`<url><api_prefix>`)
    pub fn api_base(&self) -> String {
        join_url(&self.url, &self.api_prefix)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Streaming chat settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Path of the streaming endpoint, relative to the API base
    pub endpoint: String,

    /// Abort a stream when no bytes arrive for this long
    pub idle_timeout_secs: u64,

    /// Buffered updates between the read loop and the caller
    pub channel_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            endpoint: "/streaming/chat".to_string(),
            idle_timeout_secs: 60,
            channel_capacity: 64,
        }
    }
}

impl StreamSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Directory exported documents are written to
    pub output_dir: PathBuf,

    /// Format used when none is given (markdown, html, pdf)
    pub default_format: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            default_format: "markdown".to_string(),
        }
    }
}

/// Persisted session settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Where the credential store lives (default: platform data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl SessionSettings {
    pub fn store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ragchat")
                .join("session.json")
        })
    }
}

impl Config {
    /// Get default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ragchat")
            .join("config.toml")
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path())
    }

    /// Load config from specific path
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default().with_env_overrides());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config.with_env_overrides())
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("RAGCHAT_SERVER_URL") {
            self.server.url = url;
        }
        if let Ok(prefix) = std::env::var("RAGCHAT_API_PREFIX") {
            self.server.api_prefix = prefix;
        }
        if let Ok(dir) = std::env::var("RAGCHAT_EXPORT_DIR") {
            self.export.output_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("RAGCHAT_SESSION_FILE") {
            self.session.store_path = Some(PathBuf::from(path));
        }

        self
    }

    /// Save config to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path())
    }

    /// Save config to specific path
    pub fn save_to(&self, path: PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.server.url.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingRequired(
                "server.url (or RAGCHAT_SERVER_URL)".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::MissingRequired(format!(
                "server.url must start with http:// or https://, got '{}'",
                url
            )));
        }
        if self.stream.idle_timeout_secs == 0 {
            return Err(ConfigError::MissingRequired(
                "stream.idle_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.stream.channel_capacity == 0 {
            return Err(ConfigError::MissingRequired(
                "stream.channel_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Full URL of the streaming chat endpoint
    pub fn stream_url(&self) -> String {
        join_url(&self.server.api_base(), &self.stream.endpoint)
    }

    /// Generate example config content
    pub fn example() -> String {
        let example = Config::default();
        toml::to_string_pretty(&example).unwrap_or_default()
    }
}

/// Join a base URL and a path without doubling or dropping the slash
pub fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.trim_end_matches('/').to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Builder for creating Config programmatically
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server.url = url.into();
        self
    }

    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.server.api_prefix = prefix.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.server.request_timeout_secs = secs;
        self
    }

    pub fn idle_timeout_secs(mut self, secs: u64) -> Self {
        self.config.stream.idle_timeout_secs = secs;
        self
    }

    pub fn export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.export.output_dir = dir.into();
        self
    }

    pub fn session_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.session.store_path = Some(path.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.url, "http://localhost:8000");
        assert_eq!(config.server.api_base(), "http://localhost:8000/api");
        assert_eq!(config.stream_url(), "http://localhost:8000/api/streaming/chat");
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .server_url("https://rag.example.com/")
            .api_prefix("/v2/api")
            .idle_timeout_secs(5)
            .build();

        assert_eq!(config.server.api_base(), "https://rag.example.com/v2/api");
        assert_eq!(config.stream.idle_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://a/", "/b"), "http://a/b");
        assert_eq!(join_url("http://a", "b"), "http://a/b");
        assert_eq!(join_url("http://a/", ""), "http://a");
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = ConfigBuilder::new().server_url("localhost:8000").build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_idle_timeout() {
        let config = ConfigBuilder::new().idle_timeout_secs(0).build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(msg)) if msg.contains("idle_timeout_secs")
        ));
        assert!(ConfigBuilder::new().idle_timeout_secs(1).build().validate().is_ok());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = ConfigBuilder::new()
            .server_url("https://rag.internal")
            .request_timeout_secs(12)
            .build();
        config.save_to(path.clone()).unwrap();

        let loaded = Config::load_from(path).unwrap();
        assert_eq!(loaded.server.request_timeout_secs, 12);
    }

    #[test]
    fn test_example_config() {
        let example = Config::example();
        assert!(example.contains("[server]"));
        assert!(example.contains("[stream]"));
    }
}
