//! Configuration for the ESC Radio client
//!
//! The REST endpoint and the push broker coordinates are deployment
//! configuration, never computed state. Defaults mirror the reference
//! deployment (API and broker on localhost); real deployments load a YAML
//! file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default base URL of the stream directory API
pub const DEFAULT_API_BASE_URL: &str = "http://localhost";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("escradio/", env!("CARGO_PKG_VERSION"));

/// Default push broker port (laravel-websockets convention)
pub const DEFAULT_BROKER_PORT: u16 = 6001;

/// Stream directory API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend (e.g., "https://radio.example.org")
    pub base_url: String,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Push broker connection coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker hostname
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Application key identifying this app to the broker
    pub app_key: String,
    /// Cluster tag (kept for protocol compatibility, unused by self-hosted
    /// brokers)
    pub cluster: String,
    /// Connect over wss instead of ws
    pub use_tls: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_BROKER_PORT,
            app_key: "local".to_string(),
            cluster: "mt1".to_string(),
            use_tls: false,
        }
    }
}

impl BrokerConfig {
    /// Build the WebSocket URL for the Pusher wire protocol (v7)
    pub fn websocket_url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!(
            "{}://{}:{}/app/{}?protocol=7&client=escradio&version={}",
            scheme,
            self.host,
            self.port,
            self.app_key,
            env!("CARGO_PKG_VERSION"),
        )
    }
}

/// Complete session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Stream directory API settings
    pub api: ApiConfig,
    /// Push broker coordinates
    pub broker: BrokerConfig,
}

impl SessionConfig {
    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::config(e.to_string()))
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.broker.port, DEFAULT_BROKER_PORT);
        assert!(!config.broker.use_tls);
    }

    #[test]
    fn test_websocket_url() {
        let broker = BrokerConfig {
            host: "radio.example.org".to_string(),
            port: 6001,
            app_key: "abc123".to_string(),
            ..Default::default()
        };
        let url = broker.websocket_url();
        assert!(url.starts_with("ws://radio.example.org:6001/app/abc123?protocol=7"));
    }

    #[test]
    fn test_websocket_url_tls() {
        let broker = BrokerConfig {
            use_tls: true,
            ..Default::default()
        };
        assert!(broker.websocket_url().starts_with("wss://"));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
api:
  base_url: "https://radio.example.org"
broker:
  host: "radio.example.org"
  app_key: "abc123"
  use_tls: true
"#;
        let config = SessionConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://radio.example.org");
        // Unset fields fall back to defaults
        assert_eq!(config.api.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.broker.port, DEFAULT_BROKER_PORT);
        assert!(config.broker.use_tls);
    }
}
