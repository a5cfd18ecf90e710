//! HTTP client for the ESC Radio stream directory API
//!
//! This module provides a client for the backend's REST endpoints: the
//! catalog of stream variants and the fresher single-variant detail view.
//!
//! # Example
//!
//! ```no_run
//! use escradio::EscRadioClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EscRadioClient::new()?;
//!
//!     let streams = client.list_streams().await?;
//!     for stream in &streams {
//!         println!("{} ({} kbps) - {}", stream.name, stream.bitrate, stream.status);
//!     }
//!
//!     if let Some(first) = streams.first() {
//!         let fresh = client.stream_detail(first.id).await?;
//!         println!("Now playing: {}", fresh.metadata.display());
//!     }
//!
//!     Ok(())
//! }
//! ```

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::models::{RadioStream, StreamDetailEnvelope, StreamListEnvelope};
use reqwest::Client;
use std::time::Duration;

/// ESC Radio directory HTTP client
///
/// The client is stateless and does not cache responses internally; the
/// session layer re-fetches fresh records on load and on every explicit
/// re-selection.
#[derive(Debug, Clone)]
pub struct EscRadioClient {
    pub(crate) client: Client,
    base_url: String,
    timeout: Duration,
}

impl EscRadioClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a client from an [`ApiConfig`]
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::builder()
            .base_url(&config.base_url)
            .timeout(config.request_timeout())
            .user_agent(&config.user_agent)
            .build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client with a custom reqwest::Client
    ///
    /// Useful for sharing HTTP connection pools or custom proxy settings
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: crate::config::DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(crate::config::DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the internal HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Fetch the catalog of stream variants
    ///
    /// The list endpoint may deliver each variant's `metadata` field as a
    /// JSON-encoded string; decoding normalizes it into the structured form.
    pub async fn list_streams(&self) -> Result<Vec<RadioStream>> {
        let url = format!("{}/api/streams", self.base_url);

        tracing::debug!("Fetching stream list: {}", url);

        let response = self.client.get(&url).timeout(self.timeout).send().await?;

        if !response.status().is_success() {
            return Err(Error::api(format!(
                "Stream list returned status: {}",
                response.status()
            )));
        }

        let envelope: StreamListEnvelope = response.json().await?;

        tracing::debug!("Received {} stream variants", envelope.data.streams.len());

        Ok(envelope.data.streams)
    }

    /// Fetch the detail record for a single stream variant
    ///
    /// The detail view carries fresher listener counts and metadata than the
    /// list endpoint.
    pub async fn stream_detail(&self, id: u64) -> Result<RadioStream> {
        let url = format!("{}/api/streams/{}", self.base_url, id);

        tracing::debug!("Fetching stream detail: {}", url);

        let response = self.client.get(&url).timeout(self.timeout).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::StreamNotFound(id));
        }
        if !response.status().is_success() {
            return Err(Error::api(format!(
                "Stream detail returned status: {}",
                response.status()
            )));
        }

        let envelope: StreamDetailEnvelope = response.json().await?;
        Ok(envelope.data.stream)
    }
}

/// Builder for configuring an EscRadioClient
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    base_url: String,
    timeout: Duration,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            base_url: crate::config::DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(crate::config::DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<EscRadioClient> {
        let client = if let Some(client) = self.client {
            client
        } else {
            Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.timeout)
                .build()?
        };

        url::Url::parse(&self.base_url)?;

        // Trailing slashes would produce "//api/streams"
        let base_url = self.base_url.trim_end_matches('/').to_string();

        Ok(EscRadioClient {
            client,
            base_url,
            timeout: self.timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Unit Tests (no network)
    // ========================================================================

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::default();
        assert_eq!(builder.base_url, crate::config::DEFAULT_API_BASE_URL);
        assert_eq!(
            builder.timeout,
            Duration::from_secs(crate::config::DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_builder_strips_trailing_slash() {
        let client = EscRadioClient::builder()
            .base_url("https://radio.example.org/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "https://radio.example.org");
    }

    #[test]
    fn test_builder_rejects_invalid_base_url() {
        let result = EscRadioClient::builder().base_url("not a url").build();
        assert!(matches!(result, Err(crate::Error::InvalidUrl(_))));
    }

    // ========================================================================
    // Integration Tests (real API calls)
    //
    // Run with: cargo test -- --ignored
    // ========================================================================

    #[tokio::test]
    #[ignore = "Integration test - requires a running ESC Radio backend"]
    async fn test_list_streams() {
        let client = EscRadioClient::new().expect("Failed to create client");
        let streams = client.list_streams().await;

        assert!(streams.is_ok(), "Failed to list streams: {:?}", streams.err());

        let streams = streams.unwrap();
        assert!(!streams.is_empty(), "Expected at least one stream variant");

        for stream in &streams {
            println!(
                "{} ({} kbps, {}) - {} listeners",
                stream.name, stream.bitrate, stream.format, stream.current_listeners
            );
        }
    }

    #[tokio::test]
    #[ignore = "Integration test - requires a running ESC Radio backend"]
    async fn test_stream_detail_matches_list() {
        let client = EscRadioClient::new().expect("Failed to create client");
        let streams = client.list_streams().await.expect("Failed to list streams");
        let first = streams.first().expect("Expected at least one stream");

        let fresh = client
            .stream_detail(first.id)
            .await
            .expect("Failed to fetch detail");

        assert_eq!(fresh.id, first.id);
        assert!(!fresh.url.is_empty(), "Detail record must carry a URL");
        println!("Now playing on {}: {}", fresh.name, fresh.metadata.display());
    }

    #[tokio::test]
    #[ignore = "Integration test - requires a running ESC Radio backend"]
    async fn test_unknown_stream_is_not_found() {
        let client = EscRadioClient::new().expect("Failed to create client");
        let result = client.stream_detail(u64::MAX).await;
        assert!(result.is_err(), "Expected error for unknown stream id");
    }
}
