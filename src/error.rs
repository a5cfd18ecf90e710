//! Error types for the ESC Radio client

/// Result type alias for ESC Radio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using the ESC Radio client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// API returned an error status
    #[error("API error: {0}")]
    Api(String),

    /// Stream not found
    #[error("Stream not found: {0}")]
    StreamNotFound(u64),

    /// A detail response arrived for a stream other than the one requested
    #[error("Stale response: requested stream {requested}, received {received}")]
    StaleResponse { requested: u64, received: u64 },

    /// The push broker is not connected
    #[error("Push broker is not connected")]
    NotConnected,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
