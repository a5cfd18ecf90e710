//! Data models for the ESC Radio API and push events
//!
//! This module contains the structures needed to deserialize responses
//! from the stream directory REST API and the payloads carried by the
//! push broker's channel events.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Stream Directory Models
// ============================================================================

/// Operational status of a broadcast stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    /// Stream is broadcasting
    Online,
    /// Stream is down or not mounted
    Offline,
}

impl StreamStatus {
    /// Check if the stream is currently broadcasting
    pub fn is_online(&self) -> bool {
        matches!(self, StreamStatus::Online)
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamStatus::Online => write!(f, "online"),
            StreamStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Now-playing descriptor embedded in a stream variant
///
/// Replaced wholesale by a `MetadataUpdated` push event; the other event
/// kinds leave it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StreamMetadata {
    /// Track title
    #[serde(default)]
    pub title: String,
    /// Artist name
    #[serde(default)]
    pub artist: String,
    /// Album title, when known
    #[serde(default)]
    pub album: Option<String>,
    /// Cover artwork URL, when known
    #[serde(default)]
    pub artwork_url: Option<String>,
}

impl StreamMetadata {
    /// Format as "Artist - Title" for display
    pub fn display(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// One broadcast encoding (bitrate/format variant) of the live program
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RadioStream {
    /// Stable unique identifier
    pub id: u64,
    /// Display name (e.g., "ESC Radio 320kbps")
    pub name: String,
    /// Icecast mount point (e.g., "/live-320")
    #[serde(default)]
    pub mount_point: String,
    /// Playback URL for the audio stream
    pub url: String,
    /// Bitrate in kbps
    pub bitrate: u32,
    /// Audio format (e.g., "mp3", "aac")
    pub format: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Operational status
    pub status: StreamStatus,
    /// Listener capacity
    #[serde(default)]
    pub max_listeners: u32,
    /// Current listener count
    #[serde(default)]
    pub current_listeners: u32,
    /// Now-playing metadata; the list endpoint may deliver this as a
    /// JSON-encoded string, which is normalized on decode
    #[serde(default, deserialize_with = "string_or_struct")]
    pub metadata: StreamMetadata,
    /// When the record was last updated on the backend
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Marks the canonical/primary variant
    #[serde(default)]
    pub is_primary: bool,
}

impl RadioStream {
    /// Check whether this variant is a fallback relay rather than a
    /// user-selectable quality
    pub fn is_fallback_relay(&self) -> bool {
        self.name.to_lowercase().contains("fallback")
    }
}

/// Deserialize a value that may arrive either as a structured object or as
/// a JSON-encoded string containing that object
fn string_or_struct<'de, T, D>(deserializer: D) -> std::result::Result<T, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => serde_json::from_str(&s).map_err(serde::de::Error::custom),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// REST Envelopes
// ============================================================================

/// Response envelope for `GET /api/streams`
#[derive(Debug, Clone, Deserialize)]
pub struct StreamListEnvelope {
    /// Backend success flag
    #[serde(default)]
    pub success: bool,
    /// Payload wrapper
    pub data: StreamListData,
}

/// Payload of the stream list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct StreamListData {
    /// All known stream variants
    pub streams: Vec<RadioStream>,
}

/// Response envelope for `GET /api/streams/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct StreamDetailEnvelope {
    /// Payload wrapper
    pub data: StreamDetailData,
}

/// Payload of the stream detail endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct StreamDetailData {
    /// The requested stream variant, fresher than the list view
    pub stream: RadioStream,
}

// ============================================================================
// Push Event Models
// ============================================================================

/// Payload of a `MetadataUpdated` event
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataUpdatedPayload {
    /// Replacement now-playing metadata
    pub metadata: StreamMetadata,
}

/// Payload of a `ListenerCountUpdated` event
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerCountUpdatedPayload {
    /// Replacement listener count
    pub count: u32,
}

/// Payload of a `StreamStatusChanged` event
#[derive(Debug, Clone, Deserialize)]
pub struct StreamStatusChangedPayload {
    /// Replacement operational status
    pub status: StreamStatus,
}

/// A decoded push event for a stream channel
///
/// Each kind replaces exactly one field of the selected stream variant and
/// leaves the others untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Now-playing metadata replaced wholesale
    MetadataUpdated(StreamMetadata),
    /// Listener count replaced
    ListenerCountUpdated(u32),
    /// Operational status replaced
    StatusChanged(StreamStatus),
}

impl StreamEvent {
    /// Wire name of the metadata event
    pub const METADATA_UPDATED: &'static str = "MetadataUpdated";
    /// Wire name of the listener count event
    pub const LISTENER_COUNT_UPDATED: &'static str = "ListenerCountUpdated";
    /// Wire name of the status event
    pub const STREAM_STATUS_CHANGED: &'static str = "StreamStatusChanged";

    /// Decode a wire event by name and payload
    ///
    /// Event names may carry the client-side namespace-escape dot prefix
    /// (`.MetadataUpdated`); a leading dot is stripped before matching.
    /// The payload may be double-encoded (a JSON string containing JSON),
    /// which is normal for the Pusher protocol.
    ///
    /// Returns `None` for event names this client does not handle.
    pub fn from_wire(
        event: &str,
        data: &serde_json::Value,
    ) -> Option<crate::error::Result<Self>> {
        let name = event.strip_prefix('.').unwrap_or(event);
        match name {
            Self::METADATA_UPDATED => Some(
                decode_event_payload::<MetadataUpdatedPayload>(data)
                    .map(|p| StreamEvent::MetadataUpdated(p.metadata)),
            ),
            Self::LISTENER_COUNT_UPDATED => Some(
                decode_event_payload::<ListenerCountUpdatedPayload>(data)
                    .map(|p| StreamEvent::ListenerCountUpdated(p.count)),
            ),
            Self::STREAM_STATUS_CHANGED => Some(
                decode_event_payload::<StreamStatusChangedPayload>(data)
                    .map(|p| StreamEvent::StatusChanged(p.status)),
            ),
            _ => None,
        }
    }
}

/// Decode an event payload that may be a JSON object or a JSON-encoded string
fn decode_event_payload<T: DeserializeOwned>(
    data: &serde_json::Value,
) -> crate::error::Result<T> {
    match data {
        serde_json::Value::String(s) => Ok(serde_json::from_str(s)?),
        other => Ok(serde_json::from_value(other.clone())?),
    }
}
