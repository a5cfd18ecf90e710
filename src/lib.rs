//! ESC Radio live stream client
//!
//! This crate provides a Rust client for the ESC Radio songwriting-community
//! station: the stream directory REST API, the real-time push channel feed,
//! and a playback state machine with live-radio semantics.
//!
//! # Features
//!
//! - **Stream Directory**: List the station's stream variants (bitrates,
//!   formats, mount points) and fetch the fresher single-variant detail view
//! - **Live Updates**: Subscribe to per-stream channels over a Pusher-protocol
//!   WebSocket and receive now-playing metadata, listener counts, and
//!   online/offline transitions as they happen
//! - **Radio Playback**: A resume-aware state machine that rejoins the live
//!   edge after a pause instead of replaying buffered audio
//! - **Session Lifecycle**: One owner object tying the three together, with
//!   explicit `acquire()`/`release()` so independent sessions can coexist
//!
//! # Example
//!
//! ```no_run
//! use escradio::{NullSink, RadioSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::default();
//!     let mut session = RadioSession::from_config(&config, Box::new(NullSink))?;
//!
//!     session.acquire().await?;
//!     session.load_streams().await?;
//!
//!     if let Some(stream) = session.selected() {
//!         println!("Tuned to {} ({} kbps)", stream.name, stream.bitrate);
//!     }
//!     session.play().await;
//!
//!     while session.process_next().await {
//!         if let Some(stream) = session.selected() {
//!             println!(
//!                 "{} | {} listeners",
//!                 stream.metadata.display(),
//!                 stream.current_listeners
//!             );
//!         }
//!     }
//!
//!     session.release().await;
//!     Ok(())
//! }
//! ```
//!
//! # Live edge semantics
//!
//! A live radio stream has no seekable timeline. Pausing and pressing play
//! again must not resume from the stall point, so [`Player`] tears the
//! source down and re-attaches it with a fresh cache-busting query tag
//! before playing. See the [`playback`] module for the exact sequence.
//!
//! # Connection loss
//!
//! The broker redials with a fixed delay after an unexpected close. Channel
//! subscriptions do not survive a reconnect; the session re-joins the
//! channel for the current selection when the broker reports
//! [`BrokerMessage::Connected`] again.

pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod models;
pub mod playback;
pub mod session;

// Re-exports
pub use client::{ClientBuilder, EscRadioClient};
pub use config::{ApiConfig, BrokerConfig, SessionConfig};
pub use directory::StreamDirectory;
pub use error::{Error, Result};
pub use events::{
    stream_channel, BrokerMessage, ChannelEvent, PushBroker, PusherClient, RECONNECT_DELAY,
};
pub use models::{RadioStream, StreamEvent, StreamMetadata, StreamStatus};
pub use playback::{AudioSink, NullSink, PlaybackState, Player};
pub use session::{RadioSession, METADATA_FLASH};
