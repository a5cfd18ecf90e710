//! Live radio session: directory, subscription, and playback in one owner
//!
//! A [`RadioSession`] is the page-scoped owner of the three singletons the
//! live player needs: the stream directory handle, the push broker
//! connection, and the playable audio resource. It is an explicitly owned
//! object with an `acquire()`/`release()` lifecycle rather than ambient
//! module state, so independent sessions can coexist (and be tested).
//!
//! All state transitions go through `&mut self`: UI intents and broker
//! messages are serialized by the single driver, which is the only ordering
//! guarantee the session gives (see [`RadioSession::select_stream`] for the
//! per-switch sequence).
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
//!     session.play().await;
//!
//!     // Pump broker messages until the connection goes away
//!     while session.process_next().await {
//!         if let Some(stream) = session.selected() {
//!             println!("{} ({} listeners)", stream.metadata.display(), stream.current_listeners);
//!         }
//!     }
//!
//!     session.release().await;
//!     Ok(())
//! }
//! ```

use crate::client::EscRadioClient;
use crate::config::SessionConfig;
use crate::directory::StreamDirectory;
use crate::error::{Error, Result};
use crate::events::{stream_channel, BrokerMessage, ChannelEvent, PushBroker, PusherClient};
use crate::models::{RadioStream, StreamEvent};
use crate::playback::{AudioSink, Player};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long the transient "metadata updated" signal stays raised
pub const METADATA_FLASH: Duration = Duration::from_secs(2);

/// Page-scoped live radio session
pub struct RadioSession {
    directory: Arc<dyn StreamDirectory>,
    broker: Box<dyn PushBroker>,
    player: Player,
    streams: Vec<RadioStream>,
    selected: Option<RadioStream>,
    /// The single channel currently joined, if any
    subscribed_channel: Option<String>,
    /// Deadline until which the "metadata updated" signal is raised
    metadata_flash_until: Option<Instant>,
}

impl RadioSession {
    /// Create a session over explicit directory, broker, and sink handles
    pub fn new(
        directory: Arc<dyn StreamDirectory>,
        broker: Box<dyn PushBroker>,
        sink: Box<dyn AudioSink>,
    ) -> Self {
        Self {
            directory,
            broker,
            player: Player::new(sink),
            streams: Vec::new(),
            selected: None,
            subscribed_channel: None,
            metadata_flash_until: None,
        }
    }

    /// Create a session from configuration, with the production HTTP client
    /// and Pusher broker
    pub fn from_config(config: &SessionConfig, sink: Box<dyn AudioSink>) -> Result<Self> {
        let client = EscRadioClient::from_config(&config.api)?;
        let broker = PusherClient::new(config.broker.clone());
        Ok(Self::new(Arc::new(client), Box::new(broker), sink))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open the broker connection
    pub async fn acquire(&mut self) -> Result<()> {
        self.broker.connect().await
    }

    /// Leave any open channel, close the broker connection, and stop playback
    ///
    /// After release no subscription or connection survives.
    pub async fn release(&mut self) {
        if let Some(channel) = self.subscribed_channel.take() {
            if let Err(e) = self.broker.unsubscribe(&channel).await {
                tracing::debug!("Leave on release failed: {}", e);
            }
        }
        self.broker.disconnect().await;
        if self.player.is_playing() {
            self.player.stop();
        }
    }

    // ========================================================================
    // Stream directory
    // ========================================================================

    /// Load the stream catalog and establish the initial selection
    ///
    /// Fetches the list, then re-fetches the *detail* record of the first
    /// entry (the detail view carries fresher counts and metadata) and
    /// selects it. A selection made while the load was in flight wins over
    /// the initial one.
    pub async fn load_streams(&mut self) -> Result<()> {
        let streams = match self.directory.list_streams().await {
            Ok(streams) => streams,
            Err(e) => {
                tracing::error!("Failed to load streams: {}", e);
                return Err(e);
            }
        };

        tracing::info!("Loaded {} stream variants", streams.len());
        let first_id = streams.first().map(|s| s.id);
        self.streams = streams;

        let Some(first_id) = first_id else {
            return Ok(());
        };

        match self.fetch_fresh_detail(first_id).await {
            Ok(fresh) => {
                if self.selected.is_some() {
                    // A switch completed while this load was in flight
                    tracing::debug!("Initial selection superseded by a user switch");
                    return Ok(());
                }
                self.apply_selection(fresh).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load initial stream: {}", e);
                Err(e)
            }
        }
    }

    /// Switch the selected variant
    ///
    /// Enforced sequence: leave the old channel, fetch a fresh detail
    /// record, verify it names the requested stream, update the selection
    /// and the audio source, then join the new channel. No event for the
    /// old variant is processed against the new selection, and the new
    /// channel is never joined before its URL is known.
    pub async fn select_stream(&mut self, id: u64) -> Result<()> {
        if let Some(channel) = self.subscribed_channel.take() {
            if let Err(e) = self.broker.unsubscribe(&channel).await {
                tracing::warn!("Failed to leave {}: {}", channel, e);
            }
        }

        let fresh = self.fetch_fresh_detail(id).await.inspect_err(|e| {
            tracing::error!("Failed to select stream {}: {}", id, e);
        })?;

        self.apply_selection(fresh).await;
        Ok(())
    }

    /// Fetch a detail record and reject a response naming the wrong stream
    async fn fetch_fresh_detail(&self, id: u64) -> Result<RadioStream> {
        let fresh = self.directory.stream_detail(id).await?;
        if fresh.id != id {
            return Err(Error::StaleResponse {
                requested: id,
                received: fresh.id,
            });
        }
        Ok(fresh)
    }

    /// Set the selection and audio source, then join the stream's channel
    async fn apply_selection(&mut self, stream: RadioStream) {
        let channel = stream_channel(stream.id);
        self.player.set_source(&stream.url);
        self.selected = Some(stream);

        if self.broker.is_connected() {
            match self.broker.subscribe(&channel).await {
                Ok(()) => self.subscribed_channel = Some(channel),
                Err(e) => tracing::warn!("Failed to join {}: {}", channel, e),
            }
        }
    }

    // ========================================================================
    // Broker messages
    // ========================================================================

    /// Pump one broker message; returns `false` once the broker is gone
    pub async fn process_next(&mut self) -> bool {
        match self.broker.next_message().await {
            Some(message) => {
                self.handle_message(message).await;
                true
            }
            None => false,
        }
    }

    /// Apply a single broker message to the session state
    pub async fn handle_message(&mut self, message: BrokerMessage) {
        match message {
            BrokerMessage::Connected => {
                // (Re)join the channel for whatever is currently selected
                if let Some(id) = self.selected.as_ref().map(|s| s.id) {
                    let channel = stream_channel(id);
                    match self.broker.subscribe(&channel).await {
                        Ok(()) => self.subscribed_channel = Some(channel),
                        Err(e) => tracing::warn!("Failed to rejoin {}: {}", channel, e),
                    }
                }
            }
            BrokerMessage::Disconnected => {
                tracing::warn!("Push broker disconnected, subscription invalidated");
                self.subscribed_channel = None;
            }
            BrokerMessage::Event(event) => self.apply_event(event),
        }
    }

    /// Apply a channel event to the selected variant
    ///
    /// Each event kind replaces exactly one field. Events for streams other
    /// than the current selection are dropped (a slow channel leave can
    /// still deliver a late event for the previous variant).
    fn apply_event(&mut self, event: ChannelEvent) {
        let Some(selected) = self.selected.as_mut() else {
            return;
        };
        if event.stream_id() != Some(selected.id) {
            tracing::debug!(
                "Ignoring event on {} while stream {} is selected",
                event.channel,
                selected.id
            );
            return;
        }

        match event.event {
            StreamEvent::MetadataUpdated(metadata) => {
                tracing::debug!("Now playing: {}", metadata.display());
                selected.metadata = metadata;
                self.metadata_flash_until = Some(Instant::now() + METADATA_FLASH);
            }
            StreamEvent::ListenerCountUpdated(count) => {
                selected.current_listeners = count;
            }
            StreamEvent::StatusChanged(status) => {
                tracing::info!("Stream {} is now {}", selected.id, status);
                selected.status = status;
            }
        }
    }

    // ========================================================================
    // Playback intents
    // ========================================================================

    /// User pressed play
    pub async fn play(&mut self) {
        self.player.play().await;
    }

    /// User pressed stop
    pub fn stop(&mut self) {
        self.player.stop();
    }

    /// Single play/stop control
    pub async fn toggle_playback(&mut self) {
        self.player.toggle().await;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The loaded stream catalog
    pub fn streams(&self) -> &[RadioStream] {
        &self.streams
    }

    /// Catalog filtered to user-selectable variants (fallback relays hidden)
    pub fn selectable_streams(&self) -> impl Iterator<Item = &RadioStream> {
        self.streams.iter().filter(|s| !s.is_fallback_relay())
    }

    /// The currently selected variant
    pub fn selected(&self) -> Option<&RadioStream> {
        self.selected.as_ref()
    }

    /// The channel currently joined, if any
    pub fn subscribed_channel(&self) -> Option<&str> {
        self.subscribed_channel.as_deref()
    }

    /// Whether the broker currently reports a live connection
    pub fn is_connected(&self) -> bool {
        self.broker.is_connected()
    }

    /// Transient signal raised by a metadata update, auto-clearing after
    /// [`METADATA_FLASH`]
    pub fn metadata_recently_updated(&self) -> bool {
        self.metadata_flash_until
            .is_some_and(|deadline| Instant::now() < deadline)
    }

    /// The playback state machine
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Mutable access to the playback state machine
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }
}

impl std::fmt::Debug for RadioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioSession")
            .field("streams", &self.streams.len())
            .field("selected", &self.selected.as_ref().map(|s| s.id))
            .field("subscribed_channel", &self.subscribed_channel)
            .field("player", &self.player)
            .finish()
    }
}
