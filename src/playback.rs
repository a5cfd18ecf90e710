//! Playback state machine with radio semantics
//!
//! A live broadcast must never resume from a stale buffer: after a manual
//! pause, pressing play reconnects to the *current* live position by
//! replacing the sink's source with the same stream URL decorated with a
//! fresh cache-busting `live=` query value. A plain start from the stopped
//! state plays the source as-is.
//!
//! The audio output itself sits behind [`AudioSink`] so the player can be
//! bound to any backend (and tests can record the exact call sequence).

use crate::error::Result;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Settling delay between forcing a reload and issuing play on resume
pub const RESUME_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Query parameter appended to force a fresh connection on resume
pub const LIVE_QUERY_PARAM: &str = "live";

/// The single playable audio resource
///
/// Models the minimal surface the player needs: a mutable source URL,
/// preload control, a forced reload, and play/pause. Implementations are
/// expected to be cheap state holders; actual decoding happens downstream.
pub trait AudioSink: Send {
    /// Point the sink at a new source URL
    fn set_source(&mut self, url: &str);

    /// Discard the current source entirely
    fn clear_source(&mut self);

    /// Enable or disable preloading of the source
    fn set_preload(&mut self, enabled: bool);

    /// Force the sink to reload its current source
    fn load(&mut self);

    /// Start playback; fails when the backend refuses to start (e.g.,
    /// an autoplay policy)
    fn play(&mut self) -> Result<()>;

    /// Pause playback
    fn pause(&mut self);
}

/// No-op sink for wiring a session without an audio backend
#[derive(Debug, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn set_source(&mut self, _url: &str) {}
    fn clear_source(&mut self) {}
    fn set_preload(&mut self, _enabled: bool) {}
    fn load(&mut self) {}
    fn play(&mut self) -> Result<()> {
        Ok(())
    }
    fn pause(&mut self) {}
}

/// Playback states of the radio player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing playing, no pending resume
    Stopped,
    /// Live audio running
    Playing,
    /// Paused by the user or an external interruption; the next play must
    /// reconnect to the live position instead of resuming the buffer
    PausedManually,
}

/// Radio player binding user play/stop intent to a single [`AudioSink`]
pub struct Player {
    sink: Box<dyn AudioSink>,
    state: PlaybackState,
    /// Last known playing flag; the toggle control flips on this alone
    playing: bool,
    /// Undecorated URL of the selected stream
    source_url: Option<String>,
    /// Highest `live=` value issued so far, so each resume is strictly newer
    last_live_tag: u64,
}

impl Player {
    /// Create a player over the given sink
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            sink,
            state: PlaybackState::Stopped,
            playing: false,
            source_url: None,
            last_live_tag: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Last known playing flag, as seen by the toggle control
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// The undecorated stream URL the player is bound to
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Bind the player to a stream URL
    ///
    /// Called on initial load and on every variant switch; the sink always
    /// targets the URL of the currently selected variant.
    pub fn set_source(&mut self, url: &str) {
        self.source_url = Some(url.to_string());
        self.sink.set_source(url);
    }

    /// Drop the source, e.g., when the selection is lost
    pub fn clear_source(&mut self) {
        self.source_url = None;
        self.sink.clear_source();
    }

    /// Start playback
    ///
    /// From `Stopped` this starts the sink at its current source. From
    /// `PausedManually` it reconnects to the live position first (see
    /// module docs). Start failures are logged and degrade to `Stopped`;
    /// the user presses play again, nothing retries automatically.
    pub async fn play(&mut self) {
        match self.state {
            PlaybackState::Playing => {}
            PlaybackState::PausedManually if self.source_url.is_some() => {
                self.resume_reconnect().await;
            }
            _ => {
                match self.sink.play() {
                    Ok(()) => {
                        self.state = PlaybackState::Playing;
                        self.playing = true;
                    }
                    Err(e) => {
                        tracing::error!("Playback start failed: {}", e);
                        self.state = PlaybackState::Stopped;
                        self.playing = false;
                    }
                }
            }
        }
    }

    /// Stop playback
    ///
    /// Radio semantics: a stop is a manual pause, so the next play goes
    /// through the live reconnect path.
    pub fn stop(&mut self) {
        self.sink.pause();
        self.state = PlaybackState::PausedManually;
        self.playing = false;
    }

    /// Flip between play and stop based on the last known playing flag
    pub async fn toggle(&mut self) {
        if self.playing {
            self.stop();
        } else {
            self.play().await;
        }
    }

    /// Record a pause that did not come through [`Player::stop`]
    ///
    /// OS-level interruptions pause the sink directly; anything short of a
    /// natural end-of-stream counts as a manual pause and arms the
    /// reconnect path.
    pub fn on_external_pause(&mut self, ended: bool) {
        if !ended {
            tracing::debug!("Stream paused externally");
            self.state = PlaybackState::PausedManually;
            self.playing = false;
        }
    }

    /// Rejoin the live broadcast at its current position
    ///
    /// The paused buffer is stale; replaying it would lag the broadcast.
    /// Discard the source, re-set it with a fresh cache-busting query value,
    /// force a reload, and start after a brief settling delay.
    async fn resume_reconnect(&mut self) {
        // State checked by the caller
        let base = match self.source_url.clone() {
            Some(url) => url,
            None => return,
        };

        let fresh = self.fresh_live_url(&base);
        tracing::info!("Resuming live stream, reconnecting to current position");

        self.sink.pause();
        self.sink.clear_source();
        self.sink.set_source(&fresh);
        self.sink.set_preload(false);
        self.sink.load();

        tokio::time::sleep(RESUME_SETTLE_DELAY).await;

        match self.sink.play() {
            Ok(()) => {
                tracing::debug!("Stream reconnected to live position");
                self.state = PlaybackState::Playing;
                self.playing = true;
            }
            Err(e) => {
                // Not retried; the user presses play again
                tracing::error!("Autoplay after live reconnect failed: {}", e);
                self.state = PlaybackState::Stopped;
                self.playing = false;
            }
        }
    }

    /// Decorate the stream URL with a `live=` value strictly greater than
    /// any previously issued one
    fn fresh_live_url(&mut self, base: &str) -> String {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let tag = now_ms.max(self.last_live_tag + 1);
        self.last_live_tag = tag;

        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{}{}{}={}", base, separator, LIVE_QUERY_PARAM, tag)
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("state", &self.state)
            .field("playing", &self.playing)
            .field("source_url", &self.source_url)
            .finish()
    }
}
