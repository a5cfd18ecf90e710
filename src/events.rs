//! Real-time push events from the broadcast broker
//!
//! The backend publishes per-stream events over a Pusher-protocol WebSocket
//! broker: now-playing metadata, listener counts, and status changes. Each
//! stream variant has one channel, named `stream.<id>`; this client keeps at
//! most one connection open and leaves subscription management (which
//! channel should be joined, and when) to the session layer.
//!
//! The session consumes the broker through the [`PushBroker`] trait so tests
//! can substitute an in-memory broker for the network transport.

use crate::config::BrokerConfig;
use crate::error::{Error, Result};
use crate::models::StreamEvent;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Delay before redialing a lost broker connection
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Build the channel name for a stream variant
pub fn stream_channel(id: u64) -> String {
    format!("stream.{}", id)
}

/// Extract the stream id from a channel name, if it is a stream channel
pub fn parse_stream_channel(name: &str) -> Option<u64> {
    name.strip_prefix("stream.").and_then(|id| id.parse().ok())
}

/// A channel event received from the broker
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEvent {
    /// Channel the event was published on (e.g., "stream.1")
    pub channel: String,
    /// Decoded event
    pub event: StreamEvent,
}

impl ChannelEvent {
    /// The stream id this event targets, if the channel is a stream channel
    pub fn stream_id(&self) -> Option<u64> {
        parse_stream_channel(&self.channel)
    }
}

/// A message surfaced to the session by the broker
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerMessage {
    /// The connection (re)entered the connected state; any channel for the
    /// current selection must be (re)joined
    Connected,
    /// The connection was lost; open subscriptions are invalid until the
    /// next [`BrokerMessage::Connected`]
    Disconnected,
    /// An event arrived on a subscribed channel
    Event(ChannelEvent),
}

/// Push broker seam
///
/// At most one connection is live per broker instance; `subscribe` and
/// `unsubscribe` manage the single active channel. `next_message` yields
/// connection transitions and channel events in arrival order and returns
/// `None` once the broker has shut down.
#[async_trait]
pub trait PushBroker: Send {
    /// Open the connection to the broker
    async fn connect(&mut self) -> Result<()>;

    /// Close the connection and stop the transport
    async fn disconnect(&mut self);

    /// Join a channel
    async fn subscribe(&mut self, channel: &str) -> Result<()>;

    /// Leave a channel
    async fn unsubscribe(&mut self, channel: &str) -> Result<()>;

    /// Whether the transport currently reports a live connection
    fn is_connected(&self) -> bool;

    /// Receive the next broker message, or `None` after shutdown
    async fn next_message(&mut self) -> Option<BrokerMessage>;
}

// ============================================================================
// Wire protocol
// ============================================================================

/// One frame of the Pusher wire protocol
#[derive(Debug, serde::Deserialize)]
struct PusherFrame {
    event: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

/// Classified incoming frame
#[derive(Debug)]
enum Incoming {
    /// `pusher:connection_established`
    Established,
    /// `pusher:ping`, must be answered with a pong
    Ping,
    /// `pusher:error` with the broker's message
    ProtocolError(String),
    /// `pusher_internal:subscription_succeeded` for a channel
    SubscriptionSucceeded(String),
    /// A decoded stream event on a channel
    Channel(ChannelEvent),
    /// A frame this client does not handle
    Unhandled(String),
    /// Text that did not parse as a protocol frame
    Malformed,
}

fn classify_frame(text: &str) -> Incoming {
    let frame: PusherFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(_) => return Incoming::Malformed,
    };

    match frame.event.as_str() {
        "pusher:connection_established" => Incoming::Established,
        "pusher:ping" => Incoming::Ping,
        "pusher:error" => {
            let message = frame
                .data
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown broker error")
                .to_string();
            Incoming::ProtocolError(message)
        }
        "pusher_internal:subscription_succeeded" => {
            Incoming::SubscriptionSucceeded(frame.channel.unwrap_or_default())
        }
        event => match frame.channel {
            Some(channel) => match StreamEvent::from_wire(event, &frame.data) {
                Some(Ok(decoded)) => Incoming::Channel(ChannelEvent {
                    channel,
                    event: decoded,
                }),
                Some(Err(e)) => {
                    tracing::warn!("Failed to decode {} payload: {}", event, e);
                    Incoming::Malformed
                }
                None => Incoming::Unhandled(event.to_string()),
            },
            None => Incoming::Unhandled(event.to_string()),
        },
    }
}

fn subscribe_frame(channel: &str) -> String {
    serde_json::json!({
        "event": "pusher:subscribe",
        "data": { "channel": channel },
    })
    .to_string()
}

fn unsubscribe_frame(channel: &str) -> String {
    serde_json::json!({
        "event": "pusher:unsubscribe",
        "data": { "channel": channel },
    })
    .to_string()
}

fn pong_frame() -> String {
    serde_json::json!({ "event": "pusher:pong", "data": {} }).to_string()
}

// ============================================================================
// Pusher client
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum Command {
    Subscribe(String),
    Unsubscribe(String),
    Shutdown,
}

/// Why the socket-driving loop returned
enum DriveEnd {
    /// Orderly shutdown requested through [`Command::Shutdown`]
    Shutdown,
    /// The socket dropped; the loop will redial
    Lost,
}

/// Pusher-protocol push broker client
///
/// `connect()` dials the broker and spawns a background task that drives the
/// socket: answering protocol pings, decoding channel events, and redialing
/// with a fixed backoff when the socket drops. Subscriptions are not
/// replayed across a redial; the session re-joins the current channel when
/// it sees [`BrokerMessage::Connected`].
pub struct PusherClient {
    config: BrokerConfig,
    connected: Arc<AtomicBool>,
    cmd_tx: Option<mpsc::UnboundedSender<Command>>,
    msg_rx: Option<mpsc::UnboundedReceiver<BrokerMessage>>,
    task: Option<JoinHandle<()>>,
}

impl PusherClient {
    /// Create a client for the given broker coordinates
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            connected: Arc::new(AtomicBool::new(false)),
            cmd_tx: None,
            msg_rx: None,
            task: None,
        }
    }

    fn send_command(&self, command: Command) -> Result<()> {
        self.cmd_tx
            .as_ref()
            .ok_or(Error::NotConnected)?
            .send(command)
            .map_err(|_| Error::NotConnected)
    }
}

#[async_trait]
impl PushBroker for PusherClient {
    async fn connect(&mut self) -> Result<()> {
        if self.task.is_some() {
            return Ok(());
        }

        let url = self.config.websocket_url();
        tracing::info!("Connecting to push broker: {}://{}:{}",
            if self.config.use_tls { "wss" } else { "ws" },
            self.config.host,
            self.config.port,
        );

        let (socket, _response) = connect_async(&url).await?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let connected = Arc::clone(&self.connected);

        self.cmd_tx = Some(cmd_tx);
        self.msg_rx = Some(msg_rx);
        self.task = Some(tokio::spawn(run_broker(
            url, socket, connected, cmd_rx, msg_tx,
        )));

        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Err(e) = self.send_command(Command::Shutdown) {
            tracing::debug!("Broker already stopped: {}", e);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Broker task ended abnormally: {}", e);
            }
        }
        self.cmd_tx = None;
        self.msg_rx = None;
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn subscribe(&mut self, channel: &str) -> Result<()> {
        tracing::debug!("Subscribing to {}", channel);
        self.send_command(Command::Subscribe(channel.to_string()))
    }

    async fn unsubscribe(&mut self, channel: &str) -> Result<()> {
        tracing::debug!("Unsubscribing from {}", channel);
        self.send_command(Command::Unsubscribe(channel.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn next_message(&mut self) -> Option<BrokerMessage> {
        self.msg_rx.as_mut()?.recv().await
    }
}

impl Drop for PusherClient {
    fn drop(&mut self) {
        // Orderly disconnect() is preferred; this covers sessions dropped
        // without release()
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Connection lifecycle loop: drive the socket until shutdown, redialing on
/// loss with a fixed backoff
async fn run_broker(
    url: String,
    first_socket: WsStream,
    connected: Arc<AtomicBool>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    msg_tx: mpsc::UnboundedSender<BrokerMessage>,
) {
    let mut socket = Some(first_socket);

    loop {
        let ws = match socket.take() {
            Some(ws) => ws,
            None => {
                match connect_async(&url).await {
                    Ok((ws, _)) => ws,
                    Err(e) => {
                        tracing::warn!("Broker redial failed: {}", e);
                        // Stay responsive to Shutdown while backing off
                        tokio::select! {
                            _ = tokio::time::sleep(RECONNECT_DELAY) => continue,
                            cmd = cmd_rx.recv() => match cmd {
                                Some(Command::Shutdown) | None => break,
                                _ => continue,
                            },
                        }
                    }
                }
            }
        };

        let end = drive_socket(ws, &connected, &mut cmd_rx, &msg_tx).await;

        connected.store(false, Ordering::SeqCst);
        let _ = msg_tx.send(BrokerMessage::Disconnected);

        match end {
            DriveEnd::Shutdown => break,
            DriveEnd::Lost => {
                tracing::warn!("Broker connection lost, redialing in {:?}", RECONNECT_DELAY);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Drive one established socket: forward commands out, surface frames in
async fn drive_socket(
    mut ws: WsStream,
    connected: &AtomicBool,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    msg_tx: &mpsc::UnboundedSender<BrokerMessage>,
) -> DriveEnd {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let frame = match cmd {
                    Some(Command::Subscribe(channel)) => subscribe_frame(&channel),
                    Some(Command::Unsubscribe(channel)) => unsubscribe_frame(&channel),
                    Some(Command::Shutdown) | None => {
                        let _ = ws.close(None).await;
                        return DriveEnd::Shutdown;
                    }
                };
                if let Err(e) = ws.send(Message::text(frame)).await {
                    tracing::error!("Broker send failed: {}", e);
                    return DriveEnd::Lost;
                }
            }
            incoming = ws.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match classify_frame(text.as_str()) {
                            Incoming::Established => {
                                tracing::info!("Push broker connected");
                                connected.store(true, Ordering::SeqCst);
                                let _ = msg_tx.send(BrokerMessage::Connected);
                            }
                            Incoming::Ping => {
                                if let Err(e) = ws.send(Message::text(pong_frame())).await {
                                    tracing::error!("Pong send failed: {}", e);
                                    return DriveEnd::Lost;
                                }
                            }
                            Incoming::ProtocolError(message) => {
                                tracing::error!("Broker protocol error: {}", message);
                            }
                            Incoming::SubscriptionSucceeded(channel) => {
                                tracing::debug!("Subscription confirmed for {}", channel);
                            }
                            Incoming::Channel(event) => {
                                let _ = msg_tx.send(BrokerMessage::Event(event));
                            }
                            Incoming::Unhandled(event) => {
                                tracing::debug!("Ignoring broker event {}", event);
                            }
                            Incoming::Malformed => {
                                tracing::warn!("Malformed broker frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return DriveEnd::Lost,
                    Some(Ok(_)) => {} // binary/ping/pong frames handled by the transport
                    Some(Err(e)) => {
                        tracing::error!("Broker read error: {}", e);
                        return DriveEnd::Lost;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StreamMetadata, StreamStatus};

    #[test]
    fn test_stream_channel_naming() {
        assert_eq!(stream_channel(1), "stream.1");
        assert_eq!(stream_channel(42), "stream.42");
        assert_eq!(parse_stream_channel("stream.42"), Some(42));
        assert_eq!(parse_stream_channel("stream.x"), None);
        assert_eq!(parse_stream_channel("presence-chat"), None);
    }

    #[test]
    fn test_classify_connection_established() {
        let text = r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"1.1\",\"activity_timeout\":120}"}"#;
        assert!(matches!(classify_frame(text), Incoming::Established));
    }

    #[test]
    fn test_classify_ping() {
        assert!(matches!(
            classify_frame(r#"{"event":"pusher:ping"}"#),
            Incoming::Ping
        ));
    }

    #[test]
    fn test_classify_protocol_error() {
        let text = r#"{"event":"pusher:error","data":{"code":4001,"message":"App key not found"}}"#;
        match classify_frame(text) {
            Incoming::ProtocolError(message) => assert_eq!(message, "App key not found"),
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_classify_metadata_event() {
        let text = r#"{"event":".MetadataUpdated","channel":"stream.1","data":"{\"metadata\":{\"title\":\"T\",\"artist\":\"A\"}}"}"#;
        match classify_frame(text) {
            Incoming::Channel(event) => {
                assert_eq!(event.stream_id(), Some(1));
                assert_eq!(
                    event.event,
                    StreamEvent::MetadataUpdated(StreamMetadata {
                        title: "T".to_string(),
                        artist: "A".to_string(),
                        album: None,
                        artwork_url: None,
                    })
                );
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_classify_status_event_without_dot_prefix() {
        let text = r#"{"event":"StreamStatusChanged","channel":"stream.2","data":{"status":"offline"}}"#;
        match classify_frame(text) {
            Incoming::Channel(event) => {
                assert_eq!(event.channel, "stream.2");
                assert_eq!(event.event, StreamEvent::StatusChanged(StreamStatus::Offline));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_classify_unhandled_and_malformed() {
        assert!(matches!(
            classify_frame(r#"{"event":".SomethingNew","channel":"stream.1","data":{}}"#),
            Incoming::Unhandled(_)
        ));
        assert!(matches!(classify_frame("not json"), Incoming::Malformed));
    }

    #[test]
    fn test_outgoing_frames() {
        let sub: serde_json::Value = serde_json::from_str(&subscribe_frame("stream.1")).unwrap();
        assert_eq!(sub["event"], "pusher:subscribe");
        assert_eq!(sub["data"]["channel"], "stream.1");

        let unsub: serde_json::Value =
            serde_json::from_str(&unsubscribe_frame("stream.1")).unwrap();
        assert_eq!(unsub["event"], "pusher:unsubscribe");

        let pong: serde_json::Value = serde_json::from_str(&pong_frame()).unwrap();
        assert_eq!(pong["event"], "pusher:pong");
    }
}
