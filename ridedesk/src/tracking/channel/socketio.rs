//! Socket.IO client over `tokio-tungstenite`.
//!
//! # Connection loop
//!
//! ```text
//! open(tx) ──► spawn ──► connect ──► 0 open ──► send 40{auth}
//!                 ▲                                  │
//!                 │                        40 ──► Connected
//!                 │                        42 ──► Position
//!                 │                        2  ──► reply 3
//!                 │                                  │
//!                 └── sleep(reconnect_delay) ◄── Disconnected
//! ```
//!
//! The loop runs until [`SocketIoChannel::close`] cancels it. Connection
//! failures are reported as [`ChannelEvent::Disconnected`] and retried with a
//! fixed delay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::codec::{EnginePacket, SocketPacket};
use super::{ChannelError, ChannelEvent, EventSender, LiveLocationChannel};
use crate::tracking::model::LocationUpdate;

/// Event name carrying driver positions.
pub const DEFAULT_LOCATION_EVENT: &str = "driver_location_update";

/// Delay between reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

const SOCKET_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Derive the socket endpoint from the REST base URL.
///
/// A trailing `/api` is stripped and the scheme mapped to its WebSocket
/// counterpart: `https://ops.example.com/api` becomes
/// `wss://ops.example.com/socket.io/?EIO=4&transport=websocket`.
pub fn socket_url(api_base: &str) -> Result<String, ChannelError> {
    let trimmed = api_base.trim().trim_end_matches('/');
    let base = trimmed.strip_suffix("/api").unwrap_or(trimmed);

    let (scheme, rest) = base
        .split_once("://")
        .ok_or_else(|| ChannelError::InvalidUrl(api_base.to_string()))?;
    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(ChannelError::InvalidUrl(api_base.to_string())),
    };
    if rest.is_empty() {
        return Err(ChannelError::InvalidUrl(api_base.to_string()));
    }

    Ok(format!("{}://{}{}", ws_scheme, rest, SOCKET_PATH))
}

/// Socket.IO connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketIoConfig {
    /// Full WebSocket URL, usually from [`socket_url`].
    pub url: String,
    /// Event name to subscribe to.
    pub event: String,
    /// Bearer token sent in the connect packet's auth payload.
    pub token: Option<String>,
    pub reconnect_delay: Duration,
}

impl SocketIoConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            event: DEFAULT_LOCATION_EVENT.to_string(),
            token: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// Build from an API base URL.
    pub fn from_api_base(api_base: &str) -> Result<Self, ChannelError> {
        Ok(Self::new(socket_url(api_base)?))
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    fn connect_packet(&self) -> String {
        let data = self.token.as_ref().map(|t| json!({ "token": t }));
        EnginePacket::Message(SocketPacket::Connect {
            namespace: "/".to_string(),
            data,
        })
        .encode()
    }
}

/// Live-location channel backed by a Socket.IO server.
#[derive(Debug)]
pub struct SocketIoChannel {
    config: SocketIoConfig,
    shutdown: CancellationToken,
    opened: AtomicBool,
}

impl SocketIoChannel {
    pub fn new(config: SocketIoConfig) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
            opened: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SocketIoConfig {
        &self.config
    }
}

impl LiveLocationChannel for SocketIoChannel {
    fn open(&self, events: EventSender) -> Result<(), ChannelError> {
        if self.shutdown.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        if self.opened.swap(true, Ordering::SeqCst) {
            return Err(ChannelError::AlreadyOpen);
        }

        let config = self.config.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(run(config, events, shutdown));
        Ok(())
    }

    fn close(&self) {
        if !self.shutdown.is_cancelled() {
            info!(url = %self.config.url, "Closing live location channel");
            self.shutdown.cancel();
        }
    }

    fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Drop for SocketIoChannel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run(config: SocketIoConfig, events: EventSender, shutdown: CancellationToken) {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        debug!(url = %config.url, attempt, "Connecting live location channel");

        let reason = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = session(&config, &events, &shutdown) => match result {
                Ok(reason) => reason,
                Err(e) => e.to_string(),
            },
        };

        if shutdown.is_cancelled() {
            break;
        }
        warn!(reason = %reason, attempt, "Live location channel disconnected");
        if events.send(ChannelEvent::Disconnected { reason }).is_err() {
            debug!("Event receiver dropped, stopping channel");
            break;
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }
    debug!(url = %config.url, "Live location channel task finished");
}

/// Run one connection until it ends. Returns the disconnect reason.
async fn session(
    config: &SocketIoConfig,
    events: &EventSender,
    shutdown: &CancellationToken,
) -> Result<String, ChannelError> {
    let (stream, _) = tokio_tungstenite::connect_async(config.url.as_str())
        .await
        .map_err(|e| ChannelError::Connect(e.to_string()))?;
    let (mut sink, mut stream) = stream.split();

    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => {
                let goodbye = EnginePacket::Message(SocketPacket::Disconnect {
                    namespace: "/".to_string(),
                })
                .encode();
                // Best effort: the server drops the socket on its own anyway.
                let _ = sink.send(Message::Text(goodbye)).await;
                let _ = sink.close().await;
                return Ok("closed".to_string());
            }
            message = stream.next() => message,
        };

        let text = match message {
            None => return Ok("connection closed".to_string()),
            Some(Err(e)) => return Err(ChannelError::Connect(e.to_string())),
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(frame))) => {
                return Ok(frame
                    .map(|f| f.reason.to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "server closed connection".to_string()))
            }
            Some(Ok(_)) => continue,
        };

        trace!(packet = %text, "Socket packet");
        let packet = match EnginePacket::decode(&text) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(error = %e, "Ignoring undecodable packet");
                continue;
            }
        };

        match packet {
            EnginePacket::Open(handshake) => {
                debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "Engine open");
                sink.send(Message::Text(config.connect_packet()))
                    .await
                    .map_err(|e| ChannelError::Connect(e.to_string()))?;
            }
            EnginePacket::Ping => {
                sink.send(Message::Text(EnginePacket::Pong.encode()))
                    .await
                    .map_err(|e| ChannelError::Connect(e.to_string()))?;
            }
            EnginePacket::Close => return Ok("server closed session".to_string()),
            EnginePacket::Message(SocketPacket::Connect { .. }) => {
                info!(url = %config.url, "Live location channel connected");
                if events.send(ChannelEvent::Connected).is_err() {
                    return Ok("receiver dropped".to_string());
                }
            }
            EnginePacket::Message(SocketPacket::ConnectError { message, .. }) => {
                return Err(ChannelError::Protocol(message));
            }
            EnginePacket::Message(SocketPacket::Disconnect { .. }) => {
                return Ok("server disconnected namespace".to_string());
            }
            EnginePacket::Message(SocketPacket::Event { name, args, .. }) => {
                if name != config.event {
                    trace!(event = %name, "Ignoring unrelated event");
                    continue;
                }
                let Some(update) = args.first().and_then(location_from_arg) else {
                    debug!(event = %name, "Dropping malformed location payload");
                    continue;
                };
                if events.send(ChannelEvent::Position(update)).is_err() {
                    return Ok("receiver dropped".to_string());
                }
            }
            EnginePacket::Pong
            | EnginePacket::Upgrade
            | EnginePacket::Noop
            | EnginePacket::Message(SocketPacket::Ack { .. }) => {}
        }
    }
}

/// Some servers send the payload JSON-encoded as a string.
fn location_from_arg(arg: &Value) -> Option<LocationUpdate> {
    match arg {
        Value::String(raw) => serde_json::from_str::<Value>(raw)
            .ok()
            .and_then(|v| LocationUpdate::from_payload(&v)),
        other => LocationUpdate::from_payload(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_socket_url_strips_api_suffix() {
        assert_eq!(
            socket_url("https://ops.example.com/api").unwrap(),
            "wss://ops.example.com/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_url("http://localhost:3000/api/").unwrap(),
            "ws://localhost:3000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_url("http://localhost:3000").unwrap(),
            "ws://localhost:3000/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_url_keeps_inner_api_segments() {
        assert_eq!(
            socket_url("https://example.com/api/v2").unwrap(),
            "wss://example.com/api/v2/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_url_rejects_bad_input() {
        assert!(socket_url("example.com/api").is_err());
        assert!(socket_url("ftp://example.com").is_err());
        assert!(socket_url("https://").is_err());
    }

    #[test]
    fn test_connect_packet_carries_token() {
        let config = SocketIoConfig::new("ws://x").with_token(Some("abc".to_string()));
        assert_eq!(config.connect_packet(), r#"40{"token":"abc"}"#);
        assert_eq!(SocketIoConfig::new("ws://x").connect_packet(), "40");
    }

    #[test]
    fn test_location_from_string_arg() {
        let arg = Value::String(r#"{"driverId":4,"lat":24.1,"lng":46.2}"#.to_string());
        assert_eq!(location_from_arg(&arg).map(|u| u.driver_id), Some(4));
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_disconnect_until_closed() {
        let channel = SocketIoChannel::new(
            SocketIoConfig::new("ws://127.0.0.1:9/socket.io/?EIO=4&transport=websocket")
                .with_reconnect_delay(Duration::from_millis(100)),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        channel.open(tx.clone()).unwrap();
        assert_eq!(channel.open(tx), Err(ChannelError::AlreadyOpen));

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ChannelEvent::Disconnected { .. }));

        channel.close();
        channel.close();
        assert!(channel.is_closed());
    }
}
