//! Live-location push channel.
//!
//! A channel is opened once with an event sender and pushes
//! [`ChannelEvent`]s until [`close`](LiveLocationChannel::close) is called.
//! Connection state changes travel on the same stream as positions, so a
//! consumer never has to poll the channel.

mod codec;
mod manual;
mod socketio;

use thiserror::Error;
use tokio::sync::mpsc;

use super::model::LocationUpdate;

pub use codec::{EnginePacket, OpenHandshake, SocketPacket};
pub use manual::ManualChannel;
pub use socketio::{
    socket_url, SocketIoChannel, SocketIoConfig, DEFAULT_LOCATION_EVENT, DEFAULT_RECONNECT_DELAY,
};

/// Sender half handed to [`LiveLocationChannel::open`].
pub type EventSender = mpsc::UnboundedSender<ChannelEvent>;

/// Something that happened on the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Disconnected { reason: String },
    Position(LocationUpdate),
}

/// Connection state as last reported by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
    Closed,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Live",
            ConnectionState::Disconnected => "Reconnecting",
            ConnectionState::Closed => "Closed",
        }
    }
}

/// Errors from the push channel.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChannelError {
    #[error("invalid socket URL: {0}")]
    InvalidUrl(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("channel already opened")]
    AlreadyOpen,

    #[error("channel closed")]
    Closed,
}

/// A source of live driver positions.
pub trait LiveLocationChannel: Send + Sync {
    /// Start delivering events to `events`.
    ///
    /// A channel can be opened once. Opening after [`close`](Self::close)
    /// fails with [`ChannelError::Closed`].
    fn open(&self, events: EventSender) -> Result<(), ChannelError>;

    /// Stop delivering events and release the connection. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;
}
