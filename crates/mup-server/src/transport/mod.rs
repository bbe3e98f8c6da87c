//! Transport layer: frame transports feeding the protocol handler.

pub mod channel;
#[cfg(feature = "stdio")]
pub mod stdio;
#[cfg(feature = "ws")]
pub mod ws;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::types::MupResult;

pub use channel::{channel_pair, ChannelClient, ChannelTransport};
#[cfg(feature = "stdio")]
pub use stdio::{LineTransport, StdioTransport};
#[cfg(feature = "ws")]
pub use ws::WebSocketTransport;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate the next id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One inbound frame as it came off the wire.
///
/// Binary frames are decoded strictly as UTF-8 JSON by the protocol handler,
/// so invalid bytes surface as a malformed-message reply rather than being
/// replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Whitespace-only frames carry no envelope and are skipped.
    pub fn is_blank(&self) -> bool {
        match self {
            Frame::Text(text) => text.trim().is_empty(),
            Frame::Binary(bytes) => bytes.iter().all(u8::is_ascii_whitespace),
        }
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Frame::Text(text)
    }
}

/// One bidirectional stream of frames.
#[async_trait]
pub trait FrameTransport: Send {
    /// Next inbound frame; `None` once the peer has closed.
    async fn receive(&mut self) -> MupResult<Option<Frame>>;

    /// Send one outbound frame.
    async fn send(&mut self, frame: String) -> MupResult<()>;

    /// Human-readable peer description for logs.
    fn peer(&self) -> String;
}
