//! In-memory channel transport for embedding the server and for tests.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::protocol::codec;
use crate::types::{Envelope, MupError, MupResult};

use super::{Frame, FrameTransport};

/// Server side of an in-memory connection.
pub struct ChannelTransport {
    inbound: mpsc::Receiver<String>,
    outbound: mpsc::Sender<String>,
    label: String,
}

/// Client side of an in-memory connection.
pub struct ChannelClient {
    outbound: mpsc::Sender<String>,
    inbound: mpsc::Receiver<String>,
}

/// Create a connected transport/client pair, each direction buffering
/// up to `buffer` frames.
pub fn channel_pair(buffer: usize) -> (ChannelTransport, ChannelClient) {
    let (to_server, server_rx) = mpsc::channel(buffer);
    let (to_client, client_rx) = mpsc::channel(buffer);
    (
        ChannelTransport {
            inbound: server_rx,
            outbound: to_client,
            label: "channel".to_string(),
        },
        ChannelClient {
            outbound: to_server,
            inbound: client_rx,
        },
    )
}

impl ChannelTransport {
    /// Override the peer label used in logs.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[async_trait]
impl FrameTransport for ChannelTransport {
    async fn receive(&mut self) -> MupResult<Option<Frame>> {
        Ok(self.inbound.recv().await.map(Frame::Text))
    }

    async fn send(&mut self, frame: String) -> MupResult<()> {
        self.outbound
            .send(frame)
            .await
            .map_err(|_| MupError::Transport("channel client dropped".to_string()))
    }

    fn peer(&self) -> String {
        self.label.clone()
    }
}

impl ChannelClient {
    /// Send a raw frame.
    pub async fn send(&self, frame: impl Into<String>) -> MupResult<()> {
        self.outbound
            .send(frame.into())
            .await
            .map_err(|_| MupError::Transport("channel server dropped".to_string()))
    }

    /// Encode and send an envelope.
    pub async fn send_envelope(&self, envelope: &Envelope) -> MupResult<()> {
        self.send(codec::encode(envelope)?).await
    }

    /// Next raw frame from the server; `None` once it has stopped.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Next frame, decoded.
    pub async fn recv_envelope(&mut self) -> MupResult<Option<Envelope>> {
        match self.recv().await {
            Some(frame) => codec::decode(&frame).map(Some),
            None => Ok(None),
        }
    }

    /// Close the client-to-server direction, ending the server loop.
    pub fn close(self) -> mpsc::Receiver<String> {
        self.inbound
    }
}
