//! Shared helpers: a live WebSocket server and a minimal MUP client.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use mup_server::config::ServerConfig;
use mup_server::context::ServerContext;
use mup_server::protocol::{codec, ProtocolHandler};
use mup_server::transport::WebSocketTransport;
use mup_server::types::{Envelope, MessageKind};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub handler: ProtocolHandler,
}

impl TestServer {
    pub async fn start(config: ServerConfig) -> Self {
        let handler = ProtocolHandler::new(Arc::new(ServerContext::new(&config)));
        let transport = WebSocketTransport::new(handler.clone(), config.server.path.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { transport.serve(listener).await });
        Self { addr, handler }
    }

    pub async fn start_default() -> Self {
        Self::start(ServerConfig::default()).await
    }

    pub fn url(&self) -> String {
        format!("ws://{}/mup", self.addr)
    }

    pub async fn connect(&self) -> Socket {
        let (socket, _) = connect_async(self.url()).await.expect("websocket connect");
        socket
    }

    /// Poll until the server reports `expected` live sessions.
    pub async fn wait_for_sessions(&self, expected: usize) {
        for _ in 0..200 {
            if self.handler.context().sessions.active_sessions().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("server never reached {expected} active sessions");
    }
}

pub async fn send(socket: &mut Socket, kind: MessageKind, payload: Value) -> String {
    let envelope = Envelope::from_value(kind, payload);
    let id = envelope.message_id().to_string();
    let frame = codec::encode(&envelope).expect("encode");
    socket.send(Message::Text(frame)).await.expect("send");
    id
}

pub async fn recv(socket: &mut Socket) -> Envelope {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("reply within 5s")
            .expect("socket open")
            .expect("frame");
        match message {
            Message::Text(text) => return codec::decode(&text).expect("decodable reply"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

pub async fn request(socket: &mut Socket, kind: MessageKind, payload: Value) -> Envelope {
    let id = send(socket, kind, payload).await;
    let reply = recv(socket).await;
    assert_eq!(reply.correlation_id(), Some(id.as_str()));
    reply
}

/// Handshake and return the client id.
pub async fn handshake(socket: &mut Socket, user: &str) -> String {
    let reply = request(
        socket,
        MessageKind::HandshakeRequest,
        json!({
            "client_info": {"name": "bridge", "version": "1.0.0"},
            "context": {"user_id": user}
        }),
    )
    .await;
    assert_eq!(reply.kind(), MessageKind::HandshakeResponse);
    reply.str_field("client_id").expect("client_id").to_string()
}
