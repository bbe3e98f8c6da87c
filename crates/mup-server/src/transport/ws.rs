//! WebSocket transport: the primary MUP transport, served by axum.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;

use crate::protocol::ProtocolHandler;
use crate::types::{MupError, MupResult};

use super::{Frame, FrameTransport};

#[derive(Clone)]
struct WsState {
    handler: ProtocolHandler,
    permits: Arc<Semaphore>,
}

/// WebSocket listener. Each upgraded socket becomes one MUP connection.
pub struct WebSocketTransport {
    handler: ProtocolHandler,
    path: String,
    permits: Arc<Semaphore>,
}

impl WebSocketTransport {
    /// Serve MUP on `path`, admitting at most `max_concurrent_clients`
    /// sockets at once.
    pub fn new(handler: ProtocolHandler, path: impl Into<String>) -> Self {
        let limit = handler
            .context()
            .capabilities
            .performance_limits
            .max_concurrent_clients
            .max(1);
        Self {
            handler,
            path: path.into(),
            permits: Arc::new(Semaphore::new(limit)),
        }
    }

    /// The axum router: MUP upgrade route plus `/health`.
    pub fn router(&self) -> Router {
        let state = WsState {
            handler: self.handler.clone(),
            permits: self.permits.clone(),
        };
        Router::new()
            .route(&self.path, get(upgrade))
            .route("/health", get(|| async { "ok" }))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind `addr` and serve until the process stops.
    pub async fn run(&self, addr: SocketAddr) -> MupResult<()> {
        let listener = TcpListener::bind(addr).await.map_err(MupError::Io)?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> MupResult<()> {
        let local = listener.local_addr().map_err(MupError::Io)?;
        tracing::info!("WebSocket transport listening on ws://{local}{}", self.path);

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| MupError::Transport(e.to_string()))
    }
}

async fn upgrade(
    State(state): State<WsState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    let permit = match state.permits.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!("Refusing {peer}: client limit reached");
            return (StatusCode::SERVICE_UNAVAILABLE, "client limit reached").into_response();
        }
    };

    ws.on_upgrade(move |socket| async move {
        let _permit = permit;
        let frames = WsFrames { socket, peer };
        if let Err(e) = state.handler.serve(frames).await {
            tracing::warn!("WebSocket connection from {peer} ended with error: {e}");
        }
    })
}

struct WsFrames {
    socket: WebSocket,
    peer: SocketAddr,
}

#[async_trait]
impl FrameTransport for WsFrames {
    async fn receive(&mut self) -> MupResult<Option<Frame>> {
        loop {
            let message = match self.socket.recv().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(MupError::Transport(e.to_string())),
                None => return Ok(None),
            };
            match message {
                Message::Text(text) => return Ok(Some(Frame::Text(text))),
                Message::Binary(bytes) => return Ok(Some(Frame::Binary(bytes))),
                Message::Close(_) => return Ok(None),
                // Pings are answered by the websocket stack.
                Message::Ping(_) | Message::Pong(_) => continue,
            }
        }
    }

    async fn send(&mut self, frame: String) -> MupResult<()> {
        self.socket
            .send(Message::Text(frame))
            .await
            .map_err(|e| MupError::Transport(e.to_string()))
    }

    fn peer(&self) -> String {
        self.peer.to_string()
    }
}
