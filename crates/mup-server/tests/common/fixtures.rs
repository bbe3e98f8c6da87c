//! Test fixtures for MUP server tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};

use mup_server::config::ServerConfig;
use mup_server::context::ServerContext;
use mup_server::handlers::DispatchTable;
use mup_server::protocol::{ConnectionState, ProtocolHandler};
use mup_server::transport::ConnectionId;
use mup_server::types::{Envelope, MessageKind};

/// Default config with the sample form and table registered.
pub fn test_config() -> ServerConfig {
    ServerConfig::default()
}

/// Default config with an empty registry.
pub fn empty_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.server.seed_sample_components = false;
    config
}

/// Protocol handler over a fresh context with the built-in handlers.
pub fn create_test_handler() -> ProtocolHandler {
    ProtocolHandler::new(Arc::new(ServerContext::new(&test_config())))
}

/// Protocol handler with an empty registry.
pub fn create_empty_handler() -> ProtocolHandler {
    ProtocolHandler::new(Arc::new(ServerContext::new(&empty_config())))
}

/// Protocol handler with a custom dispatch table.
pub fn create_handler_with(dispatch: DispatchTable) -> ProtocolHandler {
    ProtocolHandler::new(Arc::new(ServerContext::with_dispatch(
        &empty_config(),
        dispatch,
    )))
}

/// Envelope built from a JSON payload literal.
pub fn envelope(kind: MessageKind, payload: Value) -> Envelope {
    Envelope::from_value(kind, payload)
}

/// A handshake request for `user_id`.
pub fn handshake_request(user_id: &str) -> Envelope {
    envelope(
        MessageKind::HandshakeRequest,
        json!({
            "client_info": {
                "name": "Test Client",
                "version": "1.0.0",
                "capabilities": {
                    "rendering_targets": ["web"],
                    "supported_events": ["click", "change", "submit"],
                    "max_component_depth": 10
                }
            },
            "context": {"user_id": user_id, "theme": "dark"}
        }),
    )
}

/// Open a connection and complete the handshake. Returns the connection
/// state and the allocated client id.
pub async fn negotiated(handler: &ProtocolHandler, user_id: &str) -> (ConnectionState, String) {
    let mut state = ConnectionState::new(ConnectionId::next());
    let reply = handler
        .handle_envelope(&mut state, handshake_request(user_id))
        .await
        .expect("handshake reply");
    assert_eq!(reply.kind(), MessageKind::HandshakeResponse);
    let client_id = reply
        .str_field("client_id")
        .expect("client_id in handshake response")
        .to_string();
    (state, client_id)
}

/// Send one envelope on a negotiated connection and return the reply.
pub async fn roundtrip(
    handler: &ProtocolHandler,
    state: &mut ConnectionState,
    kind: MessageKind,
    payload: Value,
) -> Envelope {
    handler
        .handle_envelope(state, envelope(kind, payload))
        .await
        .expect("reply envelope")
}

/// Props of a registered component.
pub async fn props_of(handler: &ProtocolHandler, id: &str) -> serde_json::Map<String, Value> {
    handler
        .context()
        .registry
        .lock()
        .await
        .get(id)
        .map(|c| c.props.clone())
        .expect("component registered")
}
