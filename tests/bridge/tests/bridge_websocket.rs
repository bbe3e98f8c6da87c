//! WebSocket transport end to end: framing, limits and disconnect cleanup.

mod common;

use std::time::Duration;

use futures::SinkExt;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use mup_server::config::ServerConfig;
use mup_server::protocol::codec;
use mup_server::types::{Envelope, MessageKind};

use common::{handshake, recv, request, TestServer};

#[tokio::test]
async fn test_handshake_and_query_over_websocket() {
    let server = TestServer::start_default().await;
    let mut socket = server.connect().await;

    let client_id = handshake(&mut socket, "ws-user").await;
    assert!(client_id.starts_with("client_"));

    let reply = request(
        &mut socket,
        MessageKind::CapabilityQuery,
        json!({"query_type": "component_availability", "filters": {"component_type": "data_table"}}),
    )
    .await;
    assert_eq!(reply.kind(), MessageKind::CapabilityResponse);
    assert_eq!(reply.payload()["total_count"], 1);
}

#[tokio::test]
async fn test_binary_frames_are_accepted() {
    let server = TestServer::start_default().await;
    let mut socket = server.connect().await;
    handshake(&mut socket, "binary").await;

    let frame = codec::encode(&Envelope::from_value(MessageKind::StateSync, json!({}))).unwrap();
    socket.send(Message::Binary(frame.into_bytes())).await.unwrap();
    let reply = recv(&mut socket).await;
    assert_eq!(reply.kind(), MessageKind::StateSync);
    assert_eq!(reply.payload()["total_count"], 2);
}

#[tokio::test]
async fn test_binary_frame_with_invalid_utf8_is_rejected() {
    let server = TestServer::start_default().await;
    let mut socket = server.connect().await;
    handshake(&mut socket, "bytes").await;

    let frame = codec::encode(&Envelope::from_value(
        MessageKind::EventNotification,
        json!({"handler": "h#"}),
    ))
    .unwrap();
    let mut bytes = frame.into_bytes();
    let at = bytes.iter().position(|b| *b == b'#').unwrap();
    bytes[at] = 0xff;

    socket.send(Message::Binary(bytes)).await.unwrap();
    let reply = recv(&mut socket).await;
    assert_eq!(reply.kind(), MessageKind::Error);
    assert_eq!(reply.str_field("code"), Some("malformed_message"));

    // The session survives the bad frame.
    let sync = request(&mut socket, MessageKind::StateSync, json!({})).await;
    assert_eq!(sync.kind(), MessageKind::StateSync);
    server.wait_for_sessions(1).await;
}

#[tokio::test]
async fn test_malformed_text_frame_gets_error_reply() {
    let server = TestServer::start_default().await;
    let mut socket = server.connect().await;

    socket
        .send(Message::Text("definitely not an envelope".to_string()))
        .await
        .unwrap();
    let reply = recv(&mut socket).await;
    assert_eq!(reply.kind(), MessageKind::Error);
    assert_eq!(reply.str_field("code"), Some("malformed_message"));

    // Still open and usable.
    handshake(&mut socket, "recovered").await;
}

#[tokio::test]
async fn test_close_removes_session() {
    let server = TestServer::start_default().await;
    let mut socket = server.connect().await;
    let client_id = handshake(&mut socket, "leaver").await;
    server.wait_for_sessions(1).await;

    socket.close(None).await.unwrap();
    server.wait_for_sessions(0).await;
    assert!(!server.handler.context().sessions.is_live(&client_id).await);
}

#[tokio::test]
async fn test_connections_over_limit_get_503() {
    let mut config = ServerConfig::default();
    config.performance.max_concurrent_clients = 1;
    let server = TestServer::start(config).await;

    let mut first = server.connect().await;
    handshake(&mut first, "holder").await;

    match connect_async(server.url()).await {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 503),
        Err(other) => panic!("expected HTTP 503, got {other}"),
        Ok(_) => panic!("second connection should be refused"),
    }

    first.close(None).await.unwrap();
    server.wait_for_sessions(0).await;

    // The permit is released once the first connection's task ends.
    let mut admitted = None;
    for _ in 0..100 {
        if let Ok((socket, _)) = connect_async(server.url()).await {
            admitted = Some(socket);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let mut socket = admitted.expect("connection admitted after the first closed");
    handshake(&mut socket, "next").await;
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start_default().await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut body = String::new();
    stream.read_to_string(&mut body).await.unwrap();
    assert!(body.starts_with("HTTP/1.1 200"), "unexpected response: {body}");
    assert!(body.ends_with("ok"));
}
