//! Concurrent clients: many WebSocket sessions sharing one registry.
//!
//! Tests verify that simultaneous batches and events from separate
//! connections all land, that same-id updates serialize cleanly, and that
//! sessions are isolated from each other.

mod common;

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Barrier;

use mup_server::types::MessageKind;

use common::{handshake, request, TestServer};

// ─── Tests ─────────────────────────────────────────────────────────────────

/// Each client creates its own components; none are lost.
#[tokio::test]
async fn test_concurrent_creates_from_many_clients() {
    let server = Arc::new(TestServer::start_default().await);
    let clients = 10;
    let barrier = Arc::new(Barrier::new(clients));
    let mut handles = vec![];

    for n in 0..clients {
        let server = server.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            let mut socket = server.connect().await;
            handshake(&mut socket, &format!("agent{n}")).await;
            barrier.wait().await;

            let operations: Vec<_> = (0..5)
                .map(|i| {
                    json!({
                        "type": "component_create",
                        "operation_id": format!("{n}-{i}"),
                        "component": {"id": format!("c{n}_{i}"), "type": "text"}
                    })
                })
                .collect();
            let reply = request(
                &mut socket,
                MessageKind::BatchOperation,
                json!({"execution_mode": "parallel", "operations": operations}),
            )
            .await;
            assert_eq!(reply.payload()["successful_operations"], 5);
            n
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let registry = server.handler.context().registry.lock().await;
    assert_eq!(registry.len(), 2 + clients * 5);
}

/// Updates to the same component from different clients never tear.
#[tokio::test]
async fn test_same_component_updates_serialize() {
    let server = Arc::new(TestServer::start_default().await);
    let mut handles = vec![];

    for n in 0..8u32 {
        let server = server.clone();
        handles.push(tokio::spawn(async move {
            let mut socket = server.connect().await;
            handshake(&mut socket, &format!("writer{n}")).await;
            for round in 0..10u32 {
                let reply = request(
                    &mut socket,
                    MessageKind::BatchOperation,
                    json!({
                        "operations": [{
                            "type": "component_update",
                            "component_id": "sample_table",
                            "updates": {"last_writer": n, "round": round, (format!("w{n}")): round}
                        }]
                    }),
                )
                .await;
                assert_eq!(reply.payload()["successful_operations"], 1);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let registry = server.handler.context().registry.lock().await;
    let props = &registry.get("sample_table").unwrap().props;
    for n in 0..8 {
        assert_eq!(props[&format!("w{n}")], 9, "writer {n} should have finished");
    }
    assert_eq!(props["round"], 9);
}

/// Context transfers and auth on one session do not leak into another.
#[tokio::test]
async fn test_sessions_are_isolated() {
    let server = TestServer::start_default().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    let alice_id = handshake(&mut alice, "alice").await;
    let bob_id = handshake(&mut bob, "bob").await;

    request(
        &mut alice,
        MessageKind::ContextTransfer,
        json!({"context": {"cart": ["sku-1"]}}),
    )
    .await;
    request(
        &mut alice,
        MessageKind::AuthRequest,
        json!({"auth_method": "oauth2", "token": "t"}),
    )
    .await;

    let sessions = &server.handler.context().sessions;
    let bob_session = sessions.session(&bob_id).await.unwrap();
    assert!(bob_session.negotiated_context.get("cart").is_none());
    assert!(!sessions.security_context(&bob_id).await.unwrap().is_authenticated());
    assert!(sessions.security_context(&alice_id).await.unwrap().is_authenticated());

    let status = request(
        &mut bob,
        MessageKind::CapabilityQuery,
        json!({"query_type": "server_status"}),
    )
    .await;
    assert_eq!(status.payload()["active_sessions"], 2);
}
