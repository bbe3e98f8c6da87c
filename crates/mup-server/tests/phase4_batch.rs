//! Phase 4: Batch operation engine tests.

mod common;

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tokio_test::{assert_err, assert_ok};

use mup_components::{ComponentBuilder, ComponentRegistry};
use mup_server::batch::BatchEngine;
use mup_server::types::{
    error_codes, BatchRequest, ExecutionMode, MessageKind, OperationStatus,
};

use common::fixtures::{create_test_handler, negotiated, props_of, roundtrip};

fn request(value: serde_json::Value) -> BatchRequest {
    serde_json::from_value(value).unwrap()
}

fn engine_with_texts(ids: &[&str], limit: usize) -> (BatchEngine, Arc<Mutex<ComponentRegistry>>) {
    let mut registry = ComponentRegistry::new();
    for id in ids {
        registry.insert(ComponentBuilder::text(id, Default::default()));
    }
    let registry = Arc::new(Mutex::new(registry));
    (BatchEngine::new(registry.clone(), limit), registry)
}

#[tokio::test]
async fn test_sequential_batch_applies_in_order() {
    let (engine, registry) = engine_with_texts(&["t1"], 50);

    let summary = assert_ok!(
        engine
            .execute(request(json!({
                "operations": [
                    {"type": "component_update", "operation_id": "a", "component_id": "t1", "updates": {"content": "first"}},
                    {"type": "component_update", "operation_id": "b", "component_id": "t1", "updates": {"content": "second"}},
                    {"type": "event_binding", "operation_id": 3, "component_id": "t1", "events": {"on_click": {"handler": "h"}}}
                ]
            })))
            .await
    );

    assert_eq!(summary.execution_mode, ExecutionMode::Sequential);
    assert_eq!(summary.total_operations, 3);
    assert_eq!(summary.successful_operations, 3);
    assert_eq!(summary.batch_results[2].operation_id.as_deref(), Some("3"));
    assert_eq!(summary.batch_results[2].detail["events_bound"], 1);

    let registry = registry.lock().await;
    let t1 = registry.get("t1").unwrap();
    assert_eq!(t1.props["content"], "second");
    assert_eq!(t1.events["on_click"]["handler"], "h");
}

#[tokio::test]
async fn test_sequential_rollback_restores_pre_batch_state() {
    let (engine, registry) = engine_with_texts(&["t1", "t2"], 50);
    let before = registry.lock().await.snapshot();

    let err = assert_err!(
        engine
            .execute(request(json!({
                "rollback_on_error": true,
                "operations": [
                    {"type": "component_update", "operation_id": "op1", "component_id": "t1", "updates": {"content": "changed", "extra": 1}},
                    {"type": "event_binding", "operation_id": "op2", "component_id": "t2", "events": {"on_click": "x"}},
                    {"type": "component_create", "operation_id": "op3", "component": {"id": "t3", "type": "text"}},
                    {"type": "component_remove", "operation_id": "op4", "component_id": "t2"},
                    {"type": "component_update", "operation_id": "op5", "component_id": "ghost", "updates": {}}
                ]
            })))
            .await
    );

    assert_eq!(err.kind(), error_codes::BATCH_FAILED);
    assert!(err.to_string().contains("op5"));
    assert_eq!(registry.lock().await.snapshot(), before);
}

#[tokio::test]
async fn test_sequential_without_rollback_keeps_partial_results() {
    let (engine, registry) = engine_with_texts(&["t1"], 50);

    let summary = assert_ok!(
        engine
            .execute(request(json!({
                "operations": [
                    {"type": "component_update", "operation_id": "ok1", "component_id": "t1", "updates": {"content": "kept"}},
                    {"type": "component_update", "operation_id": "bad", "component_id": "ghost", "updates": {}},
                    {"type": "teleport", "operation_id": "weird", "component_id": "t1"},
                    {"type": "event_binding", "operation_id": "ok2", "component_id": "t1", "events": {"on_hover": "h"}}
                ]
            })))
            .await
    );

    assert_eq!(summary.total_operations, 4);
    assert_eq!(summary.successful_operations, 2);

    let statuses: Vec<_> = summary.batch_results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            OperationStatus::Success,
            OperationStatus::Error,
            OperationStatus::Error,
            OperationStatus::Success
        ]
    );
    assert_eq!(
        summary.batch_results[1].code.as_deref(),
        Some(error_codes::COMPONENT_NOT_FOUND)
    );
    assert_eq!(
        summary.batch_results[2].code.as_deref(),
        Some(error_codes::UNSUPPORTED_OPERATION)
    );
    assert_eq!(summary.batch_results[1].component_id.as_deref(), Some("ghost"));

    assert_eq!(registry.lock().await.get("t1").unwrap().props["content"], "kept");
}

#[tokio::test]
async fn test_rollback_keeps_edits_to_untouched_keys() {
    let (engine, registry) = engine_with_texts(&["t1"], 50);
    assert_eq!(registry.lock().await.get("t1").unwrap().props["variant"], "body");

    let summary = assert_ok!(
        engine
            .execute(request(json!({
                "operations": [
                    {"type": "component_update", "component_id": "t1", "updates": {"content": "temp"}}
                ]
            })))
            .await
    );
    assert_eq!(summary.successful_operations, 1);

    // A later failing batch only rolls back what it touched.
    let _ = engine
        .execute(request(json!({
            "rollback_on_error": true,
            "operations": [
                {"type": "component_update", "component_id": "t1", "updates": {"variant": "heading"}},
                {"type": "component_remove", "component_id": "ghost"}
            ]
        })))
        .await;

    let registry = registry.lock().await;
    let t1 = registry.get("t1").unwrap();
    assert_eq!(t1.props["content"], "temp");
    assert_eq!(t1.props["variant"], "body");
}

#[tokio::test]
async fn test_parallel_disjoint_batch_all_succeed() {
    let ids: Vec<String> = (0..20).map(|i| format!("t{i}")).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let (engine, registry) = engine_with_texts(&id_refs, 50);

    let operations: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "type": "component_update",
                "operation_id": format!("op{i}"),
                "component_id": id,
                "updates": {"content": format!("value {i}")}
            })
        })
        .collect();

    let summary = assert_ok!(
        engine
            .execute(request(json!({
                "execution_mode": "parallel",
                "rollback_on_error": true,
                "operations": operations
            })))
            .await
    );

    assert_eq!(summary.execution_mode, ExecutionMode::Parallel);
    assert_eq!(summary.total_operations, 20);
    assert_eq!(summary.successful_operations, 20);
    for (i, outcome) in summary.batch_results.iter().enumerate() {
        assert_eq!(outcome.operation_id.as_deref(), Some(format!("op{i}").as_str()));
    }

    let registry = registry.lock().await;
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(registry.get(id).unwrap().props["content"], format!("value {i}"));
    }
}

#[tokio::test]
async fn test_parallel_failure_does_not_abort_siblings_or_roll_back() {
    let (engine, registry) = engine_with_texts(&["t1", "t2"], 50);

    let summary = assert_ok!(
        engine
            .execute(request(json!({
                "execution_mode": "parallel",
                "rollback_on_error": true,
                "operations": [
                    {"type": "component_update", "operation_id": "p1", "component_id": "t1", "updates": {"content": "one"}},
                    {"type": "component_update", "operation_id": "p2", "component_id": "missing", "updates": {}},
                    {"type": "component_update", "operation_id": "p3", "component_id": "t2", "updates": {"content": "two"}}
                ]
            })))
            .await
    );

    assert_eq!(summary.total_operations, 3);
    assert_eq!(summary.successful_operations, 2);
    assert_eq!(summary.batch_results[1].status, OperationStatus::Error);

    let registry = registry.lock().await;
    assert_eq!(registry.get("t1").unwrap().props["content"], "one");
    assert_eq!(registry.get("t2").unwrap().props["content"], "two");
}

#[tokio::test]
async fn test_batch_limit_and_bad_descriptors() {
    let (engine, _registry) = engine_with_texts(&["t1"], 2);

    let err = assert_err!(
        engine
            .execute(request(json!({
                "operations": [
                    {"type": "component_remove", "component_id": "t1"},
                    {"type": "component_remove", "component_id": "t1"},
                    {"type": "component_remove", "component_id": "t1"}
                ]
            })))
            .await
    );
    assert_eq!(err.kind(), error_codes::INVALID_PARAMS);

    let summary = assert_ok!(
        engine
            .execute(request(json!({
                "operations": [
                    "not an object",
                    {"type": "component_update", "updates": {}}
                ]
            })))
            .await
    );
    assert_eq!(summary.successful_operations, 0);
    for outcome in &summary.batch_results {
        assert_eq!(outcome.code.as_deref(), Some(error_codes::INVALID_PARAMS));
    }
}

#[tokio::test]
async fn test_create_rejects_invalid_tree() {
    let (engine, registry) = engine_with_texts(&[], 50);

    let summary = assert_ok!(
        engine
            .execute(request(json!({
                "operations": [{
                    "type": "component_create",
                    "operation_id": "dup",
                    "component": {
                        "id": "box",
                        "type": "container",
                        "children": [
                            {"id": "same", "type": "text"},
                            {"id": "same", "type": "text"}
                        ]
                    }
                }]
            })))
            .await
    );
    assert_eq!(summary.batch_results[0].code.as_deref(), Some(error_codes::INVALID_PARAMS));
    assert!(registry.lock().await.is_empty());
}

#[tokio::test]
async fn test_batch_over_protocol() {
    let handler = create_test_handler();
    let (mut state, _) = negotiated(&handler, "ops").await;

    let reply = roundtrip(
        &handler,
        &mut state,
        MessageKind::BatchOperation,
        json!({
            "operations": [
                {"type": "component_update", "operation_id": "u1", "component_id": "sample_form", "updates": {"layout": "horizontal"}}
            ]
        }),
    )
    .await;
    assert_eq!(reply.kind(), MessageKind::ComponentUpdate);
    assert_eq!(reply.payload()["execution_mode"], "sequential");
    assert_eq!(reply.payload()["successful_operations"], 1);
    assert_eq!(props_of(&handler, "sample_form").await["layout"], "horizontal");

    let failed = roundtrip(
        &handler,
        &mut state,
        MessageKind::BatchOperation,
        json!({
            "rollback_on_error": true,
            "operations": [
                {"type": "component_update", "component_id": "sample_form", "updates": {"layout": "grid"}},
                {"type": "component_update", "component_id": "nope", "updates": {}}
            ]
        }),
    )
    .await;
    assert_eq!(failed.kind(), MessageKind::Error);
    assert_eq!(failed.str_field("code"), Some(error_codes::BATCH_FAILED));
    assert_eq!(props_of(&handler, "sample_form").await["layout"], "horizontal");

    let bad_mode = roundtrip(
        &handler,
        &mut state,
        MessageKind::BatchOperation,
        json!({"execution_mode": "sideways", "operations": []}),
    )
    .await;
    assert_eq!(bad_mode.str_field("code"), Some(error_codes::INVALID_PARAMS));
}
