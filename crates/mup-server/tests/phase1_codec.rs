//! Phase 1: Envelope codec and error type tests.

use proptest::prelude::*;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use mup_server::protocol::codec;
use mup_server::types::*;

fn wire(frame: &str) -> Value {
    serde_json::from_str(frame).unwrap()
}

#[test]
fn test_encode_wraps_in_mup_key() {
    let env = Envelope::from_value(MessageKind::CapabilityQuery, json!({"query_type": "x"}));
    let value = wire(&codec::encode(&env).unwrap());

    let inner = &value["mup"];
    assert_eq!(inner["version"], PROTOCOL_VERSION);
    assert_eq!(inner["message_type"], "capability_query");
    assert_eq!(inner["message_id"], env.message_id());
    assert_eq!(inner["payload"]["query_type"], "x");
    assert!(inner.get("correlation_id").is_none());

    let ts = inner["timestamp"].as_str().unwrap();
    assert!(ts.ends_with('Z'), "timestamp {ts} should be UTC with Z suffix");
}

#[test]
fn test_message_ids_are_unique() {
    let a = Envelope::new(MessageKind::Request, Default::default());
    let b = Envelope::new(MessageKind::Request, Default::default());
    assert_ne!(a.message_id(), b.message_id());
    assert!(a.message_id().starts_with("msg_"));
}

#[test]
fn test_reply_carries_correlation_id() {
    let req = Envelope::from_value(MessageKind::HandshakeRequest, json!({}));
    let reply = Envelope::reply(&req, MessageKind::HandshakeResponse, Default::default());
    assert_eq!(reply.correlation_id(), Some(req.message_id()));

    let value = wire(&codec::encode(&reply).unwrap());
    assert_eq!(value["mup"]["correlation_id"], req.message_id());
}

#[test]
fn test_decode_full_envelope() {
    let frame = json!({
        "mup": {
            "version": "2.0.0",
            "message_type": "event_notification",
            "message_id": "msg_abc",
            "timestamp": "2024-01-01T12:00:00.000Z",
            "correlation_id": "msg_prev",
            "payload": {"handler": "handle_row_selection", "row_index": 2}
        }
    })
    .to_string();

    let env = assert_ok!(codec::decode(&frame));
    assert_eq!(env.kind(), MessageKind::EventNotification);
    assert_eq!(env.message_id(), "msg_abc");
    assert_eq!(env.correlation_id(), Some("msg_prev"));
    assert_eq!(env.str_field("handler"), Some("handle_row_selection"));
    assert_eq!(env.timestamp().to_rfc3339(), "2024-01-01T12:00:00+00:00");
}

#[test]
fn test_decode_fills_missing_header_fields() {
    let frame = r#"{"mup": {"message_type": "handshake_request"}}"#;
    let env = assert_ok!(codec::decode(frame));
    assert_eq!(env.version(), PROTOCOL_VERSION);
    assert!(env.message_id().starts_with("msg_"));
    assert!(env.payload().is_empty());
}

#[test]
fn test_decode_rejects_invalid_json() {
    let err = assert_err!(codec::decode("{not json"));
    assert_eq!(err.kind(), error_codes::MALFORMED_MESSAGE);
}

#[test]
fn test_decode_rejects_missing_wrapper() {
    let err = assert_err!(codec::decode(r#"{"message_type": "handshake_request"}"#));
    assert_eq!(err.kind(), error_codes::MALFORMED_MESSAGE);
    assert!(err.to_string().contains("mup"));
}

#[test]
fn test_decode_rejects_non_object_frames() {
    for frame in ["[]", "42", "\"mup\"", r#"{"mup": []}"#] {
        let err = assert_err!(codec::decode(frame));
        assert_eq!(err.kind(), error_codes::MALFORMED_MESSAGE, "frame {frame}");
    }
}

#[test]
fn test_decode_rejects_unknown_message_type() {
    let err = assert_err!(codec::decode(r#"{"mup": {"message_type": "teleport"}}"#));
    assert_eq!(err.kind(), error_codes::MALFORMED_MESSAGE);
    assert!(err.to_string().contains("teleport"));
}

#[test]
fn test_decode_rejects_bad_payload_and_timestamp() {
    let bad_payload = r#"{"mup": {"message_type": "request", "payload": [1, 2]}}"#;
    assert_err!(codec::decode(bad_payload));

    let bad_ts = r#"{"mup": {"message_type": "request", "timestamp": "yesterday"}}"#;
    assert_err!(codec::decode(bad_ts));

    let bad_id = r#"{"mup": {"message_type": "request", "message_id": 7}}"#;
    assert_err!(codec::decode(bad_id));
}

#[test]
fn test_decode_bytes_requires_utf8() {
    let frame = br#"{"mup": {"message_type": "state_sync"}}"#;
    let env = assert_ok!(codec::decode_bytes(frame));
    assert_eq!(env.kind(), MessageKind::StateSync);

    let err = assert_err!(codec::decode_bytes(&[0xff, 0xfe, 0x00]));
    assert_eq!(err.kind(), error_codes::MALFORMED_MESSAGE);
}

#[test]
fn test_every_kind_has_a_wire_name() {
    for kind in MessageKind::ALL {
        assert_eq!(MessageKind::from_name(kind.as_str()), Some(kind));
    }
    assert_eq!(MessageKind::from_name("HANDSHAKE_REQUEST"), None);
}

#[test]
fn test_error_envelope_payload() {
    let err = MupError::UnknownHandler("handle_nothing".to_string());
    let env = err.to_envelope(Some("msg_1".to_string()));
    assert_eq!(env.kind(), MessageKind::Error);
    assert_eq!(env.correlation_id(), Some("msg_1"));
    assert_eq!(env.str_field("code"), Some("unknown_handler"));
    assert!(env.str_field("error").unwrap().contains("handle_nothing"));
}

#[test]
fn test_component_errors_convert() {
    let err: MupError = mup_components::ComponentError::NotFound("x".to_string()).into();
    assert_eq!(err.kind(), error_codes::COMPONENT_NOT_FOUND);

    let err: MupError = mup_components::ComponentError::InvalidTree("dup".to_string()).into();
    assert_eq!(err.kind(), error_codes::INVALID_PARAMS);
}

fn payload_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z0-9 ]{0,12}".prop_map(Value::String),
    ];
    let nested = leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    });
    prop::collection::btree_map("[a-z_]{1,8}", nested, 0..5)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(
        kind_index in 0usize..MessageKind::ALL.len(),
        payload in payload_strategy(),
        correlated in any::<bool>(),
    ) {
        let kind = MessageKind::ALL[kind_index];
        let mut env = Envelope::from_value(kind, payload);
        if correlated {
            env = env.correlated(Some("msg_origin".to_string()));
        }

        let decoded = codec::decode(&codec::encode(&env).unwrap()).unwrap();
        prop_assert_eq!(decoded.kind(), env.kind());
        prop_assert_eq!(decoded.version(), env.version());
        prop_assert_eq!(decoded.message_id(), env.message_id());
        prop_assert_eq!(decoded.correlation_id(), env.correlation_id());
        prop_assert_eq!(decoded.payload(), env.payload());
    }
}
