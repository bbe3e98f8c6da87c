//! The MUP envelope: one protocol message in either direction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mup_components::Map;

/// Protocol version this server speaks.
pub const PROTOCOL_VERSION: &str = "2.0.0";

/// Top-level key wrapping every envelope on the wire.
pub const PROTOCOL_WRAPPER_KEY: &str = "mup";

/// Closed set of message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Client opens a session.
    HandshakeRequest,
    /// Server accepts a session.
    HandshakeResponse,
    /// Client asks about server capabilities.
    CapabilityQuery,
    /// Answer to a capability query.
    CapabilityResponse,
    /// Client presents credentials.
    AuthRequest,
    /// Answer to an auth request.
    AuthResponse,
    /// Server pushes component changes or handler results.
    ComponentUpdate,
    /// Client reports a UI event.
    EventNotification,
    /// Client submits a batch of registry operations.
    BatchOperation,
    /// Registry state snapshot.
    StateSync,
    /// Client hands over session context.
    ContextTransfer,
    /// Error report.
    Error,
    /// Generic request.
    Request,
}

impl MessageKind {
    /// Every kind, in declaration order.
    pub const ALL: [MessageKind; 13] = [
        MessageKind::HandshakeRequest,
        MessageKind::HandshakeResponse,
        MessageKind::CapabilityQuery,
        MessageKind::CapabilityResponse,
        MessageKind::AuthRequest,
        MessageKind::AuthResponse,
        MessageKind::ComponentUpdate,
        MessageKind::EventNotification,
        MessageKind::BatchOperation,
        MessageKind::StateSync,
        MessageKind::ContextTransfer,
        MessageKind::Error,
        MessageKind::Request,
    ];

    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::HandshakeRequest => "handshake_request",
            MessageKind::HandshakeResponse => "handshake_response",
            MessageKind::CapabilityQuery => "capability_query",
            MessageKind::CapabilityResponse => "capability_response",
            MessageKind::AuthRequest => "auth_request",
            MessageKind::AuthResponse => "auth_response",
            MessageKind::ComponentUpdate => "component_update",
            MessageKind::EventNotification => "event_notification",
            MessageKind::BatchOperation => "batch_operation",
            MessageKind::StateSync => "state_sync",
            MessageKind::ContextTransfer => "context_transfer",
            MessageKind::Error => "error",
            MessageKind::Request => "request",
        }
    }

    /// Parse a wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate a process-unique message id.
pub fn new_message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4().simple())
}

/// An immutable protocol message.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    version: String,
    kind: MessageKind,
    message_id: String,
    timestamp: DateTime<Utc>,
    correlation_id: Option<String>,
    payload: Map,
}

impl Envelope {
    /// Build a fresh outbound envelope with a new id and the current time.
    pub fn new(kind: MessageKind, payload: Map) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            kind,
            message_id: new_message_id(),
            timestamp: Utc::now(),
            correlation_id: None,
            payload,
        }
    }

    /// Build a reply to `request`, correlated by its message id.
    pub fn reply(request: &Envelope, kind: MessageKind, payload: Map) -> Self {
        Self::new(kind, payload).correlated(Some(request.message_id.clone()))
    }

    /// Build from a JSON value; non-object payloads become empty.
    pub fn from_value(kind: MessageKind, payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(kind, payload)
    }

    /// Assemble an envelope from already-validated parts.
    pub fn from_parts(
        version: String,
        kind: MessageKind,
        message_id: String,
        timestamp: DateTime<Utc>,
        correlation_id: Option<String>,
        payload: Map,
    ) -> Self {
        Self {
            version,
            kind,
            message_id,
            timestamp,
            correlation_id,
            payload,
        }
    }

    /// Copy of this envelope with a different correlation id.
    pub fn correlated(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Protocol version declared by the sender.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Message kind.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Unique message id.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Time the envelope was built or, for decoded envelopes, sent.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Id of the message this one answers.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Kind-specific payload.
    pub fn payload(&self) -> &Map {
        &self.payload
    }

    /// Payload field by name.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Payload field as a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Deserialize the payload into a typed request.
    pub fn parse_payload<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.payload.clone()))
    }

    /// Consume the envelope, returning its payload.
    pub fn into_payload(self) -> Map {
        self.payload
    }
}
