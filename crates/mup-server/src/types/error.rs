//! Error taxonomy of the session engine and its conversion to error envelopes.

use serde_json::{json, Value};
use thiserror::Error;

use mup_components::ComponentError;

use super::message::{Envelope, MessageKind};

/// Stable snake_case error codes carried in error payloads.
pub mod error_codes {
    /// Frame could not be decoded into an envelope.
    pub const MALFORMED_MESSAGE: &str = "malformed_message";
    /// Message arrived out of negotiated order.
    pub const PROTOCOL_SEQUENCE: &str = "protocol_sequence_error";
    /// Unknown capability query type.
    pub const UNSUPPORTED_QUERY: &str = "unsupported_query";
    /// Unknown batch operation type.
    pub const UNSUPPORTED_OPERATION: &str = "unsupported_operation";
    /// Event names a handler that is not registered.
    pub const UNKNOWN_HANDLER: &str = "unknown_handler";
    /// Registry miss.
    pub const COMPONENT_NOT_FOUND: &str = "component_not_found";
    /// Sequential batch aborted and rolled back.
    pub const BATCH_FAILED: &str = "batch_failed";
    /// Payload fields missing or of the wrong shape.
    pub const INVALID_PARAMS: &str = "invalid_params";
    /// Event handler raised an error.
    pub const HANDLER_FAILED: &str = "handler_failed";
    /// Transport failure.
    pub const TRANSPORT: &str = "transport_error";
    /// Configuration could not be loaded.
    pub const CONFIG: &str = "config_error";
    /// Anything else.
    pub const INTERNAL: &str = "internal_error";
}

/// Errors reachable while handling one inbound message.
#[derive(Debug, Error)]
pub enum MupError {
    /// Codec-level failure.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Message kind not acceptable in the current session phase.
    #[error("Protocol sequence error: {0}")]
    ProtocolSequence(String),

    /// Capability query type not recognised.
    #[error("Unsupported query type: {0}")]
    UnsupportedQuery(String),

    /// Batch operation type not recognised.
    #[error("Unsupported operation type: {0}")]
    UnsupportedOperation(String),

    /// No handler registered under this name.
    #[error("Unknown event handler: {0}")]
    UnknownHandler(String),

    /// Component id not in the registry.
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    /// Sequential batch failed and was rolled back.
    #[error("Batch operation failed and was rolled back: {0}")]
    BatchFailed(String),

    /// Payload is missing fields or has the wrong shape.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// An event handler failed.
    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    /// Transport-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration file unreadable or invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error outside payload parsing.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate.
pub type MupResult<T> = Result<T, MupError>;

impl MupError {
    /// Stable code for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            MupError::MalformedMessage(_) => error_codes::MALFORMED_MESSAGE,
            MupError::ProtocolSequence(_) => error_codes::PROTOCOL_SEQUENCE,
            MupError::UnsupportedQuery(_) => error_codes::UNSUPPORTED_QUERY,
            MupError::UnsupportedOperation(_) => error_codes::UNSUPPORTED_OPERATION,
            MupError::UnknownHandler(_) => error_codes::UNKNOWN_HANDLER,
            MupError::ComponentNotFound(_) => error_codes::COMPONENT_NOT_FOUND,
            MupError::BatchFailed(_) => error_codes::BATCH_FAILED,
            MupError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            MupError::HandlerFailed(_) => error_codes::HANDLER_FAILED,
            MupError::Transport(_) => error_codes::TRANSPORT,
            MupError::Config(_) => error_codes::CONFIG,
            MupError::Io(_) | MupError::Json(_) | MupError::Internal(_) => error_codes::INTERNAL,
        }
    }

    /// Error payload: `{"error": message, "code": kind}`.
    pub fn to_payload(&self) -> Value {
        json!({
            "error": self.to_string(),
            "code": self.kind(),
        })
    }

    /// Convert to an error envelope, correlated with the failed request if known.
    pub fn to_envelope(&self, correlation_id: Option<String>) -> Envelope {
        Envelope::from_value(MessageKind::Error, self.to_payload()).correlated(correlation_id)
    }
}

impl From<ComponentError> for MupError {
    fn from(err: ComponentError) -> Self {
        match err {
            ComponentError::NotFound(id) => MupError::ComponentNotFound(id),
            ComponentError::InvalidTree(msg) => MupError::InvalidParams(msg),
        }
    }
}
