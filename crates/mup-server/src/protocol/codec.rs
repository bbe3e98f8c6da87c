//! Envelope wire codec.
//!
//! Wire shape: `{"mup": {version, message_type, message_id, timestamp,
//! correlation_id?, payload}}`. Decoding is strict about the wrapper, the
//! message kind and the payload type, and lenient about optional header
//! fields, which are filled in the way a sender would have.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use mup_components::Map;

use crate::types::{
    new_message_id, Envelope, MessageKind, MupError, MupResult, PROTOCOL_VERSION,
    PROTOCOL_WRAPPER_KEY,
};

/// Serialize an envelope, stamping the current UTC time.
pub fn encode(envelope: &Envelope) -> MupResult<String> {
    let mut inner = Map::new();
    inner.insert(
        "version".to_string(),
        Value::String(envelope.version().to_string()),
    );
    inner.insert(
        "message_type".to_string(),
        Value::String(envelope.kind().as_str().to_string()),
    );
    inner.insert(
        "message_id".to_string(),
        Value::String(envelope.message_id().to_string()),
    );
    inner.insert(
        "timestamp".to_string(),
        Value::String(format_timestamp(Utc::now())),
    );
    if let Some(correlation_id) = envelope.correlation_id() {
        inner.insert(
            "correlation_id".to_string(),
            Value::String(correlation_id.to_string()),
        );
    }
    inner.insert(
        "payload".to_string(),
        Value::Object(envelope.payload().clone()),
    );

    let mut outer = Map::new();
    outer.insert(PROTOCOL_WRAPPER_KEY.to_string(), Value::Object(inner));
    Ok(serde_json::to_string(&Value::Object(outer))?)
}

/// Parse one text frame into an envelope.
pub fn decode(frame: &str) -> MupResult<Envelope> {
    let value: Value = serde_json::from_str(frame)
        .map_err(|e| MupError::MalformedMessage(format!("frame is not valid JSON: {e}")))?;
    decode_value(value)
}

/// Parse one binary frame (UTF-8 JSON) into an envelope.
pub fn decode_bytes(frame: &[u8]) -> MupResult<Envelope> {
    let text = std::str::from_utf8(frame)
        .map_err(|e| MupError::MalformedMessage(format!("frame is not UTF-8: {e}")))?;
    decode(text)
}

/// Parse an already-deserialized JSON value into an envelope.
pub fn decode_value(value: Value) -> MupResult<Envelope> {
    let Value::Object(mut outer) = value else {
        return Err(MupError::MalformedMessage(
            "frame is not a JSON object".to_string(),
        ));
    };
    let fields = match outer.remove(PROTOCOL_WRAPPER_KEY) {
        Some(Value::Object(fields)) => fields,
        Some(_) => {
            return Err(MupError::MalformedMessage(format!(
                "'{PROTOCOL_WRAPPER_KEY}' must be an object"
            )))
        }
        None => {
            return Err(MupError::MalformedMessage(format!(
                "missing '{PROTOCOL_WRAPPER_KEY}' wrapper"
            )))
        }
    };

    let kind_name = optional_string(&fields, "message_type")?
        .ok_or_else(|| MupError::MalformedMessage("missing message_type".to_string()))?;
    let kind = MessageKind::from_name(&kind_name).ok_or_else(|| {
        MupError::MalformedMessage(format!("unknown message_type '{kind_name}'"))
    })?;

    let payload = match fields.get("payload") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(MupError::MalformedMessage(
                "payload must be an object".to_string(),
            ))
        }
    };

    let version =
        optional_string(&fields, "version")?.unwrap_or_else(|| PROTOCOL_VERSION.to_string());
    let message_id = optional_string(&fields, "message_id")?.unwrap_or_else(new_message_id);
    let correlation_id = optional_string(&fields, "correlation_id")?;
    let timestamp = match optional_string(&fields, "timestamp")? {
        Some(raw) => parse_timestamp(&raw)?,
        None => Utc::now(),
    };

    Ok(Envelope::from_parts(
        version,
        kind,
        message_id,
        timestamp,
        correlation_id,
        payload,
    ))
}

/// RFC 3339 UTC with millisecond precision and a `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> MupResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| MupError::MalformedMessage(format!("invalid timestamp '{raw}': {e}")))
}

fn optional_string(fields: &Map, key: &str) -> MupResult<Option<String>> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(MupError::MalformedMessage(format!(
            "'{key}' must be a string"
        ))),
    }
}
