//! Event handlers: named server callbacks invoked by `event_notification`.

pub mod dispatch;
pub mod field_validation;
pub mod form_change;
pub mod form_submit;
pub mod notification_close;
pub mod row_selection;
pub mod table_filter;
pub mod table_sort;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use mup_components::{ComponentRecord, FieldRule, Map};

use crate::context::SharedRegistry;
use crate::session::SecurityContext;
use crate::types::{MupError, MupResult};

pub use dispatch::DispatchTable;

/// What a handler can see of the session that raised the event.
#[derive(Clone)]
pub struct HandlerContext {
    /// Client that sent the event.
    pub client_id: String,
    /// Session id of that client.
    pub session_id: String,
    /// Snapshot of the client's security context.
    pub security: SecurityContext,
    /// Shared component registry.
    pub registry: SharedRegistry,
}

/// A server-side event handler.
///
/// `Ok(None)` or an empty map means there is nothing to send back.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Map, ctx: &HandlerContext) -> MupResult<Option<Map>>;
}

/// String argument that must be present.
pub(crate) fn required_str<'a>(event: &'a Map, key: &str) -> MupResult<&'a str> {
    event
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| MupError::InvalidParams(format!("missing string field '{key}'")))
}

pub(crate) fn optional_str<'a>(event: &'a Map, key: &str) -> Option<&'a str> {
    event.get(key).and_then(Value::as_str)
}

/// Validation rules stored on a form component. Unparseable rules are
/// logged and skipped.
pub(crate) fn form_rules(form: &ComponentRecord) -> BTreeMap<String, FieldRule> {
    let Some(Value::Object(rules)) = form.props.get("validation") else {
        return BTreeMap::new();
    };
    rules
        .iter()
        .filter_map(|(field, rule)| {
            match serde_json::from_value::<FieldRule>(rule.clone()) {
                Ok(rule) => Some((field.clone(), rule)),
                Err(e) => {
                    tracing::warn!("form {}: ignoring rule for '{field}': {e}", form.id);
                    None
                }
            }
        })
        .collect()
}

/// Copy of an object-valued prop, empty when absent or not an object.
pub(crate) fn object_prop(record: &ComponentRecord, key: &str) -> Map {
    match record.props.get(key) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

/// Build a result map from a `json!` object literal.
pub(crate) fn reply(value: Value) -> Option<Map> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
