//! Batch operation descriptors and how each applies to the registry.

use serde_json::{json, Value};

use mup_components::{Compensation, ComponentRecord, ComponentRegistry, Map};

use crate::types::{MupError, MupResult, OperationOutcome};

/// What an operation does.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    /// Shallow-merge `updates` into props.
    ComponentUpdate { component_id: String, updates: Map },
    /// Merge `events` into event bindings.
    EventBinding { component_id: String, events: Map },
    /// Insert a component tree, replacing any record with the same id.
    ComponentCreate { component: ComponentRecord },
    /// Delete a component.
    ComponentRemove { component_id: String },
}

/// One parsed batch operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Client-supplied id, echoed in the outcome.
    pub operation_id: Option<String>,
    pub kind: OperationKind,
}

impl Operation {
    /// Parse a raw descriptor `{type, operation_id?, component_id, ...}`.
    pub fn parse(raw: &Value) -> MupResult<Self> {
        let Value::Object(fields) = raw else {
            return Err(MupError::InvalidParams(
                "operation must be an object".to_string(),
            ));
        };
        let operation_id = operation_id(raw);
        let op_type = fields
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| MupError::InvalidParams("operation is missing 'type'".to_string()))?;

        let kind = match op_type {
            "component_update" => OperationKind::ComponentUpdate {
                component_id: component_id(fields)?,
                updates: object_field(fields, "updates")?,
            },
            "event_binding" => OperationKind::EventBinding {
                component_id: component_id(fields)?,
                events: object_field(fields, "events")?,
            },
            "component_create" => {
                let component = fields.get("component").cloned().ok_or_else(|| {
                    MupError::InvalidParams("component_create needs 'component'".to_string())
                })?;
                let component: ComponentRecord = serde_json::from_value(component)
                    .map_err(|e| MupError::InvalidParams(format!("invalid component: {e}")))?;
                OperationKind::ComponentCreate { component }
            }
            "component_remove" => OperationKind::ComponentRemove {
                component_id: component_id(fields)?,
            },
            other => return Err(MupError::UnsupportedOperation(other.to_string())),
        };

        Ok(Self { operation_id, kind })
    }

    /// Target component id.
    pub fn component_id(&self) -> &str {
        match &self.kind {
            OperationKind::ComponentUpdate { component_id, .. }
            | OperationKind::EventBinding { component_id, .. }
            | OperationKind::ComponentRemove { component_id } => component_id,
            OperationKind::ComponentCreate { component } => &component.id,
        }
    }

    /// Apply to the registry, returning the outcome and its undo record.
    pub fn apply(
        self,
        registry: &mut ComponentRegistry,
    ) -> MupResult<(OperationOutcome, Compensation)> {
        let component_id = self.component_id().to_string();
        let (detail, compensation) = match self.kind {
            OperationKind::ComponentUpdate { updates, .. } => {
                let keys: Vec<&String> = updates.keys().collect();
                let detail = json!({ "updated_props": keys });
                (detail, registry.update(&component_id, &updates)?)
            }
            OperationKind::EventBinding { events, .. } => {
                let detail = json!({ "events_bound": events.len() });
                (detail, registry.bind_events(&component_id, &events)?)
            }
            OperationKind::ComponentCreate { component } => {
                let detail = json!({ "component_type": component.component_type.clone() });
                (detail, registry.create(component)?)
            }
            OperationKind::ComponentRemove { .. } => {
                let removed = registry.remove(&component_id)?;
                (
                    json!({ "component_type": removed.component_type.clone() }),
                    Compensation::Reinsert {
                        record: Box::new(removed),
                    },
                )
            }
        };

        let detail = match detail {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok((
            OperationOutcome::success(self.operation_id, &component_id, detail),
            compensation,
        ))
    }
}

/// Best-effort `(operation_id, component_id)` of a raw descriptor, for
/// reporting descriptors that failed to parse.
pub fn describe(raw: &Value) -> (Option<String>, Option<String>) {
    let component_id = raw
        .get("component_id")
        .and_then(Value::as_str)
        .or_else(|| {
            raw.get("component")
                .and_then(|c| c.get("id"))
                .and_then(Value::as_str)
        })
        .map(str::to_string);
    (operation_id(raw), component_id)
}

/// `operation_id` may be a string or a number.
fn operation_id(raw: &Value) -> Option<String> {
    match raw.get("operation_id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn component_id(fields: &Map) -> MupResult<String> {
    fields
        .get("component_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| MupError::InvalidParams("operation is missing 'component_id'".to_string()))
}

fn object_field(fields: &Map, key: &str) -> MupResult<Map> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(MupError::InvalidParams(format!(
            "'{key}' must be an object"
        ))),
    }
}
