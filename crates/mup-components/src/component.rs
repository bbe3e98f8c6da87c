//! The component record sent to clients and stored in the registry.

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ComponentError, ComponentResult};

/// JSON object type used for props, events, metadata and patches.
pub type Map = serde_json::Map<String, Value>;

/// Version stamped on every component built by this crate.
pub const COMPONENT_VERSION: &str = "1.0.0";

/// Identifier written into component metadata as the producing server.
pub const SERVER_ID: &str = "mup_server_v2";

/// A single UI component, optionally with nested children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Unique component id.
    pub id: String,
    /// Component type, e.g. `form` or `data_table`.
    #[serde(rename = "type")]
    pub component_type: String,
    /// Component schema version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Render properties.
    #[serde(default)]
    pub props: Map,
    /// Event name → handler binding (`{"handler": "..."}`).
    #[serde(default)]
    pub events: Map,
    /// Nested child components.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ComponentRecord>,
    /// Free-form metadata; always carries `created_at`.
    #[serde(default)]
    pub metadata: Map,
}

fn default_version() -> String {
    COMPONENT_VERSION.to_string()
}

/// Current UTC time formatted the way the protocol expects (`...Z`).
pub fn utc_now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl ComponentRecord {
    /// Create an empty component of the given type with standard metadata.
    pub fn new(component_type: impl Into<String>, id: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("created_at".to_string(), Value::String(utc_now_string()));
        metadata.insert("server_id".to_string(), Value::String(SERVER_ID.to_string()));

        Self {
            id: id.into(),
            component_type: component_type.into(),
            version: default_version(),
            props: Map::new(),
            events: Map::new(),
            children: Vec::new(),
            metadata,
        }
    }

    /// Set render properties.
    pub fn with_props(mut self, props: Map) -> Self {
        self.props = props;
        self
    }

    /// Bind an event to a named server handler.
    pub fn with_event(mut self, event: &str, handler: impl Into<String>) -> Self {
        let mut binding = Map::new();
        binding.insert("handler".to_string(), Value::String(handler.into()));
        self.events.insert(event.to_string(), Value::Object(binding));
        self
    }

    /// Bind an event with an explicit binding object.
    pub fn with_event_binding(mut self, event: &str, binding: Map) -> Self {
        self.events.insert(event.to_string(), Value::Object(binding));
        self
    }

    /// Append child components.
    pub fn with_children(mut self, children: Vec<ComponentRecord>) -> Self {
        self.children.extend(children);
        self
    }

    /// Merge extra metadata over the defaults.
    pub fn with_metadata(mut self, metadata: Map) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// Name of the handler bound to `event`, if any.
    pub fn handler_for(&self, event: &str) -> Option<&str> {
        self.events.get(event)?.get("handler")?.as_str()
    }

    /// Depth of the tree rooted at this component (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// Check that every id in the tree is non-empty and unique.
    pub fn validate_tree(&self) -> ComponentResult<()> {
        let mut seen = HashSet::new();
        self.collect_ids(&mut seen)
    }

    fn collect_ids<'a>(&'a self, seen: &mut HashSet<&'a str>) -> ComponentResult<()> {
        if self.id.trim().is_empty() {
            return Err(ComponentError::InvalidTree(format!(
                "component of type '{}' has an empty id",
                self.component_type
            )));
        }
        if !seen.insert(self.id.as_str()) {
            return Err(ComponentError::InvalidTree(format!(
                "duplicate component id '{}'",
                self.id
            )));
        }
        for child in &self.children {
            child.collect_ids(seen)?;
        }
        Ok(())
    }

    /// Serialize to a JSON object.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
