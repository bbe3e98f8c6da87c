//! Typed payloads of client-originated messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use mup_components::Map;

/// Capability query payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityQuery {
    /// Query discriminator, e.g. `component_availability`.
    pub query_type: String,
    /// Query filters.
    #[serde(default)]
    pub filters: CapabilityFilters,
}

/// Filters for `component_availability` queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityFilters {
    /// Exact component type name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    /// Features the component type must all support.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_features: Option<Vec<String>>,
}

/// How a batch runs its operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One after another, in input order.
    #[default]
    Sequential,
    /// All at once.
    Parallel,
}

impl ExecutionMode {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Parallel => "parallel",
        }
    }
}

/// Batch operation payload. Operations stay raw so one bad descriptor
/// fails only its own slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Operation descriptors in submission order.
    #[serde(default)]
    pub operations: Vec<Value>,
    /// Execution mode.
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    /// Roll back applied operations when a sequential batch fails.
    #[serde(default)]
    pub rollback_on_error: bool,
}

/// Auth request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    /// One of the server's supported auth methods.
    pub auth_method: String,
    /// Opaque credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// User the credential belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Requested permissions.
    #[serde(default)]
    pub permissions: Map,
}

/// Context transfer payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextTransfer {
    /// Context entries merged into the session's negotiated context.
    #[serde(default)]
    pub context: Map,
}

/// State sync payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSyncRequest {
    /// Restrict the snapshot to these ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_ids: Option<Vec<String>>,
}

/// Generic request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericRequest {
    /// Requested action, e.g. `get_component`.
    pub action: String,
    /// Target component for component-scoped actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
}
