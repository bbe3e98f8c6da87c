//! Typed payloads of server-originated messages.

use serde::{Deserialize, Serialize};

use mup_components::{ComponentRecord, Map};

use super::capabilities::ComponentTypeDescriptor;
use super::error::MupError;
use super::request::ExecutionMode;

/// Outcome of one batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Applied.
    Success,
    /// Failed.
    Error,
}

/// One slot of a batch result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Client-supplied operation id.
    #[serde(default)]
    pub operation_id: Option<String>,
    /// Success or error.
    pub status: OperationStatus,
    /// Target component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Operation-specific detail (e.g. `events_bound`).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub detail: Map,
}

impl OperationOutcome {
    /// Successful outcome.
    pub fn success(operation_id: Option<String>, component_id: &str, detail: Map) -> Self {
        Self {
            operation_id,
            status: OperationStatus::Success,
            component_id: Some(component_id.to_string()),
            error: None,
            code: None,
            detail,
        }
    }

    /// Failed outcome.
    pub fn failure(
        operation_id: Option<String>,
        component_id: Option<String>,
        error: &MupError,
    ) -> Self {
        Self {
            operation_id,
            status: OperationStatus::Error,
            component_id,
            error: Some(error.to_string()),
            code: Some(error.kind().to_string()),
            detail: Map::new(),
        }
    }

    /// Whether the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }
}

/// Result of a completed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Per-operation outcomes in submission order.
    pub batch_results: Vec<OperationOutcome>,
    /// Mode the batch ran in.
    pub execution_mode: ExecutionMode,
    /// Number of operations submitted.
    pub total_operations: usize,
    /// Number of successful outcomes.
    pub successful_operations: usize,
}

impl BatchSummary {
    /// Summarize outcomes.
    pub fn new(
        batch_results: Vec<OperationOutcome>,
        execution_mode: ExecutionMode,
        total: usize,
    ) -> Self {
        let successful_operations = batch_results.iter().filter(|r| r.is_success()).count();
        Self {
            batch_results,
            execution_mode,
            total_operations: total,
            successful_operations,
        }
    }
}

/// `component_availability` answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentAvailability {
    /// Echoed query type.
    pub query_type: String,
    /// Matching component types.
    pub available_components: Vec<ComponentTypeDescriptor>,
    /// Number of matches.
    pub total_count: usize,
}

/// `event_handlers` answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerListing {
    /// Echoed query type.
    pub query_type: String,
    /// Registered handler names, sorted.
    pub event_handlers: Vec<String>,
    /// Number of handlers.
    pub total_count: usize,
}

/// `server_status` answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Echoed query type.
    pub query_type: String,
    /// Live negotiated sessions.
    pub active_sessions: usize,
    /// Components in the registry.
    pub registered_components: usize,
    /// Protocol version.
    pub protocol_version: String,
}

/// State sync answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Components sorted by id.
    pub components: Vec<ComponentRecord>,
    /// Number of components returned.
    pub total_count: usize,
}
