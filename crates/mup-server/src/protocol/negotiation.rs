//! Capability negotiation: per-connection handshake state and capability queries.

use chrono::Utc;

use crate::protocol::codec::format_timestamp;
use crate::types::{
    CapabilityFilters, ComponentAvailability, ComponentTypeDescriptor, HandlerListing,
    HandshakeRequest, HandshakeResponse, MessageKind, MupError, MupResult, ServerCapabilities,
    ServerInfo, ServerStatus, SessionInfo, PROTOCOL_VERSION,
};

/// Handshake phase of one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// Transport is up; no handshake yet.
    #[default]
    Connected,
    /// Handshake completed.
    Negotiated,
}

/// Negotiation state held by a connection's task.
#[derive(Debug, Clone, Default)]
pub struct NegotiationState {
    phase: SessionPhase,
    client_id: Option<String>,
}

impl NegotiationState {
    /// Fresh state for a new connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Client id allocated at handshake.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Enter `Negotiated` with a new client id, returning the one it replaces.
    pub fn mark_negotiated(&mut self, client_id: String) -> Option<String> {
        self.phase = SessionPhase::Negotiated;
        tracing::debug!("handshake complete for client {client_id}");
        self.client_id.replace(client_id)
    }

    /// Drop back to `Connected`, returning the abandoned client id.
    pub fn reset(&mut self) -> Option<String> {
        self.phase = SessionPhase::Connected;
        self.client_id.take()
    }

    /// Check that `kind` may be processed, returning the client id.
    pub fn ensure_negotiated(&self, kind: MessageKind) -> MupResult<&str> {
        match (self.phase, self.client_id.as_deref()) {
            (SessionPhase::Negotiated, Some(client_id)) => Ok(client_id),
            _ => Err(MupError::ProtocolSequence(format!(
                "'{kind}' received before handshake; send 'handshake_request' first"
            ))),
        }
    }
}

/// Build the handshake response for a newly allocated session.
pub fn handshake_response(
    capabilities: &ServerCapabilities,
    request: &HandshakeRequest,
    client_id: &str,
) -> HandshakeResponse {
    if let Some(version) = request.client_info.version.as_deref() {
        tracing::debug!("client {} reports version {version}", request.client_info.name);
    }

    let session_id = request
        .context
        .session_id
        .clone()
        .unwrap_or_else(|| client_id.to_string());

    HandshakeResponse {
        server_info: ServerInfo::current(),
        capabilities: capabilities.clone(),
        client_id: client_id.to_string(),
        session_info: SessionInfo {
            session_id,
            server_time: format_timestamp(Utc::now()),
        },
    }
}

/// Supported capability query types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// Component types matching filters.
    ComponentAvailability,
    /// Registered event handler names.
    EventHandlers,
    /// Live session and registry counts.
    ServerStatus,
}

impl QueryType {
    /// Parse a `query_type` value.
    pub fn parse(name: &str) -> MupResult<Self> {
        match name {
            "component_availability" => Ok(QueryType::ComponentAvailability),
            "event_handlers" => Ok(QueryType::EventHandlers),
            "server_status" => Ok(QueryType::ServerStatus),
            other => Err(MupError::UnsupportedQuery(other.to_string())),
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::ComponentAvailability => "component_availability",
            QueryType::EventHandlers => "event_handlers",
            QueryType::ServerStatus => "server_status",
        }
    }
}

/// Whether a component type passes the query filters.
pub fn matches_filters(component: &ComponentTypeDescriptor, filters: &CapabilityFilters) -> bool {
    if let Some(wanted) = &filters.component_type {
        if &component.component_type != wanted {
            return false;
        }
    }
    if let Some(required) = &filters.required_features {
        if !component.supports_all(required) {
            return false;
        }
    }
    true
}

/// Answer a `component_availability` query.
pub fn component_availability(
    capabilities: &ServerCapabilities,
    filters: &CapabilityFilters,
) -> ComponentAvailability {
    let available_components: Vec<ComponentTypeDescriptor> = capabilities
        .component_types
        .iter()
        .filter(|c| matches_filters(c, filters))
        .cloned()
        .collect();

    ComponentAvailability {
        query_type: QueryType::ComponentAvailability.as_str().to_string(),
        total_count: available_components.len(),
        available_components,
    }
}

/// Answer an `event_handlers` query.
pub fn handler_listing(capabilities: &ServerCapabilities) -> HandlerListing {
    HandlerListing {
        query_type: QueryType::EventHandlers.as_str().to_string(),
        event_handlers: capabilities.event_handler_names.clone(),
        total_count: capabilities.event_handler_names.len(),
    }
}

/// Answer a `server_status` query.
pub fn server_status(active_sessions: usize, registered_components: usize) -> ServerStatus {
    ServerStatus {
        query_type: QueryType::ServerStatus.as_str().to_string(),
        active_sessions,
        registered_components,
        protocol_version: PROTOCOL_VERSION.to_string(),
    }
}
