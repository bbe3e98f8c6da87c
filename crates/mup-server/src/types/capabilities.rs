//! Capability and handshake types.

use serde::{Deserialize, Serialize};

use mup_components::Map;

use super::message::PROTOCOL_VERSION;

/// Server name reported in the handshake.
pub const SERVER_NAME: &str = "MUP Server";

/// Server version constant.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One component type the server can build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentTypeDescriptor {
    /// Component type name.
    #[serde(rename = "type")]
    pub component_type: String,
    /// Type schema version.
    pub version: String,
    /// Supported features; matched as a set.
    #[serde(default)]
    pub features: Vec<String>,
}

impl ComponentTypeDescriptor {
    fn new(component_type: &str, version: &str, features: &[&str]) -> Self {
        Self {
            component_type: component_type.to_string(),
            version: version.to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Whether every required feature is supported.
    pub fn supports_all<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required
            .iter()
            .all(|r| self.features.iter().any(|f| f == r.as_ref()))
    }
}

/// Authentication and authorization policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityPolicy {
    /// Whether clients must authenticate.
    pub authentication_required: bool,
    /// Accepted `auth_method` values.
    pub supported_auth_methods: Vec<String>,
    /// Permission model name.
    pub permission_model: String,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            authentication_required: false,
            supported_auth_methods: vec!["api_key".to_string(), "oauth2".to_string()],
            permission_model: "rbac".to_string(),
        }
    }
}

/// Advertised resource limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceLimits {
    /// Maximum simultaneous connections.
    pub max_concurrent_clients: usize,
    /// Maximum operations in one batch.
    pub batch_operation_limit: usize,
    /// Client-side component cache lifetime in seconds.
    pub component_cache_ttl: u64,
}

impl Default for PerformanceLimits {
    fn default() -> Self {
        Self {
            max_concurrent_clients: 100,
            batch_operation_limit: 50,
            component_cache_ttl: 3600,
        }
    }
}

/// Process-lifetime description of what this server offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Buildable component types.
    pub component_types: Vec<ComponentTypeDescriptor>,
    /// Registered event handler names, sorted.
    #[serde(rename = "event_handlers")]
    pub event_handler_names: Vec<String>,
    /// Security policy.
    #[serde(rename = "security")]
    pub security_policy: SecurityPolicy,
    /// Performance limits.
    #[serde(rename = "performance")]
    pub performance_limits: PerformanceLimits,
    /// External data connectors.
    #[serde(rename = "mcp_connectors", default)]
    pub external_connector_names: Vec<String>,
}

impl ServerCapabilities {
    /// Build the default capabilities for this server.
    pub fn default_capabilities() -> Self {
        Self {
            component_types: vec![
                ComponentTypeDescriptor::new(
                    "form",
                    "2.0.0",
                    &["validation", "conditional_logic", "auto_save"],
                ),
                ComponentTypeDescriptor::new(
                    "data_table",
                    "2.0.0",
                    &["sorting", "filtering", "pagination", "export"],
                ),
                ComponentTypeDescriptor::new(
                    "notification",
                    "1.0.0",
                    &["auto_dismiss", "stacking", "actions"],
                ),
                ComponentTypeDescriptor::new("container", "1.0.0", &["flex_layout", "nesting"]),
                ComponentTypeDescriptor::new("text", "1.0.0", &["variants"]),
                ComponentTypeDescriptor::new("input", "1.0.0", &["validation", "change_events"]),
                ComponentTypeDescriptor::new("button", "1.0.0", &["variants", "click_events"]),
            ],
            event_handler_names: Vec::new(),
            security_policy: SecurityPolicy::default(),
            performance_limits: PerformanceLimits::default(),
            external_connector_names: vec![
                "postgres".to_string(),
                "file_system".to_string(),
                "web_api".to_string(),
            ],
        }
    }

    /// Replace the advertised handler names (stored sorted and de-duplicated).
    pub fn with_event_handlers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        self.event_handler_names = names;
        self
    }

    /// Look up a component type descriptor.
    pub fn component_type(&self, name: &str) -> Option<&ComponentTypeDescriptor> {
        self.component_types
            .iter()
            .find(|c| c.component_type == name)
    }
}

/// Client capabilities declared in the handshake. Every field defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientCapabilities {
    /// Rendering targets (`web`, `desktop`, ...).
    pub rendering_targets: Vec<String>,
    /// Event names the client can emit.
    pub supported_events: Vec<String>,
    /// Deepest component tree the client renders.
    pub max_component_depth: u32,
    /// Whether the client applies updates concurrently.
    pub concurrent_updates: bool,
    /// Whether the client bridges to MCP connectors.
    pub mcp_integration: bool,
}

/// Client implementation info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    #[serde(default = "unknown_client")]
    pub name: String,
    /// Client version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Declared capabilities.
    #[serde(default)]
    pub capabilities: ClientCapabilities,
}

fn unknown_client() -> String {
    "Unknown".to_string()
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: unknown_client(),
            version: None,
            capabilities: ClientCapabilities::default(),
        }
    }
}

/// Identity hints sent by the client at handshake time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandshakeContext {
    /// Claimed user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Session id to resume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Any other context (viewport, theme, language, ...).
    #[serde(flatten)]
    pub extra: Map,
}

/// Handshake request payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Client info.
    #[serde(default)]
    pub client_info: ClientInfo,
    /// Client context.
    #[serde(default)]
    pub context: HandshakeContext,
}

/// Server implementation info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
    /// Protocol version.
    pub protocol_version: String,
    /// Description.
    pub description: String,
    /// Vendor.
    pub vendor: String,
}

impl ServerInfo {
    /// Info for this build.
    pub fn current() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            description: "Session engine for server-described UI component trees".to_string(),
            vendor: "MUP Protocol Team".to_string(),
        }
    }
}

/// Session details returned in the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session id (client-supplied or the allocated client id).
    pub session_id: String,
    /// Server time at handshake, RFC 3339 UTC.
    pub server_time: String,
}

/// Handshake response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    /// Server info.
    pub server_info: ServerInfo,
    /// Full capability snapshot.
    pub capabilities: ServerCapabilities,
    /// Allocated client id.
    pub client_id: String,
    /// Session details.
    pub session_info: SessionInfo,
}
