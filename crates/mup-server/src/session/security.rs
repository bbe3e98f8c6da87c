//! Per-client security contexts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use mup_components::Map;

/// Identity and credentials attached to one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityContext {
    /// User the client acts for.
    pub user_id: String,
    /// Session id the client declared, or its client id.
    pub session_id: String,
    /// Credential from the last auth request. Never serialized.
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
    /// Granted permissions.
    #[serde(default)]
    pub permissions: Map,
    /// Method of the last auth request, `none` before any.
    #[serde(default = "default_auth_method")]
    pub auth_method: String,
}

fn default_auth_method() -> String {
    "none".to_string()
}

impl SecurityContext {
    /// Unauthenticated context.
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            auth_token: None,
            permissions: Map::new(),
            auth_method: default_auth_method(),
        }
    }

    /// Whether an auth request has been accepted.
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }
}

/// Security contexts keyed by client id.
#[derive(Debug, Default)]
pub struct SecurityContextStore {
    contexts: HashMap<String, SecurityContext>,
}

impl SecurityContextStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, client_id: &str, context: SecurityContext) {
        self.contexts.insert(client_id.to_string(), context);
    }

    pub fn get(&self, client_id: &str) -> Option<&SecurityContext> {
        self.contexts.get(client_id)
    }

    pub fn get_mut(&mut self, client_id: &str) -> Option<&mut SecurityContext> {
        self.contexts.get_mut(client_id)
    }

    pub fn remove(&mut self, client_id: &str) -> Option<SecurityContext> {
        self.contexts.remove(client_id)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
