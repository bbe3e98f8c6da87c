//! Client session table, connection lookup and security contexts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use mup_components::Map;

use crate::session::security::{SecurityContext, SecurityContextStore};
use crate::transport::ConnectionId;
use crate::types::{
    AuthRequest, ClientCapabilities, ClientInfo, HandshakeRequest, MupError, MupResult,
    SecurityPolicy,
};

/// User id recorded when the handshake names none.
pub const ANONYMOUS_USER: &str = "anonymous";

/// A negotiated client.
#[derive(Debug, Clone)]
pub struct ClientSession {
    /// Server-allocated id, `client_<uuid>`.
    pub client_id: String,
    /// Declared session id, or the client id.
    pub session_id: String,
    /// Connection the client negotiated on.
    pub connection: ConnectionId,
    /// Client info from the handshake.
    pub client_info: ClientInfo,
    /// Capabilities the client declared.
    pub declared_capabilities: ClientCapabilities,
    /// Handshake context plus later context transfers.
    pub negotiated_context: Map,
    /// Handshake time.
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct SessionTable {
    clients: HashMap<String, ClientSession>,
    by_connection: HashMap<ConnectionId, String>,
    security: SecurityContextStore,
}

impl SessionTable {
    fn remove_client(&mut self, client_id: &str) -> Option<ClientSession> {
        let session = self.clients.remove(client_id)?;
        self.security.remove(client_id);
        if self.by_connection.get(&session.connection).map(String::as_str) == Some(client_id) {
            self.by_connection.remove(&session.connection);
        }
        Some(session)
    }
}

/// Tracks every negotiated client.
///
/// The client table, the connection lookup and the security contexts sit
/// under one lock so a disconnect removes all three together.
#[derive(Debug, Default)]
pub struct SessionManager {
    table: RwLock<SessionTable>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client for `connection`, replacing any session the
    /// connection already had.
    pub async fn open_session(
        &self,
        connection: ConnectionId,
        request: &HandshakeRequest,
    ) -> ClientSession {
        let client_id = format!("client_{}", uuid::Uuid::new_v4());
        let user_id = request
            .context
            .user_id
            .clone()
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());
        let session_id = request
            .context
            .session_id
            .clone()
            .unwrap_or_else(|| client_id.clone());

        let mut negotiated_context = request.context.extra.clone();
        negotiated_context.insert("user_id".to_string(), Value::String(user_id.clone()));
        negotiated_context.insert(
            "session_id".to_string(),
            Value::String(session_id.clone()),
        );

        let session = ClientSession {
            client_id: client_id.clone(),
            session_id: session_id.clone(),
            connection,
            client_info: request.client_info.clone(),
            declared_capabilities: request.client_info.capabilities.clone(),
            negotiated_context,
            connected_at: Utc::now(),
        };

        let mut table = self.table.write().await;
        if let Some(previous) = table.by_connection.get(&connection).cloned() {
            table.remove_client(&previous);
            tracing::info!("Connection {connection} re-negotiated; dropped client {previous}");
        }
        table
            .security
            .insert(&client_id, SecurityContext::new(user_id, session_id));
        table.by_connection.insert(connection, client_id.clone());
        table.clients.insert(client_id.clone(), session.clone());

        tracing::info!(
            "Client {client_id} ({}) negotiated on connection {connection}; {} active",
            session.client_info.name,
            table.clients.len()
        );
        session
    }

    /// Drop whatever session `connection` owns.
    pub async fn remove_connection(&self, connection: ConnectionId) -> Option<ClientSession> {
        let mut table = self.table.write().await;
        let client_id = table.by_connection.remove(&connection)?;
        let removed = table.remove_client(&client_id);
        if removed.is_some() {
            tracing::info!(
                "Client {client_id} disconnected; {} active",
                table.clients.len()
            );
        }
        removed
    }

    /// Drop a session by client id.
    pub async fn remove_session(&self, client_id: &str) -> Option<ClientSession> {
        self.table.write().await.remove_client(client_id)
    }

    pub async fn session(&self, client_id: &str) -> Option<ClientSession> {
        self.table.read().await.clients.get(client_id).cloned()
    }

    /// Snapshot of the client's security context.
    pub async fn security_context(&self, client_id: &str) -> Option<SecurityContext> {
        self.table.read().await.security.get(client_id).cloned()
    }

    pub async fn client_for_connection(&self, connection: ConnectionId) -> Option<String> {
        self.table
            .read()
            .await
            .by_connection
            .get(&connection)
            .cloned()
    }

    /// Whether `client_id` is still registered.
    pub async fn is_live(&self, client_id: &str) -> bool {
        self.table.read().await.clients.contains_key(client_id)
    }

    pub async fn active_sessions(&self) -> usize {
        self.table.read().await.clients.len()
    }

    /// Shallow-merge `context` into the session's negotiated context and
    /// return the merged result.
    pub async fn merge_context(&self, client_id: &str, context: Map) -> MupResult<Map> {
        let mut table = self.table.write().await;
        let session = table
            .clients
            .get_mut(client_id)
            .ok_or_else(|| MupError::ProtocolSequence(format!("no session for {client_id}")))?;
        for (key, value) in context {
            session.negotiated_context.insert(key, value);
        }
        Ok(session.negotiated_context.clone())
    }

    /// Record an auth request on the client's security context.
    ///
    /// Credentials are stored as presented; nothing verifies them.
    pub async fn authenticate(
        &self,
        client_id: &str,
        request: AuthRequest,
        policy: &SecurityPolicy,
    ) -> MupResult<SecurityContext> {
        if !policy
            .supported_auth_methods
            .iter()
            .any(|m| m == &request.auth_method)
        {
            return Err(MupError::InvalidParams(format!(
                "unsupported auth_method '{}'; expected one of {:?}",
                request.auth_method, policy.supported_auth_methods
            )));
        }

        let mut table = self.table.write().await;
        let context = table
            .security
            .get_mut(client_id)
            .ok_or_else(|| MupError::ProtocolSequence(format!("no session for {client_id}")))?;
        context.auth_method = request.auth_method;
        context.auth_token = request.token;
        if let Some(user_id) = request.user_id {
            context.user_id = user_id;
        }
        context.permissions = request.permissions;

        tracing::info!(
            "Client {client_id} authenticated as {} via {}",
            context.user_id,
            context.auth_method
        );
        Ok(context.clone())
    }
}
