//! Protocol handler: routes decoded envelopes and drives a connection.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use mup_components::Map;

use crate::context::ServerContext;
use crate::handlers::HandlerContext;
use crate::protocol::codec;
use crate::protocol::negotiation::{self, NegotiationState, QueryType};
use crate::transport::{ConnectionId, Frame, FrameTransport};
use crate::types::{
    AuthRequest, BatchRequest, CapabilityQuery, ContextTransfer, Envelope, GenericRequest,
    HandshakeRequest, MessageKind, MupError, MupResult, StateSnapshot, StateSyncRequest,
};

/// Per-connection state, owned by the connection's task.
#[derive(Debug)]
pub struct ConnectionState {
    id: ConnectionId,
    negotiation: NegotiationState,
}

impl ConnectionState {
    /// State for a newly accepted connection.
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            negotiation: NegotiationState::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn negotiation(&self) -> &NegotiationState {
        &self.negotiation
    }
}

/// Handles MUP messages for any number of connections.
#[derive(Clone)]
pub struct ProtocolHandler {
    context: Arc<ServerContext>,
}

impl ProtocolHandler {
    pub fn new(context: Arc<ServerContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    /// Decode and handle one frame. Returns the reply, if any.
    pub async fn handle_frame(&self, state: &mut ConnectionState, frame: &str) -> Option<Envelope> {
        self.handle_decoded(state, codec::decode(frame)).await
    }

    /// Decode a binary frame as strict UTF-8 JSON and handle it.
    pub async fn handle_binary_frame(
        &self,
        state: &mut ConnectionState,
        frame: &[u8],
    ) -> Option<Envelope> {
        self.handle_decoded(state, codec::decode_bytes(frame)).await
    }

    async fn handle_decoded(
        &self,
        state: &mut ConnectionState,
        decoded: MupResult<Envelope>,
    ) -> Option<Envelope> {
        match decoded {
            Ok(envelope) => self.handle_envelope(state, envelope).await,
            Err(e) => {
                tracing::warn!("Connection {}: {e}", state.id);
                Some(e.to_envelope(None))
            }
        }
    }

    /// Handle one decoded envelope. Errors become error envelopes
    /// correlated with the request.
    pub async fn handle_envelope(
        &self,
        state: &mut ConnectionState,
        envelope: Envelope,
    ) -> Option<Envelope> {
        let kind = envelope.kind();
        tracing::debug!(
            "Connection {} <- {kind} ({})",
            state.id,
            envelope.message_id()
        );

        match self.route(state, &envelope).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!("Connection {}: {kind} failed: {e}", state.id);
                Some(e.to_envelope(Some(envelope.message_id().to_string())))
            }
        }
    }

    async fn route(
        &self,
        state: &mut ConnectionState,
        envelope: &Envelope,
    ) -> MupResult<Option<Envelope>> {
        let kind = envelope.kind();
        match kind {
            MessageKind::HandshakeRequest => self.handshake(state, envelope).await.map(Some),
            MessageKind::CapabilityQuery => {
                state.negotiation.ensure_negotiated(kind)?;
                self.capability_query(envelope).await.map(Some)
            }
            MessageKind::EventNotification => {
                let client_id = state.negotiation.ensure_negotiated(kind)?.to_string();
                self.dispatch_event(&client_id, envelope).await
            }
            MessageKind::BatchOperation => {
                state.negotiation.ensure_negotiated(kind)?;
                self.batch(envelope).await.map(Some)
            }
            MessageKind::StateSync => {
                state.negotiation.ensure_negotiated(kind)?;
                self.state_sync(envelope).await.map(Some)
            }
            MessageKind::ContextTransfer => {
                let client_id = state.negotiation.ensure_negotiated(kind)?.to_string();
                self.context_transfer(&client_id, envelope).await.map(Some)
            }
            MessageKind::AuthRequest => {
                let client_id = state.negotiation.ensure_negotiated(kind)?.to_string();
                self.auth(&client_id, envelope).await.map(Some)
            }
            MessageKind::Request => {
                state.negotiation.ensure_negotiated(kind)?;
                self.request(envelope).await.map(Some)
            }
            MessageKind::HandshakeResponse
            | MessageKind::CapabilityResponse
            | MessageKind::AuthResponse
            | MessageKind::ComponentUpdate
            | MessageKind::Error => Err(MupError::ProtocolSequence(format!(
                "'{kind}' is a server-to-client message"
            ))),
        }
    }

    async fn handshake(
        &self,
        state: &mut ConnectionState,
        envelope: &Envelope,
    ) -> MupResult<Envelope> {
        let request: HandshakeRequest = parse(envelope)?;
        let session = self.context.sessions.open_session(state.id, &request).await;
        if let Some(previous) = state.negotiation.mark_negotiated(session.client_id.clone()) {
            tracing::debug!("Connection {} replaced client {previous}", state.id);
        }

        let response =
            negotiation::handshake_response(&self.context.capabilities, &request, &session.client_id);
        reply_with(envelope, MessageKind::HandshakeResponse, &response)
    }

    async fn capability_query(&self, envelope: &Envelope) -> MupResult<Envelope> {
        let query: CapabilityQuery = parse(envelope)?;
        let capabilities = &self.context.capabilities;

        match QueryType::parse(&query.query_type)? {
            QueryType::ComponentAvailability => {
                let answer = negotiation::component_availability(capabilities, &query.filters);
                reply_with(envelope, MessageKind::CapabilityResponse, &answer)
            }
            QueryType::EventHandlers => {
                let answer = negotiation::handler_listing(capabilities);
                reply_with(envelope, MessageKind::CapabilityResponse, &answer)
            }
            QueryType::ServerStatus => {
                let active = self.context.sessions.active_sessions().await;
                let registered = self.context.registry.lock().await.len();
                let answer = negotiation::server_status(active, registered);
                reply_with(envelope, MessageKind::CapabilityResponse, &answer)
            }
        }
    }

    async fn dispatch_event(
        &self,
        client_id: &str,
        envelope: &Envelope,
    ) -> MupResult<Option<Envelope>> {
        let mut event = envelope.payload().clone();
        let handler_name = match event.remove("handler") {
            Some(Value::String(name)) => name,
            _ => return Err(MupError::UnknownHandler("<missing>".to_string())),
        };
        if let Some(Value::Object(nested)) = event.remove("event_data") {
            event.extend(nested);
        }

        let session = self
            .context
            .sessions
            .session(client_id)
            .await
            .ok_or_else(|| MupError::ProtocolSequence(format!("no session for {client_id}")))?;
        let security = self
            .context
            .sessions
            .security_context(client_id)
            .await
            .ok_or_else(|| MupError::ProtocolSequence(format!("no session for {client_id}")))?;
        let ctx = HandlerContext {
            client_id: client_id.to_string(),
            session_id: session.session_id,
            security,
            registry: self.context.registry.clone(),
        };

        match self.context.dispatch.dispatch(&handler_name, event, &ctx).await? {
            Some(result) if !result.is_empty() => Ok(Some(Envelope::reply(
                envelope,
                MessageKind::ComponentUpdate,
                result,
            ))),
            _ => {
                tracing::debug!("Handler '{handler_name}' produced no reply");
                Ok(None)
            }
        }
    }

    async fn batch(&self, envelope: &Envelope) -> MupResult<Envelope> {
        let request: BatchRequest = parse(envelope)?;
        let summary = self.context.batch.execute(request).await?;
        tracing::info!(
            "Batch {}: {}/{} operation(s) succeeded",
            envelope.message_id(),
            summary.successful_operations,
            summary.total_operations
        );
        reply_with(envelope, MessageKind::ComponentUpdate, &summary)
    }

    async fn state_sync(&self, envelope: &Envelope) -> MupResult<Envelope> {
        let request: StateSyncRequest = parse(envelope)?;
        let registry = self.context.registry.lock().await;
        let components: Vec<_> = match &request.component_ids {
            Some(ids) => registry
                .snapshot()
                .into_iter()
                .filter(|c| ids.contains(&c.id))
                .collect(),
            None => registry.snapshot(),
        };
        drop(registry);

        let snapshot = StateSnapshot {
            total_count: components.len(),
            components,
        };
        reply_with(envelope, MessageKind::StateSync, &snapshot)
    }

    async fn context_transfer(&self, client_id: &str, envelope: &Envelope) -> MupResult<Envelope> {
        let transfer: ContextTransfer = parse(envelope)?;
        let merged = self
            .context
            .sessions
            .merge_context(client_id, transfer.context)
            .await?;
        let session_id = merged
            .get("session_id")
            .cloned()
            .unwrap_or_else(|| Value::String(client_id.to_string()));

        reply_with(
            envelope,
            MessageKind::ContextTransfer,
            &json!({ "session_id": session_id, "context": merged }),
        )
    }

    async fn auth(&self, client_id: &str, envelope: &Envelope) -> MupResult<Envelope> {
        let request: AuthRequest = parse(envelope)?;
        let security = self
            .context
            .sessions
            .authenticate(client_id, request, &self.context.capabilities.security_policy)
            .await?;

        reply_with(
            envelope,
            MessageKind::AuthResponse,
            &json!({
                "authenticated": true,
                "user_id": security.user_id,
                "auth_method": security.auth_method,
            }),
        )
    }

    async fn request(&self, envelope: &Envelope) -> MupResult<Envelope> {
        let request: GenericRequest = parse(envelope)?;
        match request.action.as_str() {
            "get_component" => {
                let component_id = request.component_id.ok_or_else(|| {
                    MupError::InvalidParams("get_component needs 'component_id'".to_string())
                })?;
                let component = self
                    .context
                    .registry
                    .lock()
                    .await
                    .get(&component_id)
                    .cloned()
                    .ok_or(MupError::ComponentNotFound(component_id))?;
                reply_with(
                    envelope,
                    MessageKind::ComponentUpdate,
                    &json!({ "component": component }),
                )
            }
            other => Err(MupError::InvalidParams(format!(
                "unsupported request action '{other}'"
            ))),
        }
    }

    /// Serve one connection until the peer closes or a send fails.
    pub async fn serve<T: FrameTransport>(&self, mut transport: T) -> MupResult<()> {
        let mut state = ConnectionState::new(ConnectionId::next());
        let peer = transport.peer();
        tracing::info!("Connection {} opened ({peer})", state.id);

        let outcome = self.serve_frames(&mut state, &mut transport).await;

        self.context.sessions.remove_connection(state.id).await;
        tracing::info!("Connection {} closed ({peer})", state.id);
        outcome
    }

    async fn serve_frames<T: FrameTransport>(
        &self,
        state: &mut ConnectionState,
        transport: &mut T,
    ) -> MupResult<()> {
        loop {
            let frame = match transport.receive().await {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(()),
                Err(e) => {
                    tracing::warn!("Connection {}: receive failed: {e}", state.id);
                    return Err(e);
                }
            };
            if frame.is_blank() {
                continue;
            }

            let client_before = state.negotiation.client_id().map(str::to_string);
            let reply = match &frame {
                Frame::Text(text) => self.handle_frame(state, text).await,
                Frame::Binary(bytes) => self.handle_binary_frame(state, bytes).await,
            };
            let Some(reply) = reply else {
                continue;
            };

            // A session removed while its message was in flight gets no reply.
            if let Some(client_id) = client_before {
                if state.negotiation.client_id() == Some(client_id.as_str())
                    && !self.context.sessions.is_live(&client_id).await
                {
                    tracing::info!(
                        "Connection {}: dropping {} for departed client {client_id}",
                        state.id,
                        reply.kind()
                    );
                    state.negotiation.reset();
                    continue;
                }
            }

            let encoded = codec::encode(&reply)?;
            if let Err(e) = transport.send(encoded).await {
                tracing::warn!("Connection {}: send failed, closing: {e}", state.id);
                return Ok(());
            }
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(envelope: &Envelope) -> MupResult<T> {
    envelope.parse_payload().map_err(|e| {
        MupError::InvalidParams(format!("invalid {} payload: {e}", envelope.kind()))
    })
}

fn reply_with<T: Serialize>(request: &Envelope, kind: MessageKind, body: &T) -> MupResult<Envelope> {
    let payload = match serde_json::to_value(body)? {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
    };
    Ok(Envelope::reply(request, kind, payload))
}
