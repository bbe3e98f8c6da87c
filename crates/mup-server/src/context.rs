//! Process-wide server state shared by every connection.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;

use mup_components::builder::{DataTableConfig, FormConfig, FormField, TableColumn};
use mup_components::{ComponentBuilder, ComponentRecord, ComponentRegistry, FieldRule};

use crate::batch::BatchEngine;
use crate::config::ServerConfig;
use crate::handlers::DispatchTable;
use crate::session::SessionManager;
use crate::types::ServerCapabilities;

/// Registry handle shared by handlers and batch tasks.
pub type SharedRegistry = Arc<Mutex<ComponentRegistry>>;

/// Everything a protocol handler needs.
#[derive(Debug)]
pub struct ServerContext {
    /// Immutable capability snapshot, identical for every client.
    pub capabilities: Arc<ServerCapabilities>,
    pub registry: SharedRegistry,
    pub dispatch: Arc<DispatchTable>,
    pub sessions: SessionManager,
    pub batch: BatchEngine,
}

impl ServerContext {
    /// Context with the built-in handlers.
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_dispatch(config, DispatchTable::with_defaults())
    }

    /// Context with a caller-built dispatch table.
    pub fn with_dispatch(config: &ServerConfig, dispatch: DispatchTable) -> Self {
        let capabilities = config.capabilities().with_event_handlers(dispatch.names());

        let mut registry = ComponentRegistry::new();
        if config.server.seed_sample_components {
            for component in sample_components() {
                registry.insert(component);
            }
            tracing::info!("Registered {} sample components", registry.len());
        }
        let registry = Arc::new(Mutex::new(registry));

        Self {
            batch: BatchEngine::new(
                registry.clone(),
                capabilities.performance_limits.batch_operation_limit,
            ),
            capabilities: Arc::new(capabilities),
            registry,
            dispatch: Arc::new(dispatch),
            sessions: SessionManager::new(),
        }
    }
}

/// The contact form and user table registered at startup.
pub fn sample_components() -> Vec<ComponentRecord> {
    let field = |name: &str, field_type: &str, label: &str, required: bool, placeholder: &str| {
        FormField {
            name: name.to_string(),
            field_type: field_type.to_string(),
            label: label.to_string(),
            required,
            placeholder: placeholder.to_string(),
        }
    };

    let mut form = FormConfig {
        fields: vec![
            field("name", "text", "Name", true, "Enter your name"),
            field("email", "email", "Email", true, "Enter your email"),
            field("message", "textarea", "Message", false, "Enter your message"),
        ],
        ..FormConfig::default()
    };
    form.validation.insert(
        "name".to_string(),
        FieldRule {
            min_length: Some(2),
            max_length: Some(50),
            pattern: None,
        },
    );
    form.validation.insert(
        "email".to_string(),
        FieldRule {
            pattern: Some(r"^[^@]+@[^@]+\.[^@]+$".to_string()),
            ..FieldRule::default()
        },
    );
    form.validation.insert(
        "message".to_string(),
        FieldRule {
            max_length: Some(500),
            ..FieldRule::default()
        },
    );

    let column = |key: &str, title: &str| TableColumn {
        key: key.to_string(),
        title: title.to_string(),
        sortable: true,
    };
    let table = DataTableConfig {
        columns: vec![
            column("id", "ID"),
            column("name", "Name"),
            column("email", "Email"),
            column("created_at", "Created"),
        ],
        data: vec![
            json!({"id": 1, "name": "Alice", "email": "alice@example.com", "created_at": "2024-01-01"}),
            json!({"id": 2, "name": "Bob", "email": "bob@example.com", "created_at": "2024-01-02"}),
            json!({"id": 3, "name": "Carol", "email": "carol@example.com", "created_at": "2024-01-03"}),
        ],
        ..DataTableConfig::default()
    };

    vec![
        ComponentBuilder::form("sample_form", form),
        ComponentBuilder::data_table("sample_table", table),
    ]
}
