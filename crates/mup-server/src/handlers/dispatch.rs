//! Dispatch table mapping handler names to handlers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use mup_components::builder::handlers as names;
use mup_components::Map;

use crate::types::{MupError, MupResult};

use super::{
    field_validation::FieldValidationHandler, form_change::FormChangeHandler,
    form_submit::FormSubmitHandler, notification_close::NotificationCloseHandler,
    row_selection::RowSelectionHandler, table_filter::TableFilterHandler,
    table_sort::TableSortHandler, EventHandler, HandlerContext,
};

/// Registered event handlers, keyed by name.
///
/// Built once at startup and shared read-only by every connection.
#[derive(Clone, Default)]
pub struct DispatchTable {
    handlers: BTreeMap<String, Arc<dyn EventHandler>>,
}

impl DispatchTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in form, table and notification handlers.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register(names::FORM_SUBMIT, FormSubmitHandler);
        table.register(names::FIELD_VALIDATION, FieldValidationHandler);
        table.register(names::FORM_CHANGE, FormChangeHandler);
        table.register(names::ROW_SELECTION, RowSelectionHandler);
        table.register(names::TABLE_SORT, TableSortHandler);
        table.register(names::TABLE_FILTER, TableFilterHandler);
        table.register(names::NOTIFICATION_CLOSE, NotificationCloseHandler);
        table
    }

    /// Register `handler` under `name`, replacing any previous one.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: EventHandler + 'static,
    {
        let name = name.into();
        if self
            .handlers
            .insert(name.clone(), Arc::new(handler))
            .is_some()
        {
            tracing::warn!("Replaced event handler '{name}'");
        }
        self
    }

    /// Handler names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler registered under `name`.
    pub async fn dispatch(
        &self,
        name: &str,
        event: Map,
        ctx: &HandlerContext,
    ) -> MupResult<Option<Map>> {
        let handler = self
            .handlers
            .get(name)
            .cloned()
            .ok_or_else(|| MupError::UnknownHandler(name.to_string()))?;

        tracing::debug!("Dispatching '{name}' for client {}", ctx.client_id);
        handler.handle(event, ctx).await
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
