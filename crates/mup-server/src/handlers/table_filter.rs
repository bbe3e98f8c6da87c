//! `handle_table_filter`: record the table's filter query.

use async_trait::async_trait;
use serde_json::{json, Value};

use mup_components::Map;

use crate::types::MupResult;

use super::{object_prop, optional_str, reply, EventHandler, HandlerContext};

pub struct TableFilterHandler;

#[async_trait]
impl EventHandler for TableFilterHandler {
    async fn handle(&self, event: Map, ctx: &HandlerContext) -> MupResult<Option<Map>> {
        let filter = event
            .get("filter")
            .or_else(|| event.get("query"))
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()));

        if let Some(table_id) = optional_str(&event, "component_id") {
            let mut registry = ctx.registry.lock().await;
            if let Some(table) = registry.get(table_id) {
                let mut filtering = object_prop(table, "filtering");
                filtering.insert("query".to_string(), filter.clone());
                let mut patch = Map::new();
                patch.insert("filtering".to_string(), Value::Object(filtering));
                registry.update(table_id, &patch)?;
            }
        }

        Ok(reply(json!({
            "status": "success",
            "filter": filter,
        })))
    }
}
