//! `handle_table_sort`: record the requested sort order.

use async_trait::async_trait;
use serde_json::{json, Value};

use mup_components::Map;

use crate::types::{MupError, MupResult};

use super::{object_prop, optional_str, reply, required_str, EventHandler, HandlerContext};

pub struct TableSortHandler;

#[async_trait]
impl EventHandler for TableSortHandler {
    async fn handle(&self, event: Map, ctx: &HandlerContext) -> MupResult<Option<Map>> {
        let column = required_str(&event, "column")?;
        let direction = optional_str(&event, "direction").unwrap_or("asc");
        if direction != "asc" && direction != "desc" {
            return Err(MupError::InvalidParams(format!(
                "sort direction must be 'asc' or 'desc', got '{direction}'"
            )));
        }

        if let Some(table_id) = optional_str(&event, "component_id") {
            let mut registry = ctx.registry.lock().await;
            if let Some(table) = registry.get(table_id) {
                let mut sorting = object_prop(table, "sorting");
                sorting.insert("column".to_string(), Value::String(column.to_string()));
                sorting.insert(
                    "direction".to_string(),
                    Value::String(direction.to_string()),
                );
                let mut patch = Map::new();
                patch.insert("sorting".to_string(), Value::Object(sorting));
                registry.update(table_id, &patch)?;
            }
        }

        tracing::debug!("Sort by {column} {direction}");

        Ok(reply(json!({
            "status": "success",
            "sort_column": column,
            "sort_direction": direction,
        })))
    }
}
