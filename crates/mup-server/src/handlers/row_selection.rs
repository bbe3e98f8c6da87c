//! `handle_row_selection`: report which table row the user picked.

use async_trait::async_trait;
use serde_json::{json, Value};

use mup_components::Map;

use crate::types::MupResult;

use super::{reply, EventHandler, HandlerContext};

/// Echoes the selected row back to the client.
pub struct RowSelectionHandler;

#[async_trait]
impl EventHandler for RowSelectionHandler {
    async fn handle(&self, event: Map, _ctx: &HandlerContext) -> MupResult<Option<Map>> {
        let row_data = event
            .get("row_data")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let row_index = event.get("row_index").cloned().unwrap_or(Value::Null);

        tracing::debug!("Row {row_index} selected");

        Ok(reply(json!({
            "status": "success",
            "selected_row": row_data,
            "row_index": row_index,
        })))
    }
}
