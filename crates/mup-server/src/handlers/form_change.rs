//! `handle_form_change`: record an edited field value on the form.

use async_trait::async_trait;
use serde_json::{json, Value};

use mup_components::Map;

use crate::types::MupResult;

use super::{object_prop, reply, required_str, EventHandler, HandlerContext};

pub struct FormChangeHandler;

#[async_trait]
impl EventHandler for FormChangeHandler {
    async fn handle(&self, event: Map, ctx: &HandlerContext) -> MupResult<Option<Map>> {
        let component_id = required_str(&event, "component_id")?;
        let field_name = required_str(&event, "field_name")?;
        let value = event
            .get("value")
            .or_else(|| event.get("field_value"))
            .cloned()
            .unwrap_or(Value::Null);

        let mut registry = ctx.registry.lock().await;
        let mut values = registry
            .get(component_id)
            .map(|form| object_prop(form, "values"))
            .unwrap_or_default();
        values.insert(field_name.to_string(), value);

        let mut patch = Map::new();
        patch.insert("values".to_string(), Value::Object(values));
        registry.update(component_id, &patch)?;

        Ok(reply(json!({
            "status": "success",
            "component_id": component_id,
            "field_name": field_name,
        })))
    }
}
