//! `handle_field_validation`: live validation of a single field.

use async_trait::async_trait;
use serde_json::{json, Value};

use mup_components::{FieldValidator, Map};

use crate::types::MupResult;

use super::{form_rules, optional_str, reply, required_str, EventHandler, HandlerContext};

/// Validates one field against its form's rule, or the built-in
/// validator picked from the field name.
pub struct FieldValidationHandler;

#[async_trait]
impl EventHandler for FieldValidationHandler {
    async fn handle(&self, event: Map, ctx: &HandlerContext) -> MupResult<Option<Map>> {
        let field_name = required_str(&event, "field_name")?;
        let field_value = match event.get("field_value") {
            Some(Value::String(s)) => s.clone(),
            None | Some(Value::Null) => String::new(),
            Some(other) => other.to_string(),
        };

        let rule = match optional_str(&event, "component_id") {
            Some(form_id) => {
                let registry = ctx.registry.lock().await;
                registry
                    .get(form_id)
                    .and_then(|form| form_rules(form).remove(field_name))
            }
            None => None,
        };

        let outcome = match rule {
            Some(rule) => FieldValidator::validate_with_rule(field_name, &field_value, &rule),
            None => FieldValidator::validate_field(field_name, &field_value),
        };

        Ok(reply(json!({
            "field_name": field_name,
            "is_valid": outcome.valid,
            "error_message": outcome.message,
        })))
    }
}
