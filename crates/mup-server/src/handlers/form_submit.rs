//! `handle_form_submit`: validate submitted form data and confirm.

use async_trait::async_trait;
use serde_json::{json, Value};

use mup_components::builder::{NotificationConfig, NotificationKind};
use mup_components::{ComponentBuilder, FieldValidator, Map};

use crate::types::{MupError, MupResult};

use super::{form_rules, optional_str, reply, EventHandler, HandlerContext};

/// Validates `form_data` and, on success, posts a success notification.
pub struct FormSubmitHandler;

#[async_trait]
impl EventHandler for FormSubmitHandler {
    async fn handle(&self, event: Map, ctx: &HandlerContext) -> MupResult<Option<Map>> {
        let form_data = match event.get("form_data") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(data)) => data.clone(),
            Some(_) => {
                return Err(MupError::InvalidParams(
                    "form_data must be an object".to_string(),
                ))
            }
        };
        let component_id = optional_str(&event, "component_id");

        let mut registry = ctx.registry.lock().await;
        let rules = component_id
            .and_then(|id| registry.get(id))
            .map(form_rules)
            .unwrap_or_default();

        let mut field_errors = Map::new();
        for (field, value) in &form_data {
            let Some(text) = value.as_str() else {
                continue;
            };
            let outcome = match rules.get(field) {
                Some(rule) => FieldValidator::validate_with_rule(field, text, rule),
                None if field.to_ascii_lowercase().contains("email") => {
                    FieldValidator::validate_email(text)
                }
                None => continue,
            };
            if let (false, Some(message)) = (outcome.valid, outcome.message) {
                field_errors.insert(field.clone(), Value::String(message));
            }
        }

        if !field_errors.is_empty() {
            tracing::info!(
                "Form {} rejected: {} invalid field(s)",
                component_id.unwrap_or("<unnamed>"),
                field_errors.len()
            );
            return Ok(reply(json!({
                "status": "error",
                "message": "Form validation failed",
                "field_errors": field_errors,
            })));
        }

        let notification = ComponentBuilder::notification(
            &format!("notification_{}", uuid::Uuid::new_v4().simple()),
            NotificationConfig {
                message: "Form submitted successfully!".to_string(),
                kind: NotificationKind::Success,
                ..NotificationConfig::default()
            },
        );
        let notification_value = notification.to_value();
        registry.insert(notification);

        tracing::info!(
            "Form {} submitted by {} ({} field(s))",
            component_id.unwrap_or("<unnamed>"),
            ctx.security.user_id,
            form_data.len()
        );
        Ok(reply(json!({
            "status": "success",
            "message": "Form submitted successfully",
            "ui_updates": [notification_value],
        })))
    }
}
