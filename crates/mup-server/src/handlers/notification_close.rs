//! `handle_notification_close`: remove a dismissed notification.

use async_trait::async_trait;
use serde_json::json;

use mup_components::Map;

use crate::types::MupResult;

use super::{reply, required_str, EventHandler, HandlerContext};

pub struct NotificationCloseHandler;

#[async_trait]
impl EventHandler for NotificationCloseHandler {
    async fn handle(&self, event: Map, ctx: &HandlerContext) -> MupResult<Option<Map>> {
        let notification_id = required_str(&event, "component_id")?;
        ctx.registry.lock().await.remove(notification_id)?;

        Ok(reply(json!({
            "status": "success",
            "notification_id": notification_id,
            "action": "removed",
        })))
    }
}
