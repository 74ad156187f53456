//! Chat message handler.

use super::HandlerContext;
use crate::connection::{ChannelScope, ConnectionContext};
use crate::error::GatewayError;
use crate::protocol::{InboundFrame, ServerEvent};
use crate::router::FrameHandler;
use crate::Result;
use async_trait::async_trait;
use coursehub_core::GroupName;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};

/// Body of a `chat_message` frame. Any other field, including a claimed
/// sender, is ignored.
#[derive(Debug, Deserialize)]
struct ChatBody {
    #[serde(alias = "message")]
    body: String,
}

/// Persists a chat message, then broadcasts it to the room.
pub struct ChatMessageHandler {
    context: Arc<HandlerContext>,
}

impl ChatMessageHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    fn validate_body<'a>(&self, body: &'a str) -> Result<&'a str> {
        let body = body.trim();
        if body.is_empty() {
            return Err(GatewayError::Malformed("message body is empty".to_string()));
        }
        if body.chars().count() > self.context.max_body_chars {
            return Err(GatewayError::Malformed(format!(
                "message body exceeds {} characters",
                self.context.max_body_chars
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl FrameHandler for ChatMessageHandler {
    fn writes(&self) -> bool {
        true
    }

    async fn handle(
        &self,
        ctx: &ConnectionContext,
        payload: serde_json::Value,
    ) -> Result<Option<ServerEvent>> {
        let room = match &ctx.scope {
            ChannelScope::Room(room) => room.clone(),
            ChannelScope::Personal => {
                return Err(GatewayError::Malformed(
                    "chat messages can only be sent on a room channel".to_string(),
                ))
            }
        };

        let ChatBody { body } = InboundFrame::decode(payload)?;
        let body = self.validate_body(&body)?.to_string();

        // Durable before anyone sees it
        let message = self
            .context
            .bridge
            .record_chat_message(room.clone(), ctx.identity.user_id, body)
            .await
            .map_err(|e| {
                error!("Failed to store chat message in {}: {}", room, e);
                e
            })?;

        let delivered = self
            .context
            .registry
            .broadcast(&GroupName::room(&room), ServerEvent::chat(&message))
            .await;
        debug!(
            "Chat message {} from {} delivered to {} member(s) of {}",
            message.id, ctx.identity.username, delivered, room
        );

        Ok(None)
    }
}
