//! Notification read-state handler.

use super::HandlerContext;
use crate::connection::ConnectionContext;
use crate::protocol::{InboundFrame, ServerEvent};
use crate::router::FrameHandler;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct MarkReadParams {
    /// Notification to mark. All of the caller's notifications when absent.
    #[serde(default)]
    id: Option<i64>,
}

/// Marks the caller's notifications read.
pub struct MarkReadHandler {
    context: Arc<HandlerContext>,
}

impl MarkReadHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl FrameHandler for MarkReadHandler {
    fn writes(&self) -> bool {
        true
    }

    async fn handle(
        &self,
        ctx: &ConnectionContext,
        payload: serde_json::Value,
    ) -> Result<Option<ServerEvent>> {
        let params: MarkReadParams = InboundFrame::decode(payload)?;

        let updated = self
            .context
            .bridge
            .mark_read(ctx.identity.username.clone(), params.id)
            .await?;
        debug!("Marked {} notification(s) read for {}", updated, ctx.identity.username);

        Ok(Some(ServerEvent::Ack {
            action: "mark_read".to_string(),
            updated,
        }))
    }
}
