//! Inbound frame handlers.

pub mod chat;
pub mod notifications;

use crate::bridge::PersistenceBridge;
use crate::connection::ConnectionContext;
use crate::protocol::ServerEvent;
use crate::registry::GroupRegistry;
use crate::router::{FrameHandler, MessageRouter};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use chat::ChatMessageHandler;
pub use notifications::MarkReadHandler;

/// Shared state handed to frame handlers.
#[derive(Clone)]
pub struct HandlerContext {
    /// Storage access.
    pub bridge: PersistenceBridge,

    /// Group registry for fan-out.
    pub registry: Arc<GroupRegistry>,

    /// Maximum chat body length, in characters.
    pub max_body_chars: usize,
}

/// Register every built-in frame handler.
pub fn register_all(router: &mut MessageRouter, context: HandlerContext) {
    let ctx = Arc::new(context);

    router.register("chat_message", Arc::new(ChatMessageHandler::new(ctx.clone())));
    router.register("mark_read", Arc::new(MarkReadHandler::new(ctx)));
    router.register("ping", Arc::new(PingHandler));
}

/// Build a router with every built-in handler registered.
pub fn build_router(context: HandlerContext) -> MessageRouter {
    let mut router = MessageRouter::new();
    register_all(&mut router, context);
    router
}

/// Liveness probe.
pub struct PingHandler;

#[async_trait]
impl FrameHandler for PingHandler {
    async fn handle(
        &self,
        _ctx: &ConnectionContext,
        _payload: serde_json::Value,
    ) -> Result<Option<ServerEvent>> {
        Ok(Some(ServerEvent::Pong))
    }
}
