//! Inbound frame router.

use crate::connection::ConnectionContext;
use crate::protocol::{InboundFrame, ServerEvent};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Handler for one inbound frame kind.
#[async_trait]
pub trait FrameHandler: Send + Sync {
    /// Handle a frame. A returned event is sent back to the originating
    /// connection only.
    async fn handle(
        &self,
        ctx: &ConnectionContext,
        payload: serde_json::Value,
    ) -> Result<Option<ServerEvent>>;

    /// Whether a successful `handle` has written to storage.
    fn writes(&self) -> bool {
        false
    }
}

/// Outcome of a successfully dispatched frame.
#[derive(Debug, Default, PartialEq)]
pub struct Dispatched {
    /// Reply for the originating connection.
    pub reply: Option<ServerEvent>,

    /// Set when the handler completed a storage write.
    pub wrote: bool,
}

/// Dispatches inbound frames to handlers by their `type` tag.
///
/// The handler table is fixed once the gateway starts serving.
#[derive(Default)]
pub struct MessageRouter {
    handlers: HashMap<String, Arc<dyn FrameHandler>>,
}

impl MessageRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a frame kind, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, handler: Arc<dyn FrameHandler>) {
        self.handlers.insert(kind.into(), handler);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_handler(mut self, kind: impl Into<String>, handler: Arc<dyn FrameHandler>) -> Self {
        self.register(kind, handler);
        self
    }

    /// Parse a text frame and run its handler.
    ///
    /// Malformed frames are errors. Unknown kinds are logged and ignored.
    pub async fn dispatch(&self, ctx: &ConnectionContext, text: &str) -> Result<Dispatched> {
        let frame = InboundFrame::parse(text)?;

        let Some(handler) = self.handlers.get(&frame.kind) else {
            warn!(
                "Ignoring unknown frame type '{}' from connection {}",
                frame.kind, ctx.id
            );
            return Ok(Dispatched::default());
        };

        debug!("Dispatching {} frame (connection: {})", frame.kind, ctx.id);
        let reply = handler.handle(ctx, frame.payload).await?;
        Ok(Dispatched {
            reply,
            wrote: handler.writes(),
        })
    }

    /// Registered frame kinds, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.handlers.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
