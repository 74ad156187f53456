//! WebSocket chat and notification gateway for CourseHub.
//!
//! This crate provides:
//! - Chat room and personal notification WebSocket channels
//! - A process-wide group registry with atomic join/leave/broadcast
//! - A tag-dispatched inbound message router
//! - A persistence bridge that moves blocking storage calls off the runtime
//! - A typed domain-event bus feeding notifications and announcements
//! - A small HTTP API for history, notifications and event submission

pub mod api;
pub mod auth;
pub mod bridge;
pub mod connection;
pub mod error;
pub mod events;
pub mod handlers;
pub mod notify;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;


pub use auth::{Authenticator, Credentials, SessionAuthenticator};
pub use bridge::PersistenceBridge;
pub use connection::{ChannelScope, ConnectionContext, ConnectionSlot};
pub use error::GatewayError;
pub use events::{event_bus, Emitter, EventDispatcher, EventSubscriber};
pub use notify::{Notifier, NotifyOutcome, Target};
pub use protocol::{InboundFrame, ServerEvent};
pub use registry::{ConnectionHandle, GroupRegistry};
pub use router::{Dispatched, FrameHandler, MessageRouter};
pub use server::{Gateway, GatewayState};

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
