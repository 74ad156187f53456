//! Per-connection lifecycle: join, receive loop, writer task, cleanup.

use crate::error::GatewayError;
use crate::protocol::ServerEvent;
use crate::registry::ConnectionHandle;
use crate::server::GatewayState;
use axum::extract::ws::{Message, WebSocket};
use coursehub_core::{ConnectionId, GroupName, Identity, RoomName};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// How long to wait for queued frames to flush after the receive loop ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Which channel a connection was opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelScope {
    /// `/ws/chat/{room}`.
    Room(RoomName),

    /// `/ws/notifications`.
    Personal,
}

/// Identity and routing info for one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Connection ID.
    pub id: ConnectionId,

    /// Authenticated caller.
    pub identity: Identity,

    /// Channel the connection was opened on.
    pub scope: ChannelScope,
}

impl ConnectionContext {
    /// Create a context for a freshly authenticated connection.
    pub fn new(identity: Identity, scope: ChannelScope) -> Self {
        Self {
            id: ConnectionId::new(),
            identity,
            scope,
        }
    }

    /// Group the connection joins on admission.
    pub fn home_group(&self) -> GroupName {
        match &self.scope {
            ChannelScope::Room(room) => GroupName::room(room),
            ChannelScope::Personal => GroupName::personal(&self.identity.username),
        }
    }
}

/// Fixed one-second window message counter.
struct RateWindow {
    limit: u64,
    started: Instant,
    count: u64,
}

impl RateWindow {
    fn new(limit: u64) -> Self {
        Self {
            limit,
            started: Instant::now(),
            count: 0,
        }
    }

    fn allow(&mut self) -> bool {
        if self.limit == 0 {
            return true;
        }
        let now = Instant::now();
        if now.duration_since(self.started) >= Duration::from_secs(1) {
            self.started = now;
            self.count = 0;
        }
        self.count += 1;
        self.count <= self.limit
    }
}

/// One reserved place under the gateway's connection limit.
///
/// Reserved before the upgrade is accepted and held for the connection's
/// lifetime. Dropping it frees the place, including when the upgrade never
/// completes.
#[derive(Debug)]
pub struct ConnectionSlot {
    counter: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    /// Reserve a slot, or `None` when `max` slots are already held.
    pub fn try_acquire(counter: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |held| {
                (held < max).then_some(held + 1)
            })
            .ok()
            .map(|_| Self {
                counter: counter.clone(),
            })
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Queue a frame for this connection. Returns false once the writer is gone.
async fn reply(tx: &mpsc::Sender<Arc<ServerEvent>>, event: ServerEvent) -> bool {
    tx.send(Arc::new(event)).await.is_ok()
}

/// Drive an admitted connection until it closes.
///
/// Frames are processed strictly in receipt order. The connection is removed
/// from every group before this returns, and `slot` is released last.
pub async fn run_connection(
    socket: WebSocket,
    state: Arc<GatewayState>,
    ctx: ConnectionContext,
    slot: ConnectionSlot,
) {
    let settings = &state.config.gateway;

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Arc<ServerEvent>>(settings.outbound_buffer.max(1));

    let home = ctx.home_group();
    state
        .registry
        .join(
            &home,
            ConnectionHandle {
                id: ctx.id,
                username: ctx.identity.username.clone(),
                tx: tx.clone(),
            },
        )
        .await;

    info!(
        "Connection {} opened for {} on {}",
        ctx.id, ctx.identity.username, home
    );

    let conn_id = ctx.id;
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = sink.send(Message::Text(event.to_text())).await {
                debug!("Write to connection {} failed: {}", conn_id, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut rate = RateWindow::new(settings.max_messages_per_second);
    let mut storage_failures: u32 = 0;

    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                let err = GatewayError::Malformed("binary frames are not supported".to_string());
                if !reply(&tx, ServerEvent::error(&err)).await {
                    break;
                }
                continue;
            }
            Ok(Message::Close(_)) => {
                debug!("Connection {} closed by client", ctx.id);
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket error on connection {}: {}", ctx.id, e);
                break;
            }
        };

        if !rate.allow() {
            warn!("Rate limit exceeded on connection {}", ctx.id);
            if !reply(&tx, ServerEvent::error(&GatewayError::RateLimited)).await {
                break;
            }
            continue;
        }

        match state.router.dispatch(&ctx, &text).await {
            Ok(outcome) => {
                if outcome.wrote {
                    storage_failures = 0;
                }
                if let Some(event) = outcome.reply {
                    if !reply(&tx, event).await {
                        break;
                    }
                }
            }
            Err(err) => {
                let fatal = if err.is_storage() {
                    storage_failures += 1;
                    storage_failures >= settings.max_storage_failures
                } else {
                    debug!("Rejected frame on connection {}: {}", ctx.id, err);
                    false
                };

                if !reply(&tx, ServerEvent::error(&err)).await {
                    break;
                }
                if fatal {
                    error!(
                        "Closing connection {} after {} consecutive storage failures",
                        ctx.id, storage_failures
                    );
                    break;
                }
            }
        }
    }

    let left = state.registry.leave_all(ctx.id).await;
    drop(tx);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        warn!("Writer for connection {} did not drain in time", ctx.id);
    }

    info!(
        "Connection {} closed for {} (left {} group(s))",
        ctx.id,
        ctx.identity.username,
        left.len()
    );
    drop(slot);
}
