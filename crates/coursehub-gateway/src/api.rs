//! HTTP API: chat history, notifications and domain event submission.

use crate::error::GatewayError;
use crate::protocol::ServerEvent;
use crate::server::GatewayState;
use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use coursehub_core::{DomainEvent, Identity, RoomName};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Notifications returned when no limit is given.
const DEFAULT_NOTIFICATION_LIMIT: usize = 100;

/// API routes, mounted by the server.
pub fn routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/chat/:room/history", get(history_handler))
        .route("/api/notifications", get(list_notifications_handler))
        .route("/api/notifications/mark_read", post(mark_read_handler))
        .route("/api/events", post(submit_event_handler))
}

/// Extractor for the authenticated caller of an API request.
pub struct Authenticated(pub Identity);

#[axum::async_trait]
impl FromRequestParts<Arc<GatewayState>> for Authenticated {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = state.authenticate(&parts.headers, parts.uri.query()).await?;
        Ok(Self(identity))
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn history_handler(
    Authenticated(identity): Authenticated,
    Path(room): Path<String>,
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<GatewayState>>,
) -> Result<impl IntoResponse, GatewayError> {
    let room = RoomName::new(room)?;
    let cap = state.config.gateway.history_limit;
    let limit = query.limit.unwrap_or(cap).min(cap);

    let messages = state.bridge.history(room.clone(), limit).await?;
    debug!(
        "{} fetched {} message(s) of {}",
        identity.username,
        messages.len(),
        room
    );

    let messages: Vec<ServerEvent> = messages.iter().map(ServerEvent::chat).collect();
    Ok(Json(serde_json::json!({
        "room": room,
        "messages": messages,
    })))
}

#[derive(Debug, Deserialize)]
struct NotificationsQuery {
    #[serde(default)]
    unread: bool,
    limit: Option<usize>,
}

async fn list_notifications_handler(
    Authenticated(identity): Authenticated,
    Query(query): Query<NotificationsQuery>,
    State(state): State<Arc<GatewayState>>,
) -> Result<impl IntoResponse, GatewayError> {
    let limit = query.limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT);
    let notifications = state
        .bridge
        .notifications(identity.username, query.unread, limit)
        .await?;

    Ok(Json(serde_json::json!({ "notifications": notifications })))
}

#[derive(Debug, Default, Deserialize)]
struct MarkReadRequest {
    #[serde(default)]
    id: Option<i64>,
}

async fn mark_read_handler(
    Authenticated(identity): Authenticated,
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<MarkReadRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let updated = state.bridge.mark_read(identity.username, request.id).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

#[derive(Debug, Deserialize)]
struct EventQuery {
    #[serde(default)]
    suppress: bool,
}

/// Bind an event's acting user to the caller.
///
/// An event naming someone else as its actor is refused. The caller's own
/// display name replaces whatever the body claimed.
fn bind_actor(identity: &Identity, event: &mut DomainEvent) -> Result<(), GatewayError> {
    let kind = event.name();
    let Some(actor) = event.actor_mut() else {
        return Ok(());
    };
    if actor.username != identity.username {
        warn!(
            "{} tried to submit a {} event as {}",
            identity.username, kind, actor.username
        );
        return Err(GatewayError::Forbidden(format!(
            "cannot submit events on behalf of {}",
            actor.username
        )));
    }
    actor.full_name = identity.full_name.clone();
    Ok(())
}

async fn submit_event_handler(
    Authenticated(identity): Authenticated,
    Query(query): Query<EventQuery>,
    State(state): State<Arc<GatewayState>>,
    Json(mut event): Json<DomainEvent>,
) -> Result<impl IntoResponse, GatewayError> {
    bind_actor(&identity, &mut event)?;

    debug!("{} submitted {} event", identity.username, event.name());
    let queued = state.emitter.emit(event, query.suppress);
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "queued": queued })),
    ))
}
