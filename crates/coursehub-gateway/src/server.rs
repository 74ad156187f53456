//! WebSocket and HTTP gateway server.

use crate::api;
use crate::auth::{Authenticator, Credentials, SessionAuthenticator};
use crate::bridge::PersistenceBridge;
use crate::connection::{run_connection, ChannelScope, ConnectionContext, ConnectionSlot};
use crate::error::GatewayError;
use crate::events::{default_subscribers, event_bus, Emitter, EventDispatcher};
use crate::handlers::{self, HandlerContext};
use crate::notify::Notifier;
use crate::registry::GroupRegistry;
use crate::router::MessageRouter;
use crate::Result;
use axum::{
    extract::{ConnectInfo, Path, RawQuery, State, WebSocketUpgrade},
    http::{header, HeaderMap, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use coursehub_core::config::BindMode;
use coursehub_core::{Config, Identity, RoomName};
use coursehub_store::Store;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared gateway state.
pub struct GatewayState {
    /// Configuration.
    pub config: Config,

    /// Group membership.
    pub registry: Arc<GroupRegistry>,

    /// Storage access.
    pub bridge: PersistenceBridge,

    /// Resolves request credentials.
    pub authenticator: Arc<dyn Authenticator>,

    /// Inbound frame router.
    pub router: Arc<MessageRouter>,

    /// Domain event emitter.
    pub emitter: Emitter,

    /// Notification delivery.
    pub notifier: Notifier,

    /// Reserved connection slots.
    connections: Arc<AtomicUsize>,
}

impl GatewayState {
    /// Number of live or admitted WebSocket connections.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Authenticate a request from its headers and query string.
    pub async fn authenticate(&self, headers: &HeaderMap, query: Option<&str>) -> Result<Identity> {
        let credentials = Credentials::from_parts(headers, query, &self.config.auth.cookie_name)
            .ok_or_else(|| GatewayError::Auth("no session credentials".to_string()))?;
        self.authenticator.authenticate(&credentials).await
    }

    /// Validate the WebSocket `Origin` header against the allow-list.
    fn validate_origin(&self, headers: &HeaderMap) -> bool {
        let allowed = &self.config.gateway.allowed_origins;
        if allowed.is_empty() {
            return true;
        }

        let origin = match headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
            Some(o) => o,
            None => return true, // Non-browser client
        };

        if allowed.iter().any(|a| a == origin) {
            return true;
        }

        warn!("Rejected WebSocket connection from untrusted origin: {}", origin);
        false
    }

    /// Capacity, origin and authentication checks for a WebSocket upgrade.
    ///
    /// The returned slot counts against `max_connections` until dropped. A
    /// rejected request releases its slot on return.
    async fn admit(
        &self,
        headers: &HeaderMap,
        query: Option<&str>,
        addr: SocketAddr,
    ) -> Result<(Identity, ConnectionSlot)> {
        let max = self.config.gateway.max_connections;
        let slot = ConnectionSlot::try_acquire(&self.connections, max).ok_or_else(|| {
            warn!("Max connections ({}) reached, rejecting {}", max, addr);
            GatewayError::Unavailable("connection limit reached".to_string())
        })?;

        if !self.validate_origin(headers) {
            return Err(GatewayError::Forbidden("origin not allowed".to_string()));
        }

        let identity = self.authenticate(headers, query).await.map_err(|e| {
            warn!("Authentication failed from {}: {}", addr, e);
            e
        })?;
        Ok((identity, slot))
    }
}

/// The chat and notification gateway.
pub struct Gateway {
    state: Arc<GatewayState>,
    dispatcher: Mutex<Option<EventDispatcher>>,
}

impl Gateway {
    /// Create a gateway over a store, with the default handlers and event
    /// subscribers.
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let bridge = PersistenceBridge::new(store);
        let registry = Arc::new(GroupRegistry::new());
        let notifier = Notifier::new(bridge.clone(), registry.clone());
        let (emitter, dispatcher) = event_bus(default_subscribers(&notifier));

        let router = handlers::build_router(HandlerContext {
            bridge: bridge.clone(),
            registry: registry.clone(),
            max_body_chars: config.gateway.max_body_chars,
        });

        let state = Arc::new(GatewayState {
            authenticator: Arc::new(SessionAuthenticator::new(bridge.clone())),
            router: Arc::new(router),
            config,
            registry,
            bridge,
            emitter,
            notifier,
            connections: Arc::new(AtomicUsize::new(0)),
        });

        Self {
            state,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Shared state.
    pub fn state(&self) -> &Arc<GatewayState> {
        &self.state
    }

    /// Handle for raising domain events.
    pub fn emitter(&self) -> Emitter {
        self.state.emitter.clone()
    }

    /// Notification delivery for in-process callers.
    pub fn notifier(&self) -> Notifier {
        self.state.notifier.clone()
    }

    /// Group registry.
    pub fn registry(&self) -> &Arc<GroupRegistry> {
        &self.state.registry
    }

    /// Run the gateway on the configured address.
    pub async fn run(&self) -> Result<()> {
        let addr = self.bind_address();

        if self.state.config.gateway.bind != BindMode::Loopback {
            warn!("Gateway binding to {}; it is reachable from the network", addr);
        }

        let listener = TcpListener::bind(addr).await.map_err(GatewayError::Io)?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let dispatcher = self
            .dispatcher
            .lock()
            .take()
            .ok_or_else(|| GatewayError::Internal("gateway is already serving".to_string()))?;
        tokio::spawn(dispatcher.run());

        let addr = listener.local_addr().map_err(GatewayError::Io)?;
        info!("Starting gateway server on {}", addr);

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

        Ok(())
    }

    /// Build the HTTP router.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/ws/chat/:room", get(chat_ws_handler))
            .route("/ws/notifications", get(notifications_ws_handler))
            .route("/health", get(health_handler))
            .merge(api::routes())
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.state.config.gateway.cors {
            router = router.layer(Self::create_cors_layer(&self.state.config));
        }

        router
    }

    fn create_cors_layer(config: &Config) -> CorsLayer {
        let origins = &config.gateway.allowed_origins;
        let allow_origin = if origins.is_empty() {
            AllowOrigin::from(Any)
        } else {
            AllowOrigin::list(
                origins
                    .iter()
                    .filter_map(|o| HeaderValue::from_str(o).ok())
                    .collect::<Vec<_>>(),
            )
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .max_age(std::time::Duration::from_secs(3600))
    }

    fn bind_address(&self) -> SocketAddr {
        let ip = match self.state.config.gateway.bind {
            BindMode::Loopback => [127, 0, 0, 1],
            BindMode::Lan => [0, 0, 0, 0],
        };

        SocketAddr::from((ip, self.state.config.gateway.port))
    }
}

/// `/ws/chat/{room}` upgrade handler.
async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    let room = match RoomName::new(room) {
        Ok(room) => room,
        Err(e) => {
            debug!("Rejected chat upgrade from {}: {}", addr, e);
            return GatewayError::from(e).into_response();
        }
    };

    match state.admit(&headers, query.as_deref(), addr).await {
        Ok((identity, slot)) => {
            let ctx = ConnectionContext::new(identity, ChannelScope::Room(room));
            ws.on_upgrade(move |socket| run_connection(socket, state, ctx, slot))
        }
        Err(e) => e.into_response(),
    }
}

/// `/ws/notifications` upgrade handler.
async fn notifications_ws_handler(
    ws: WebSocketUpgrade,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    match state.admit(&headers, query.as_deref(), addr).await {
        Ok((identity, slot)) => {
            let ctx = ConnectionContext::new(identity, ChannelScope::Personal);
            ws.on_upgrade(move |socket| run_connection(socket, state, ctx, slot))
        }
        Err(e) => e.into_response(),
    }
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.connection_count(),
        "groups": state.registry.group_count().await,
    }))
}
