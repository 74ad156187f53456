//! Shared fixtures for the integration tests.
//!
//! [`TestGateway::start`] runs a real gateway on an ephemeral port over a
//! SQLite file in a temporary directory, with a few users and sessions
//! already in place. Writes can be made to fail with
//! [`TestGateway::fail_writes`].

use chrono::{DateTime, Duration as TtlDuration, Utc};
use coursehub_core::{
    ChatMessage, Config, Notification, NotificationPayload, RoomName, Session, User, Username,
};
use coursehub_gateway::{Gateway, ServerEvent};
use coursehub_store::{SqliteStore, Store, StoreError};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// How long tests wait for a frame before giving up.
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Client side of a gateway WebSocket.
pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A seeded user with a live session.
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn username(&self) -> &Username {
        &self.user.username
    }
}

/// A gateway serving on localhost.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub gateway: Arc<Gateway>,
    pub store: Arc<dyn Store>,
    pub instructor: TestUser,
    pub student: TestUser,
    pub other: TestUser,
    outage: Arc<OutageStore>,
    server: JoinHandle<()>,
    _dir: TempDir,
}

/// SQLite store whose chat and notification writes fail while an outage is
/// switched on. Reads and sessions keep working.
pub struct OutageStore {
    inner: SqliteStore,
    down: AtomicBool,
}

impl OutageStore {
    fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            down: AtomicBool::new(false),
        }
    }

    fn check(&self) -> coursehub_store::Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("database offline".to_string()));
        }
        Ok(())
    }
}

impl Store for OutageStore {
    fn create_user(&self, username: &Username, full_name: &str) -> coursehub_store::Result<User> {
        self.inner.create_user(username, full_name)
    }

    fn find_user(&self, username: &Username) -> coursehub_store::Result<Option<User>> {
        self.inner.find_user(username)
    }

    fn list_users(&self) -> coursehub_store::Result<Vec<User>> {
        self.inner.list_users()
    }

    fn create_session(
        &self,
        user_id: i64,
        ttl: Option<TtlDuration>,
    ) -> coursehub_store::Result<Session> {
        self.inner.create_session(user_id, ttl)
    }

    fn session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> coursehub_store::Result<Option<User>> {
        self.inner.session_user(token, now)
    }

    fn revoke_session(&self, token: &str) -> coursehub_store::Result<bool> {
        self.inner.revoke_session(token)
    }

    fn insert_chat_message(
        &self,
        room: &RoomName,
        sender_id: i64,
        body: &str,
    ) -> coursehub_store::Result<ChatMessage> {
        self.check()?;
        self.inner.insert_chat_message(room, sender_id, body)
    }

    fn recent_chat_messages(
        &self,
        room: &RoomName,
        limit: usize,
    ) -> coursehub_store::Result<Vec<ChatMessage>> {
        self.inner.recent_chat_messages(room, limit)
    }

    fn count_chat_messages(&self, room: &RoomName) -> coursehub_store::Result<u64> {
        self.inner.count_chat_messages(room)
    }

    fn insert_notification(
        &self,
        recipient: &Username,
        payload: &NotificationPayload,
    ) -> coursehub_store::Result<Notification> {
        self.check()?;
        self.inner.insert_notification(recipient, payload)
    }

    fn list_notifications(
        &self,
        recipient: &Username,
        unread_only: bool,
        limit: usize,
    ) -> coursehub_store::Result<Vec<Notification>> {
        self.inner.list_notifications(recipient, unread_only, limit)
    }

    fn mark_notification_read(&self, recipient: &Username, id: i64) -> coursehub_store::Result<bool> {
        self.check()?;
        self.inner.mark_notification_read(recipient, id)
    }

    fn mark_all_notifications_read(&self, recipient: &Username) -> coursehub_store::Result<u64> {
        self.check()?;
        self.inner.mark_all_notifications_read(recipient)
    }

    fn count_notifications(&self, recipient: &Username) -> coursehub_store::Result<u64> {
        self.inner.count_notifications(recipient)
    }

    fn clear_activity(&self) -> coursehub_store::Result<()> {
        self.inner.clear_activity()
    }
}

fn add_user(store: &dyn Store, username: &str, full_name: &str) -> TestUser {
    let user = store
        .create_user(&Username::new(username).unwrap(), full_name)
        .unwrap();
    let token = store.create_session(user.id, None).unwrap().token;
    TestUser { user, token }
}

impl TestGateway {
    /// Start with the default configuration.
    pub async fn start() -> Self {
        Self::start_with(Config::default()).await
    }

    /// Start with a custom configuration. Bind address and port are ignored.
    pub async fn start_with(config: Config) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let sqlite = SqliteStore::open(dir.path().join("coursehub.db")).unwrap();
        let outage = Arc::new(OutageStore::new(sqlite));
        let store: Arc<dyn Store> = outage.clone();

        let instructor = add_user(store.as_ref(), "prof_davis", "James Davis");
        let student = add_user(store.as_ref(), "emma1", "Emma Brown");
        let other = add_user(store.as_ref(), "liam", "");

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let gateway = Arc::new(Gateway::new(config, store.clone()));
        let serving = gateway.clone();
        let server = tokio::spawn(async move {
            if let Err(e) = serving.serve(listener).await {
                eprintln!("gateway stopped: {}", e);
            }
        });

        Self {
            addr,
            gateway,
            store,
            instructor,
            student,
            other,
            outage,
            server,
            _dir: dir,
        }
    }

    /// Make chat and notification writes fail until switched back off.
    pub fn fail_writes(&self, down: bool) {
        self.outage.down.store(down, Ordering::SeqCst);
    }

    /// WebSocket URL for `path`, authenticated with `token` when given.
    pub fn ws_url(&self, path: &str, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}{}?token={}", self.addr, path, token),
            None => format!("ws://{}{}", self.addr, path),
        }
    }

    /// Join a chat room as `user`.
    pub async fn join_room(&self, room: &str, user: &TestUser) -> Client {
        let url = self.ws_url(&format!("/ws/chat/{}", room), Some(&user.token));
        let (client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        client
    }

    /// Open `user`'s personal notification channel.
    pub async fn open_notifications(&self, user: &TestUser) -> Client {
        let url = self.ws_url("/ws/notifications", Some(&user.token));
        let (client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        client
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Send a JSON frame.
pub async fn send_json(client: &mut Client, value: serde_json::Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

/// Next server frame, skipping control frames. Panics on timeout or close.
pub async fn next_event(client: &mut Client) -> ServerEvent {
    loop {
        let message = tokio::time::timeout(FRAME_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .expect("websocket error");

        match message {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Close(frame) => panic!("connection closed: {:?}", frame),
            _ => continue,
        }
    }
}

/// Round-trip a ping. Once the pong arrives the connection's group
/// membership is in place.
pub async fn ping(client: &mut Client) {
    send_json(client, serde_json::json!({"type": "ping"})).await;
    assert_eq!(next_event(client).await, ServerEvent::Pong);
}

/// Wait for the server to close the connection. Text frames received first
/// are returned.
pub async fn expect_close(client: &mut Client) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    loop {
        let message = tokio::time::timeout(FRAME_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for the connection to close");

        match message {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return events,
            Some(Ok(Message::Text(text))) => events.push(serde_json::from_str(&text).unwrap()),
            Some(Ok(_)) => continue,
        }
    }
}

/// Assert nothing arrives within `wait`.
pub async fn assert_silent(client: &mut Client, wait: Duration) {
    if let Ok(Some(Ok(Message::Text(text)))) = tokio::time::timeout(wait, client.next()).await {
        panic!("unexpected frame: {}", text);
    }
}
