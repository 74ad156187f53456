//! Bridge from async handlers to the blocking store.

use crate::Result;
use chrono::Utc;
use coursehub_core::{
    ChatMessage, Notification, NotificationPayload, RoomName, User, Username,
};
use coursehub_store::{Store, StoreError};
use std::sync::Arc;

/// Runs store calls on the blocking pool so the runtime never waits on I/O.
///
/// The awaited future completes only once the write is durable, which lets
/// callers broadcast strictly after persistence.
#[derive(Clone)]
pub struct PersistenceBridge {
    store: Arc<dyn Store>,
}

impl PersistenceBridge {
    /// Wrap a store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Run a blocking store call off the async runtime.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Store) -> coursehub_store::Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        let value = tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| StoreError::Unavailable(format!("storage task failed: {}", e)))??;
        Ok(value)
    }

    /// Persist a chat message.
    pub async fn record_chat_message(
        &self,
        room: RoomName,
        sender_id: i64,
        body: String,
    ) -> Result<ChatMessage> {
        self.run(move |store| store.insert_chat_message(&room, sender_id, &body))
            .await
    }

    /// Persist a notification.
    pub async fn record_notification(
        &self,
        recipient: Username,
        payload: NotificationPayload,
    ) -> Result<Notification> {
        self.run(move |store| store.insert_notification(&recipient, &payload))
            .await
    }

    /// Resolve a session token to its user.
    pub async fn resolve_session(&self, token: String) -> Result<Option<User>> {
        self.run(move |store| store.session_user(&token, Utc::now()))
            .await
    }

    /// Look up a user.
    pub async fn find_user(&self, username: Username) -> Result<Option<User>> {
        self.run(move |store| store.find_user(&username)).await
    }

    /// Recent messages of a room, oldest first.
    pub async fn history(&self, room: RoomName, limit: usize) -> Result<Vec<ChatMessage>> {
        self.run(move |store| store.recent_chat_messages(&room, limit))
            .await
    }

    /// A user's notifications, newest first.
    pub async fn notifications(
        &self,
        recipient: Username,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        self.run(move |store| store.list_notifications(&recipient, unread_only, limit))
            .await
    }

    /// Mark one notification, or all of them when `id` is `None`, as read.
    /// Returns the number of notifications changed.
    pub async fn mark_read(&self, recipient: Username, id: Option<i64>) -> Result<u64> {
        self.run(move |store| match id {
            Some(id) => store.mark_notification_read(&recipient, id).map(u64::from),
            None => store.mark_all_notifications_read(&recipient),
        })
        .await
    }
}
