//! Storage trait.

use crate::Result;
use chrono::{DateTime, Duration, Utc};
use coursehub_core::{
    ChatMessage, Notification, NotificationPayload, RoomName, Session, User, Username,
};

/// Durable storage used by the gateway.
///
/// Every method is blocking. Async callers must cross into the blocking
/// pool before calling (see the gateway's persistence bridge).
pub trait Store: Send + Sync + 'static {
    /// Register a user.
    fn create_user(&self, username: &Username, full_name: &str) -> Result<User>;

    /// Look up a user by username.
    fn find_user(&self, username: &Username) -> Result<Option<User>>;

    /// All users, ordered by username.
    fn list_users(&self) -> Result<Vec<User>>;

    /// Issue a session for a user. `ttl` of `None` never expires.
    fn create_session(&self, user_id: i64, ttl: Option<Duration>) -> Result<Session>;

    /// Resolve a session token to its user, if the session is live at `now`.
    fn session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>>;

    /// Delete a session. Returns whether it existed.
    fn revoke_session(&self, token: &str) -> Result<bool>;

    /// Store a chat message.
    fn insert_chat_message(&self, room: &RoomName, sender_id: i64, body: &str)
        -> Result<ChatMessage>;

    /// Latest `limit` messages of a room, oldest first.
    fn recent_chat_messages(&self, room: &RoomName, limit: usize) -> Result<Vec<ChatMessage>>;

    /// Number of stored messages in a room.
    fn count_chat_messages(&self, room: &RoomName) -> Result<u64>;

    /// Store a notification for a recipient.
    fn insert_notification(
        &self,
        recipient: &Username,
        payload: &NotificationPayload,
    ) -> Result<Notification>;

    /// A recipient's notifications, newest first.
    fn list_notifications(
        &self,
        recipient: &Username,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>>;

    /// Mark one of the recipient's notifications read. Returns whether a row changed.
    fn mark_notification_read(&self, recipient: &Username, id: i64) -> Result<bool>;

    /// Mark all of the recipient's notifications read. Returns the number changed.
    fn mark_all_notifications_read(&self, recipient: &Username) -> Result<u64>;

    /// Number of notifications stored for a recipient.
    fn count_notifications(&self, recipient: &Username) -> Result<u64>;

    /// Remove all chat messages and notifications.
    fn clear_activity(&self) -> Result<()>;
}
