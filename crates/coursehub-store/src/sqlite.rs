//! SQLite-backed store.

use crate::schema;
use crate::store::Store;
use crate::{Result, StoreError};
use chrono::{DateTime, Duration, Utc};
use coursehub_core::{
    ChatMessage, Notification, NotificationKind, NotificationPayload, RoomName, SenderInfo,
    Session, User, Username,
};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

/// Bytes of randomness in a session token.
const TOKEN_BYTES: usize = 32;

/// SQLite store guarded by a single connection mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        schema::init(&conn)?;
        info!("Opened database at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn user_id(conn: &Connection, username: &Username) -> Result<i64> {
        conn.query_row(
            "SELECT id FROM users WHERE username = ?1",
            params![username.as_str()],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::UnknownUser(username.to_string()))
    }
}

impl Store for SqliteStore {
    fn create_user(&self, username: &Username, full_name: &str) -> Result<User> {
        let conn = self.conn.lock();
        let now = Utc::now();

        match conn.execute(
            "INSERT INTO users (username, full_name, created_at) VALUES (?1, ?2, ?3)",
            params![username.as_str(), full_name, now],
        ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::DuplicateUser(username.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        debug!("Created user {}", username);
        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.clone(),
            full_name: full_name.to_string(),
            created_at: now,
        })
    }

    fn find_user(&self, username: &Username) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                "SELECT id, username, full_name, created_at FROM users WHERE username = ?1",
                params![username.as_str()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, username, full_name, created_at FROM users ORDER BY username")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    fn create_session(&self, user_id: i64, ttl: Option<Duration>) -> Result<Session> {
        let conn = self.conn.lock();
        let now = Utc::now();
        let session = Session {
            token: new_token(),
            user_id,
            created_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        };

        match conn.execute(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![session.token, user_id, session.created_at, session.expires_at],
        ) {
            Ok(_) => Ok(session),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::UnknownUser(format!("id {}", user_id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT u.id, u.username, u.full_name, u.created_at, s.expires_at
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
                params![token],
                |row| {
                    let user = user_from_row(row)?;
                    let expires_at: Option<DateTime<Utc>> = row.get(4)?;
                    Ok((user, expires_at))
                },
            )
            .optional()?;

        Ok(match row {
            Some((user, Some(expires_at))) if expires_at <= now => {
                debug!("Session for {} expired at {}", user.username, expires_at);
                None
            }
            Some((user, _)) => Some(user),
            None => None,
        })
    }

    fn revoke_session(&self, token: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(removed > 0)
    }

    fn insert_chat_message(
        &self,
        room: &RoomName,
        sender_id: i64,
        body: &str,
    ) -> Result<ChatMessage> {
        let conn = self.conn.lock();
        let (username, full_name): (String, String) = conn
            .query_row(
                "SELECT username, full_name FROM users WHERE id = ?1",
                params![sender_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| StoreError::UnknownUser(format!("id {}", sender_id)))?;

        let now = Utc::now();
        conn.execute(
            "INSERT INTO chat_messages (room_name, sender_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![room.as_str(), sender_id, body, now],
        )?;

        let username =
            Username::new(username).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let display_name = display_or_username(full_name, &username);

        Ok(ChatMessage {
            id: conn.last_insert_rowid(),
            room: room.clone(),
            sender_id,
            sender: SenderInfo {
                username,
                display_name,
            },
            body: body.to_string(),
            created_at: now,
        })
    }

    fn recent_chat_messages(&self, room: &RoomName, limit: usize) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT m.id, m.room_name, m.sender_id, u.username, u.full_name, m.content, m.created_at
             FROM chat_messages m JOIN users u ON u.id = m.sender_id
             WHERE m.room_name = ?1
             ORDER BY m.id DESC
             LIMIT ?2",
        )?;

        let mut messages = stmt
            .query_map(params![room.as_str(), limit as i64], chat_message_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        messages.reverse();
        Ok(messages)
    }

    fn count_chat_messages(&self, room: &RoomName) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chat_messages WHERE room_name = ?1",
            params![room.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn insert_notification(
        &self,
        recipient: &Username,
        payload: &NotificationPayload,
    ) -> Result<Notification> {
        let conn = self.conn.lock();
        let recipient_id = Self::user_id(&conn, recipient)?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO notifications (recipient_id, kind, message, is_read, course_id, created_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5)",
            params![
                recipient_id,
                payload.kind.as_str(),
                payload.message,
                payload.course_id,
                now
            ],
        )?;

        Ok(Notification {
            id: conn.last_insert_rowid(),
            recipient: recipient.clone(),
            kind: payload.kind,
            message: payload.message.clone(),
            is_read: false,
            course_id: payload.course_id.clone(),
            created_at: now,
        })
    }

    fn list_notifications(
        &self,
        recipient: &Username,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT n.id, u.username, n.kind, n.message, n.is_read, n.course_id, n.created_at
             FROM notifications n JOIN users u ON u.id = n.recipient_id
             WHERE u.username = ?1 AND (?2 = 0 OR n.is_read = 0)
             ORDER BY n.id DESC
             LIMIT ?3",
        )?;

        let notifications = stmt
            .query_map(
                params![recipient.as_str(), unread_only, limit as i64],
                notification_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notifications)
    }

    fn mark_notification_read(&self, recipient: &Username, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE notifications SET is_read = 1
             WHERE id = ?1 AND is_read = 0
               AND recipient_id = (SELECT id FROM users WHERE username = ?2)",
            params![id, recipient.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn mark_all_notifications_read(&self, recipient: &Username) -> Result<u64> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE notifications SET is_read = 1
             WHERE is_read = 0
               AND recipient_id = (SELECT id FROM users WHERE username = ?1)",
            params![recipient.as_str()],
        )?;
        Ok(changed as u64)
    }

    fn count_notifications(&self, recipient: &Username) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications n JOIN users u ON u.id = n.recipient_id
             WHERE u.username = ?1",
            params![recipient.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn clear_activity(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch("DELETE FROM chat_messages; DELETE FROM notifications;")?;
        info!("Cleared chat messages and notifications");
        Ok(())
    }
}

fn new_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    hex::encode(bytes)
}

fn display_or_username(full_name: String, username: &Username) -> String {
    if full_name.trim().is_empty() {
        username.to_string()
    } else {
        full_name.trim().to_string()
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn username_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Username> {
    let raw: String = row.get(idx)?;
    Username::new(raw).map_err(|e| conversion_error(idx, e))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: username_at(row, 1)?,
        full_name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn chat_message_from_row(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let raw_room: String = row.get(1)?;
    let room = RoomName::new(raw_room).map_err(|e| conversion_error(1, e))?;
    let username = username_at(row, 3)?;
    let full_name: String = row.get(4)?;

    Ok(ChatMessage {
        id: row.get(0)?,
        room,
        sender_id: row.get(2)?,
        sender: SenderInfo {
            display_name: display_or_username(full_name, &username),
            username,
        },
        body: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let raw_kind: String = row.get(2)?;
    let kind = raw_kind.parse::<NotificationKind>().map_err(|e| {
        conversion_error(2, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;

    Ok(Notification {
        id: row.get(0)?,
        recipient: username_at(row, 1)?,
        kind,
        message: row.get(3)?,
        is_read: row.get(4)?,
        course_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}
