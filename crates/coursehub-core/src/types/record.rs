//! Persisted records.

use super::identity::display_name;
use super::{RoomName, SenderInfo, Username};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Database id.
    pub id: i64,

    /// Unique username.
    pub username: Username,

    /// Full name (may be empty).
    pub full_name: String,

    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Full name, or the username when no full name is set.
    pub fn display_name(&self) -> &str {
        display_name(&self.full_name, &self.username)
    }
}

/// A login session backing cookie/bearer authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque session token.
    pub token: String,

    /// Owning user.
    pub user_id: i64,

    /// Issue time.
    pub created_at: DateTime<Utc>,

    /// Expiry, if any.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the session is no longer valid at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// A chat message posted to a room. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Database id.
    pub id: i64,

    /// Room the message was posted in.
    pub room: RoomName,

    /// Sender user id.
    pub sender_id: i64,

    /// Sender display info.
    pub sender: SenderInfo,

    /// Message body.
    pub body: String,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Notification categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Enrollment,
    Material,
    Feedback,
    Submission,
    General,
    System,
    Deadline,
}

impl NotificationKind {
    /// Storage/wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enrollment => "enrollment",
            Self::Material => "material",
            Self::Feedback => "feedback",
            Self::Submission => "submission",
            Self::General => "general",
            Self::System => "system",
            Self::Deadline => "deadline",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "enrollment" => Self::Enrollment,
            "material" => Self::Material,
            "feedback" => Self::Feedback,
            "submission" => Self::Submission,
            "general" => Self::General,
            "system" => Self::System,
            "deadline" => Self::Deadline,
            other => return Err(format!("unknown notification kind: {}", other)),
        })
    }
}

/// Notification content before it is addressed and stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Category.
    pub kind: NotificationKind,

    /// Human-readable text.
    pub message: String,

    /// Originating course, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
}

impl NotificationPayload {
    /// Create a payload with no course link.
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            course_id: None,
        }
    }

    /// Link the payload to a course.
    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }
}

/// A stored notification. Only `is_read` ever changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Database id.
    pub id: i64,

    /// Recipient.
    pub recipient: Username,

    /// Category.
    pub kind: NotificationKind,

    /// Text.
    pub message: String,

    /// Read flag.
    pub is_read: bool,

    /// Originating course, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}
