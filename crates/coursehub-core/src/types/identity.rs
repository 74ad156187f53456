//! Authenticated identities.

use super::{User, Username};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated caller behind a connection or request.
///
/// Only produced by an authenticator after a session lookup succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Database user id.
    pub user_id: i64,

    /// Username.
    pub username: Username,

    /// Full name (may be empty).
    pub full_name: String,

    /// When authentication occurred.
    pub authenticated_at: DateTime<Utc>,
}

impl Identity {
    /// Build an identity for a stored user.
    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            authenticated_at: Utc::now(),
        }
    }

    /// Name shown to other users: the full name, else the username.
    pub fn display_name(&self) -> &str {
        display_name(&self.full_name, &self.username)
    }

    /// Sender info carried on outbound frames.
    pub fn sender_info(&self) -> SenderInfo {
        SenderInfo {
            username: self.username.clone(),
            display_name: self.display_name().to_string(),
        }
    }
}

/// Sender display info attached to chat events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderInfo {
    /// Sender username.
    pub username: Username,

    /// Sender display name.
    pub display_name: String,
}

pub(crate) fn display_name<'a>(full_name: &'a str, username: &'a Username) -> &'a str {
    let trimmed = full_name.trim();
    if trimmed.is_empty() {
        username.as_str()
    } else {
        trimmed
    }
}
