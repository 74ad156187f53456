//! Notification delivery for the domain layer.

use crate::bridge::PersistenceBridge;
use crate::error::GatewayError;
use crate::protocol::ServerEvent;
use crate::registry::GroupRegistry;
use crate::Result;
use coursehub_core::{
    Announcement, ChatMessage, GroupName, Notification, NotificationPayload, RoomName, Username,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Who a notification is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One user's personal notification stream. Persisted.
    User(Username),

    /// Everyone connected to a chat room. Broadcast only.
    Room(RoomName),
}

/// Result of a [`Notifier::notify`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Dropped at the caller's request; nothing stored or sent.
    Suppressed,

    /// Stored, then queued for `delivered` live connections.
    Stored {
        notification: Notification,
        delivered: usize,
    },

    /// Room notice queued for `delivered` live connections.
    Broadcast { delivered: usize },
}

/// Persists notifications and pushes them to connected clients.
#[derive(Clone)]
pub struct Notifier {
    bridge: PersistenceBridge,
    registry: Arc<GroupRegistry>,
}

impl Notifier {
    pub fn new(bridge: PersistenceBridge, registry: Arc<GroupRegistry>) -> Self {
        Self { bridge, registry }
    }

    /// Deliver a notification.
    ///
    /// User notifications are written before they are broadcast; if the write
    /// fails nothing is sent.
    pub async fn notify(
        &self,
        target: &Target,
        payload: NotificationPayload,
        suppress: bool,
    ) -> Result<NotifyOutcome> {
        if suppress {
            debug!("Suppressed {} notification for {:?}", payload.kind, target);
            return Ok(NotifyOutcome::Suppressed);
        }

        match target {
            Target::User(user) => {
                let notification = self
                    .bridge
                    .record_notification(user.clone(), payload)
                    .await
                    .map_err(|e| {
                        error!("Failed to store notification for {}: {}", user, e);
                        e
                    })?;

                let delivered = self
                    .registry
                    .broadcast(
                        &GroupName::personal(user),
                        ServerEvent::notification(&notification),
                    )
                    .await;
                debug!(
                    "Notification {} for {} delivered to {} connection(s)",
                    notification.id, user, delivered
                );

                Ok(NotifyOutcome::Stored {
                    notification,
                    delivered,
                })
            }
            Target::Room(room) => {
                let delivered = self
                    .registry
                    .broadcast(&GroupName::room(room), ServerEvent::notice(&payload))
                    .await;
                Ok(NotifyOutcome::Broadcast { delivered })
            }
        }
    }

    /// Post an announcement into a course room as its author.
    pub async fn announce(&self, announcement: &Announcement) -> Result<ChatMessage> {
        let author = self
            .bridge
            .find_user(announcement.author.clone())
            .await?
            .ok_or_else(|| {
                GatewayError::NotFound(format!("announcement author {}", announcement.author))
            })?;

        let message = self
            .bridge
            .record_chat_message(announcement.room.clone(), author.id, announcement.body.clone())
            .await?;

        let delivered = self
            .registry
            .broadcast(&GroupName::room(&announcement.room), ServerEvent::chat(&message))
            .await;
        debug!(
            "Announcement {} posted to {} ({} connection(s))",
            message.id, announcement.room, delivered
        );

        Ok(message)
    }
}
