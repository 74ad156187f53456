//! Process-wide group membership and fan-out.

use crate::protocol::ServerEvent;
use coursehub_core::{ConnectionId, GroupName, Username};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// Outbound side of one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Connection ID.
    pub id: ConnectionId,

    /// Authenticated user behind the connection.
    pub username: Username,

    /// Outbound frame queue drained by the connection's writer task.
    pub tx: mpsc::Sender<Arc<ServerEvent>>,
}

#[derive(Default)]
struct Inner {
    groups: HashMap<GroupName, HashMap<ConnectionId, ConnectionHandle>>,
    memberships: HashMap<ConnectionId, HashSet<GroupName>>,
}

/// Registry of named broadcast groups.
///
/// Join, leave and broadcast are each atomic with respect to one another: a
/// broadcast sees a membership snapshot that is either before or after any
/// concurrent join or leave, never in between.
pub struct GroupRegistry {
    inner: RwLock<Inner>,
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Add a connection to a group. Joining twice is a no-op.
    pub async fn join(&self, group: &GroupName, handle: ConnectionHandle) {
        let mut inner = self.inner.write().await;
        let id = handle.id;
        inner
            .groups
            .entry(group.clone())
            .or_default()
            .insert(id, handle);
        inner.memberships.entry(id).or_default().insert(group.clone());
        debug!("Connection {} joined {}", id, group);
    }

    /// Remove a connection from a group. Returns whether it was a member.
    pub async fn leave(&self, group: &GroupName, id: ConnectionId) -> bool {
        let mut inner = self.inner.write().await;
        let removed = remove_member(&mut inner, group, id);

        if let Some(groups) = inner.memberships.get_mut(&id) {
            groups.remove(group);
            if groups.is_empty() {
                inner.memberships.remove(&id);
            }
        }

        removed
    }

    /// Remove a connection from every group it joined.
    pub async fn leave_all(&self, id: ConnectionId) -> Vec<GroupName> {
        let mut inner = self.inner.write().await;
        let groups: Vec<GroupName> = inner
            .memberships
            .remove(&id)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();

        for group in &groups {
            remove_member(&mut inner, group, id);
        }

        groups
    }

    /// Queue an event for every member of a group.
    ///
    /// Delivery is best-effort: members whose queue is full or closed are
    /// skipped. Returns the number of members the event was queued for.
    pub async fn broadcast(&self, group: &GroupName, event: ServerEvent) -> usize {
        let inner = self.inner.read().await;
        let members = match inner.groups.get(group) {
            Some(members) => members,
            None => return 0,
        };

        let event = Arc::new(event);
        let mut delivered = 0;
        for handle in members.values() {
            match handle.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        "Outbound queue full for connection {} ({}), dropping frame",
                        handle.id, handle.username
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("Connection {} already closed", handle.id);
                }
            }
        }

        delivered
    }

    /// Connection IDs in a group.
    pub async fn members(&self, group: &GroupName) -> Vec<ConnectionId> {
        let inner = self.inner.read().await;
        inner
            .groups
            .get(group)
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Whether a connection belongs to a group.
    pub async fn is_member(&self, group: &GroupName, id: ConnectionId) -> bool {
        let inner = self.inner.read().await;
        inner
            .groups
            .get(group)
            .map(|members| members.contains_key(&id))
            .unwrap_or(false)
    }

    /// Number of non-empty groups.
    pub async fn group_count(&self) -> usize {
        self.inner.read().await.groups.len()
    }

    /// Number of connections holding at least one membership.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.memberships.len()
    }
}

fn remove_member(inner: &mut Inner, group: &GroupName, id: ConnectionId) -> bool {
    let Some(members) = inner.groups.get_mut(group) else {
        return false;
    };
    let removed = members.remove(&id).is_some();
    if members.is_empty() {
        inner.groups.remove(group);
    }
    removed
}
