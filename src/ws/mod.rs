pub mod actor;
pub mod broadcast;
pub mod handler;
pub mod protocol;

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::db::models::UserId;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Identifies one registration, so a closing socket only removes its own entry.
pub type ConnectionId = u64;

#[derive(Debug)]
struct ConnectionEntry {
    id: ConnectionId,
    sender: ConnectionSender,
}

/// Connection registry: maps each connected user to exactly one live channel.
///
/// Registering a second channel for the same user replaces the first one;
/// from then on only the newest channel receives broadcasts. Cloning the
/// registry clones the handle, not the map.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<UserId, ConnectionEntry>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    /// Create a new empty connection registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `sender` with `user_id`, replacing any previous channel.
    pub fn register(&self, user_id: UserId, sender: ConnectionSender) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let replaced = self
            .connections
            .insert(user_id, ConnectionEntry { id, sender });

        if let Some(previous) = replaced {
            tracing::debug!(
                user_id = user_id,
                replaced_connection = previous.id,
                connection = id,
                "Connection replaced by newer channel"
            );
        } else {
            tracing::debug!(user_id = user_id, connection = id, "Connection registered");
        }
        id
    }

    /// Remove whatever channel is registered for `user_id`. Idempotent.
    pub fn unregister(&self, user_id: UserId) -> bool {
        let removed = self.connections.remove(&user_id).is_some();
        if removed {
            tracing::debug!(user_id = user_id, "Connection unregistered");
        }
        removed
    }

    /// Remove the entry for `user_id` only if it still belongs to
    /// `connection_id`. A socket that was displaced by a newer one must not
    /// evict its replacement when it closes.
    pub fn release(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let removed = self
            .connections
            .remove_if(&user_id, |_, entry| entry.id == connection_id)
            .is_some();
        if removed {
            tracing::debug!(user_id = user_id, connection = connection_id, "Connection released");
        }
        removed
    }

    /// Whether `user_id` currently has an open channel.
    pub fn is_connected(&self, user_id: UserId) -> bool {
        self.connections
            .get(&user_id)
            .map(|entry| !entry.sender.is_closed())
            .unwrap_or(false)
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Deliver a frame to `user_id` if they have an open channel.
    /// Returns false when the frame was dropped; nothing is queued.
    pub fn send(&self, user_id: UserId, msg: axum::extract::ws::Message) -> bool {
        let Some(entry) = self.connections.get(&user_id) else {
            return false;
        };
        if entry.sender.is_closed() {
            return false;
        }
        entry.sender.send(msg).is_ok()
    }
}
