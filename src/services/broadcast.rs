//! Broadcaster — fan an event out to the sessions of one room.
//!
//! DESIGN
//! ======
//! Sends are `try_send` into each session's bounded outbound queue, so a
//! slow peer never stalls delivery to the others. A peer whose queue is full
//! has fallen irrecoverably behind: it is evicted, which closes its socket
//! and lets the client reconnect and reload the board.
//!
//! Mutation and cursor events exclude the sender. Presence updates go to
//! everyone in the room, including a joining session.

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::protocol::{PresencePayload, ServerEvent};
use crate::services::room::{Room, RoomRegistry};

/// Send `event` to every live session in `room_id` except `exclude`.
/// Returns the number of sessions the event was queued for.
pub async fn broadcast(registry: &RoomRegistry, room_id: &str, event: &ServerEvent, exclude: Option<Uuid>) -> usize {
    let targets = registry.broadcast_targets(room_id, exclude).await;

    let mut delivered = 0;
    let mut stuck = Vec::new();
    for (session_id, tx) in targets {
        match tx.try_send(event.clone()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => stuck.push(session_id),
            // Session is already shutting down; its own task handles cleanup.
            Err(TrySendError::Closed(_)) => {}
        }
    }

    for session_id in stuck {
        warn!(%room_id, %session_id, event = event.name(), "outbound queue full; evicting peer");
        registry.evict(room_id, session_id).await;
    }

    if !matches!(event, ServerEvent::CursorMove(_)) {
        debug!(%room_id, event = event.name(), delivered, "broadcast");
    }
    delivered
}

/// Build the presence event for a room.
#[must_use]
pub fn presence_event(room: &Room) -> ServerEvent {
    ServerEvent::PresenceUpdate(PresencePayload { users: room.presence_users() })
}

/// Announce the room's presence list to all of its sessions. Returns the
/// sessions whose queue was full.
///
/// Called by the registry while it holds the write lock, so it cannot evict
/// here; the registry evicts the returned sessions once the lock is released.
#[must_use]
pub(crate) fn presence_to_room(room: &Room) -> Vec<Uuid> {
    let event = presence_event(room);
    let mut stuck = Vec::new();
    for (session_id, tx) in room.senders() {
        if let Err(TrySendError::Full(_)) = tx.try_send(event.clone()) {
            stuck.push(session_id);
        }
    }
    stuck
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
