//! Room registry — which sessions are connected to which board.
//!
//! DESIGN
//! ======
//! One `RwLock<HashMap<room_id, Room>>` holds every live session. All
//! membership changes (join, leave, eviction) take the write lock, and the
//! resulting `PRESENCE_UPDATE` is fanned out before the lock is released, so
//! two concurrent joins can never produce a presence list that is missing one
//! of them.
//!
//! Rooms are created on first join and removed as soon as they hold no
//! sessions, under the same lock, so a join can never land in a room that is
//! being torn down.
//!
//! A peer whose outbound queue is full when presence is fanned out is
//! evicted once the lock is released, the same as for any other broadcast.
//!
//! A user has at most one session per room. A second connection for the same
//! user replaces the first: the old entry is dropped, which closes its
//! outbound queue and fires its eviction signal so its socket task exits.
//!
//! INVARIANT
//! =========
//! A presence entry exists for a user iff a session for that user is
//! registered in the room. Presence entries remember the session that owns
//! them so a replaced session's late `leave` never removes its successor.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{info, warn};
use uuid::Uuid;

use crate::protocol::{ErrorCode, PresenceUser, ServerEvent};
use crate::services::broadcast;

// =============================================================================
// IDENTITY / ADMISSION
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("missing connection parameter: {0}")]
    MissingParam(&'static str),
}

impl ErrorCode for AdmissionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingParam(_) => "E_MISSING_PARAM",
        }
    }
}

/// Verified identity supplied on connect, plus the room being joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub room_id: String,
    pub user_id: String,
    pub name: String,
    pub image: String,
}

impl Identity {
    /// Build an identity from connection query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::MissingParam`] for the first of `boardId`,
    /// `userId`, `name`, `image` that is absent or empty.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, AdmissionError> {
        let get = |key: &'static str| {
            params
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or(AdmissionError::MissingParam(key))
        };
        Ok(Self { room_id: get("boardId")?, user_id: get("userId")?, name: get("name")?, image: get("image")? })
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// A joined session as seen by its own connection task.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub room_id: String,
    pub user_id: String,
    tx: mpsc::Sender<ServerEvent>,
}

impl SessionHandle {
    /// Queue an event for this session's own socket. Returns `false` if the
    /// session has already been closed.
    pub async fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// Everything a connection task needs after a successful join.
pub struct Joined {
    pub handle: SessionHandle,
    /// Events to write to the socket, in order.
    pub outbound: mpsc::Receiver<ServerEvent>,
    /// Resolves when the registry drops this session (replacement, eviction).
    pub evicted: oneshot::Receiver<()>,
}

struct SessionEntry {
    user_id: String,
    tx: mpsc::Sender<ServerEvent>,
    // Dropping the entry drops this sender, which resolves `Joined::evicted`.
    _evict: oneshot::Sender<()>,
}

struct PresenceEntry {
    user: PresenceUser,
    session_id: Uuid,
}

// =============================================================================
// ROOM
// =============================================================================

#[derive(Default)]
pub struct Room {
    sessions: HashMap<Uuid, SessionEntry>,
    presence: HashMap<String, PresenceEntry>,
}

impl Room {
    /// Current presence list, ordered by user id.
    #[must_use]
    pub fn presence_users(&self) -> Vec<PresenceUser> {
        let mut users: Vec<PresenceUser> = self.presence.values().map(|p| p.user.clone()).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    pub(crate) fn senders(&self) -> impl Iterator<Item = (Uuid, &mpsc::Sender<ServerEvent>)> {
        self.sessions.iter().map(|(id, s)| (*id, &s.tx))
    }

    fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.presence.is_empty()
    }

    /// Remove a session and, if it owns it, its user's presence entry.
    fn remove_session(&mut self, session_id: Uuid) -> bool {
        let Some(entry) = self.sessions.remove(&session_id) else {
            return false;
        };
        if self
            .presence
            .get(&entry.user_id)
            .is_some_and(|p| p.session_id == session_id)
        {
            self.presence.remove(&entry.user_id);
        }
        true
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Room>>,
    outbound_capacity: usize,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(outbound_capacity: usize) -> Self {
        Self { rooms: RwLock::new(HashMap::new()), outbound_capacity: outbound_capacity.max(1) }
    }

    /// Register a session, replacing any prior session of the same user in
    /// the same room, and announce the new presence list to the whole room.
    pub async fn join(&self, identity: Identity) -> Joined {
        let session_id = Uuid::new_v4();
        let (tx, outbound) = mpsc::channel(self.outbound_capacity);
        let (evict_tx, evicted) = oneshot::channel();

        let Identity { room_id, user_id, name, image } = identity;

        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id.clone()).or_default();

        if let Some(prior) = room.presence.get(&user_id).map(|p| p.session_id) {
            room.sessions.remove(&prior);
            info!(%room_id, %user_id, %prior, "prior session replaced by new connection");
        }

        room.sessions
            .insert(session_id, SessionEntry { user_id: user_id.clone(), tx: tx.clone(), _evict: evict_tx });
        room.presence.insert(
            user_id.clone(),
            PresenceEntry { user: PresenceUser { id: user_id.clone(), name, image }, session_id },
        );
        info!(%room_id, %user_id, %session_id, sessions = room.sessions.len(), "session joined room");

        let stuck = broadcast::presence_to_room(room);
        drop(rooms);
        self.evict_stuck(&room_id, stuck).await;

        Joined { handle: SessionHandle { session_id, room_id, user_id, tx }, outbound, evicted }
    }

    /// Remove the session behind `handle`. Idempotent.
    pub async fn leave(&self, handle: &SessionHandle) -> bool {
        self.remove_session(&handle.room_id, handle.session_id).await
    }

    /// Server-initiated close of one session. Idempotent.
    pub async fn evict(&self, room_id: &str, session_id: Uuid) -> bool {
        self.remove_session(room_id, session_id).await
    }

    async fn remove_session(&self, room_id: &str, session_id: Uuid) -> bool {
        let (removed, stuck) = self.remove_one(room_id, session_id).await;
        self.evict_stuck(room_id, stuck).await;
        removed
    }

    /// Remove one session under the write lock. Returns whether it was
    /// registered and the peers that could not take the presence update.
    async fn remove_one(&self, room_id: &str, session_id: Uuid) -> (bool, Vec<Uuid>) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return (false, Vec::new());
        };
        if !room.remove_session(session_id) {
            return (false, Vec::new());
        }

        info!(%room_id, %session_id, remaining = room.sessions.len(), "session left room");
        if room.is_empty() {
            rooms.remove(room_id);
            info!(%room_id, "room released");
            return (true, Vec::new());
        }
        (true, broadcast::presence_to_room(room))
    }

    /// Evict peers whose outbound queue was full during a presence fan-out.
    /// Each eviction announces presence again, which may surface more.
    async fn evict_stuck(&self, room_id: &str, mut stuck: Vec<Uuid>) {
        while let Some(session_id) = stuck.pop() {
            warn!(%room_id, %session_id, event = "PRESENCE_UPDATE", "outbound queue full; evicting peer");
            let (_, more) = self.remove_one(room_id, session_id).await;
            stuck.extend(more);
        }
    }

    /// Close every session in a room and forget the room. Returns the number
    /// of sessions closed.
    pub async fn close_room(&self, room_id: &str) -> usize {
        let removed = self.rooms.write().await.remove(room_id);
        let count = removed.map_or(0, |room| room.sessions.len());
        if count > 0 {
            info!(%room_id, sessions = count, "room closed");
        }
        count
    }

    /// Live sessions in a room, optionally excluding one.
    pub async fn broadcast_targets(
        &self,
        room_id: &str,
        exclude: Option<Uuid>,
    ) -> Vec<(Uuid, mpsc::Sender<ServerEvent>)> {
        let rooms = self.rooms.read().await;
        let Some(room) = rooms.get(room_id) else {
            return Vec::new();
        };
        room.senders()
            .filter(|(id, _)| exclude != Some(*id))
            .map(|(id, tx)| (id, tx.clone()))
            .collect()
    }

    pub async fn presence(&self, room_id: &str) -> Vec<PresenceUser> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).map(Room::presence_users).unwrap_or_default()
    }

    #[cfg(test)]
    pub async fn session_count(&self, room_id: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).map_or(0, |r| r.sessions.len())
    }

    #[cfg(test)]
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// User ids that currently hold a session in the room.
    #[cfg(test)]
    pub async fn session_user_ids(&self, room_id: &str) -> std::collections::BTreeSet<String> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .map(|r| r.sessions.values().map(|s| s.user_id.clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
