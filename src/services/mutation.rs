//! Mutation processor — what happens to each inbound client event.
//!
//! DESIGN
//! ======
//! For `OBJECT_ADD` / `OBJECT_UPDATE` / `OBJECT_DELETE`:
//! 1. Ask the authorization gate. A denial drops the event silently: no
//!    reply, no broadcast, no write. The client is not told why.
//! 2. Broadcast to every other session in the room.
//! 3. Persist, and wait for the write before returning.
//!
//! Broadcast does not wait on persistence. Peers may briefly see state the
//! store later fails to record; that window is accepted in exchange for
//! peer latency that does not depend on the store.
//!
//! The caller processes one connection's events sequentially, so events from
//! one connection are broadcast and persisted in receipt order, and a slow
//! store delays that connection's next read.
//!
//! `CURSOR_MOVE` skips the gate and the store entirely.

use tracing::{debug, info, warn};

use crate::protocol::{ClientEvent, CursorMove, ErrorCode, RelayedCursor, ServerEvent, ShapePatch};
use crate::services::broadcast;
use crate::services::persistence;
use crate::services::{auth, room::SessionHandle};
use crate::shape::Shape;
use crate::state::AppState;

/// A content-changing event.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Add(Vec<Shape>),
    Update(ShapePatch),
    Delete(Vec<String>),
}

impl Mutation {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "OBJECT_ADD",
            Self::Update(_) => "OBJECT_UPDATE",
            Self::Delete(_) => "OBJECT_DELETE",
        }
    }

    /// Empty batches and updates that change nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Add(shapes) => shapes.is_empty(),
            Self::Update(patch) => patch.mergeable_fields().is_empty(),
            Self::Delete(ids) => ids.is_empty(),
        }
    }

    fn to_event(&self) -> ServerEvent {
        match self {
            Self::Add(shapes) => ServerEvent::ObjectAdd(shapes.clone()),
            Self::Update(patch) => ServerEvent::ObjectUpdate(patch.clone()),
            Self::Delete(ids) => ServerEvent::ObjectDelete(ids.clone()),
        }
    }
}

/// What the relay did with one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Cursor relayed to `delivered` peers.
    Relayed { delivered: usize },
    /// Mutation accepted, broadcast and handed to the store.
    Applied { delivered: usize, persisted: bool },
    /// Sender lacks an editing role.
    Denied,
    /// Nothing to do.
    Skipped,
}

/// Handle one parsed client event for a joined session.
pub async fn handle_client_event(state: &AppState, handle: &SessionHandle, event: ClientEvent) -> Disposition {
    match event {
        ClientEvent::CursorMove(cursor) => relay_cursor(state, handle, cursor).await,
        ClientEvent::ObjectAdd(shapes) => process(state, handle, Mutation::Add(shapes)).await,
        ClientEvent::ObjectUpdate(patch) => process(state, handle, Mutation::Update(patch)).await,
        ClientEvent::ObjectDelete(ids) => process(state, handle, Mutation::Delete(ids)).await,
    }
}

/// Broadcast a cursor position to room peers with the sender's user id.
pub async fn relay_cursor(state: &AppState, handle: &SessionHandle, cursor: CursorMove) -> Disposition {
    let event = ServerEvent::CursorMove(RelayedCursor { pos: cursor.pos, user_id: handle.user_id.clone() });
    let delivered = broadcast::broadcast(&state.rooms, &handle.room_id, &event, Some(handle.session_id)).await;
    Disposition::Relayed { delivered }
}

/// Gate, broadcast, then persist one mutation.
pub async fn process(state: &AppState, handle: &SessionHandle, mutation: Mutation) -> Disposition {
    let room_id = handle.room_id.as_str();
    let user_id = handle.user_id.as_str();

    if mutation.is_noop() {
        debug!(%room_id, %user_id, event = mutation.name(), "empty mutation ignored");
        return Disposition::Skipped;
    }

    if !auth::can_mutate(state.boards.as_ref(), room_id, user_id).await {
        info!(%room_id, %user_id, event = mutation.name(), "permission denied; mutation dropped");
        return Disposition::Denied;
    }

    let delivered = broadcast::broadcast(&state.rooms, room_id, &mutation.to_event(), Some(handle.session_id)).await;

    let shapes = state.shapes.as_ref();
    let result = match &mutation {
        Mutation::Add(objects) => persistence::apply_add(shapes, room_id, objects).await,
        Mutation::Update(patch) => persistence::apply_update(shapes, room_id, patch).await,
        Mutation::Delete(ids) => persistence::apply_delete(shapes, room_id, ids).await,
    };

    let persisted = match result {
        Ok(()) => true,
        Err(e) => {
            warn!(%room_id, %user_id, event = mutation.name(), error = %e, code = e.error_code(), "persist failed; broadcast stands");
            false
        }
    };

    Disposition::Applied { delivered, persisted }
}

#[cfg(test)]
#[path = "mutation_test.rs"]
mod tests;
