//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! The room registry is the only in-process mutable state; board metadata
//! and shape documents live behind the store traits.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::services::room::RoomRegistry;
use crate::store::{BoardStore, ShapeStore};

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RoomRegistry>,
    pub boards: Arc<dyn BoardStore>,
    pub shapes: Arc<dyn ShapeStore>,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: RelayConfig, boards: Arc<dyn BoardStore>, shapes: Arc<dyn ShapeStore>) -> Self {
        Self {
            rooms: Arc::new(RoomRegistry::new(config.outbound_queue_capacity)),
            boards,
            shapes,
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::protocol::ServerEvent;
    use crate::services::room::Identity;
    use crate::store::memory::{MemoryBoardStore, MemoryShapeStore};
    use crate::store::{Board, BoardMember, BoardRole};
    use tokio::sync::mpsc;
    use tokio::time::{Duration, timeout};

    /// `AppState` over in-memory stores.
    #[must_use]
    pub fn test_app_state() -> AppState {
        test_app_state_with_shapes(Arc::new(MemoryShapeStore::new()))
    }

    /// `AppState` sharing the given shape store, so tests can inspect it or
    /// simulate outages.
    #[must_use]
    pub fn test_app_state_with_shapes(shapes: Arc<MemoryShapeStore>) -> AppState {
        AppState::new(RelayConfig::default(), Arc::new(MemoryBoardStore::new()), shapes)
    }

    /// Seed a board owned by `owner` with extra members and return its id.
    pub async fn seed_board(state: &AppState, owner: &str, members: &[(&str, BoardRole)]) -> String {
        let board_id = uuid::Uuid::new_v4().to_string();
        let mut all = vec![BoardMember { user_id: owner.into(), role: BoardRole::Owner }];
        all.extend(
            members
                .iter()
                .map(|(user_id, role)| BoardMember { user_id: (*user_id).into(), role: *role }),
        );
        let board = Board { id: board_id.clone(), name: "Test Board".into(), owner_id: owner.into(), created_at: 0, members: all };
        state
            .boards
            .create_board(&board)
            .await
            .expect("memory store should accept board");
        board_id
    }

    #[must_use]
    pub fn identity(room_id: &str, user_id: &str) -> Identity {
        Identity {
            room_id: room_id.into(),
            user_id: user_id.into(),
            name: format!("User {user_id}"),
            image: format!("https://avatars.test/{user_id}.png"),
        }
    }

    pub async fn recv_event(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
        timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("event receive timed out")
            .expect("outbound channel closed unexpectedly")
    }

    pub async fn assert_no_event(rx: &mut mpsc::Receiver<ServerEvent>) {
        assert!(
            timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
            "expected no event"
        );
    }

    /// Drop any queued events (e.g. presence updates from joins).
    pub fn drain(rx: &mut mpsc::Receiver<ServerEvent>) {
        while rx.try_recv().is_ok() {}
    }
}
