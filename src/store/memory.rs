//! In-memory store backend.
//!
//! Used when no `DATABASE_URL` is configured and by every unit test. Nothing
//! survives a restart. Each operation takes the lock once, so batch writes
//! are atomic with respect to readers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{Board, BoardMember, BoardRole, BoardStore, ShapeStore, StoreError};

// =============================================================================
// BOARDS
// =============================================================================

#[derive(Default)]
pub struct MemoryBoardStore {
    boards: RwLock<HashMap<String, Board>>,
}

impl MemoryBoardStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BoardStore for MemoryBoardStore {
    async fn get_board(&self, board_id: &str) -> Result<Option<Board>, StoreError> {
        Ok(self.boards.read().await.get(board_id).cloned())
    }

    async fn create_board(&self, board: &Board) -> Result<(), StoreError> {
        self.boards
            .write()
            .await
            .insert(board.id.clone(), board.clone());
        Ok(())
    }

    async fn list_boards_for_member(&self, user_id: &str) -> Result<Vec<Board>, StoreError> {
        let boards = self.boards.read().await;
        let mut out: Vec<Board> = boards
            .values()
            .filter(|b| b.role_of(user_id).is_some())
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn rename_board(&self, board_id: &str, name: &str) -> Result<bool, StoreError> {
        let mut boards = self.boards.write().await;
        let Some(board) = boards.get_mut(board_id) else {
            return Ok(false);
        };
        board.name = name.to_owned();
        Ok(true)
    }

    async fn delete_board(&self, board_id: &str) -> Result<bool, StoreError> {
        Ok(self.boards.write().await.remove(board_id).is_some())
    }

    async fn set_member_role(&self, board_id: &str, user_id: &str, role: BoardRole) -> Result<bool, StoreError> {
        let mut boards = self.boards.write().await;
        let Some(board) = boards.get_mut(board_id) else {
            return Ok(false);
        };
        match board.members.iter_mut().find(|m| m.user_id == user_id) {
            Some(member) => member.role = role,
            None => board
                .members
                .push(BoardMember { user_id: user_id.to_owned(), role }),
        }
        Ok(true)
    }

    async fn remove_member(&self, board_id: &str, user_id: &str) -> Result<bool, StoreError> {
        let mut boards = self.boards.write().await;
        let Some(board) = boards.get_mut(board_id) else {
            return Ok(false);
        };
        let before = board.members.len();
        board.members.retain(|m| m.user_id != user_id);
        Ok(board.members.len() != before)
    }
}

// =============================================================================
// SHAPES
// =============================================================================

/// Room id -> (object id -> document).
#[derive(Default)]
pub struct MemoryShapeStore {
    rooms: RwLock<HashMap<String, HashMap<String, Value>>>,
    unavailable: AtomicBool,
}

impl MemoryShapeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with [`StoreError::Unavailable`].
    #[cfg(test)]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ShapeStore for MemoryShapeStore {
    async fn list_shapes(&self, room_id: &str) -> Result<Vec<Value>, StoreError> {
        self.check_available()?;
        let rooms = self.rooms.read().await;
        Ok(rooms
            .get(room_id)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_shape(&self, room_id: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.check_available()?;
        let rooms = self.rooms.read().await;
        Ok(rooms.get(room_id).and_then(|r| r.get(id)).cloned())
    }

    async fn upsert_shapes(&self, room_id: &str, docs: &[(String, Value)]) -> Result<(), StoreError> {
        self.check_available()?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id.to_owned()).or_default();
        for (id, doc) in docs {
            room.insert(id.clone(), doc.clone());
        }
        Ok(())
    }

    async fn merge_shape(&self, room_id: &str, id: &str, fields: &Map<String, Value>) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut rooms = self.rooms.write().await;
        let Some(Value::Object(doc)) = rooms.get_mut(room_id).and_then(|r| r.get_mut(id)) else {
            return Ok(false);
        };
        for (k, v) in fields {
            doc.insert(k.clone(), v.clone());
        }
        Ok(true)
    }

    async fn delete_shapes(&self, room_id: &str, ids: &[String]) -> Result<(), StoreError> {
        self.check_available()?;
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(room_id) {
            for id in ids {
                room.remove(id);
            }
            if room.is_empty() {
                rooms.remove(room_id);
            }
        }
        Ok(())
    }

    async fn clear_room(&self, room_id: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.rooms.write().await.remove(room_id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
