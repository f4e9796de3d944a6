//! Store collaborators — board metadata and shape documents.
//!
//! SYSTEM CONTEXT
//! ==============
//! The relay owns no durable state. Board metadata (owner, members, roles)
//! and shape documents live behind these two traits so the relay can run
//! against Postgres in production and an in-memory backend in tests or
//! single-node development.
//!
//! Shape documents are stored as raw JSON objects keyed by `(room, id)`.
//! Decoding into [`crate::shape::Shape`] is the persistence adapter's job.

pub mod memory;
pub mod postgres;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::protocol::ErrorCode;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable")]
    Unavailable,
    #[error("invalid stored role: {0}")]
    InvalidRole(String),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E_DATABASE",
            Self::Unavailable => "E_STORE_UNAVAILABLE",
            Self::InvalidRole(_) => "E_INVALID_ROLE",
        }
    }
}

/// Per-member permission level on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardRole {
    Owner,
    Editor,
    Viewer,
}

impl BoardRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "owner" => Some(Self::Owner),
            "editor" => Some(Self::Editor),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Owners and editors may change board content; viewers only watch.
    #[must_use]
    pub fn can_mutate(self) -> bool {
        matches!(self, Self::Owner | Self::Editor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardMember {
    pub user_id: String,
    pub role: BoardRole,
}

/// Board metadata. `members` always contains the owner with role `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub members: Vec<BoardMember>,
}

impl Board {
    #[must_use]
    pub fn role_of(&self, user_id: &str) -> Option<BoardRole> {
        self.members
            .iter()
            .find(|m| m.user_id == user_id)
            .map(|m| m.role)
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// Board metadata store: ownership, membership and roles.
#[async_trait::async_trait]
pub trait BoardStore: Send + Sync {
    async fn get_board(&self, board_id: &str) -> Result<Option<Board>, StoreError>;

    /// Insert a new board with `owner_id` as its sole member.
    async fn create_board(&self, board: &Board) -> Result<(), StoreError>;

    /// Boards where `user_id` holds any role, newest first.
    async fn list_boards_for_member(&self, user_id: &str) -> Result<Vec<Board>, StoreError>;

    /// Returns `false` if the board does not exist.
    async fn rename_board(&self, board_id: &str, name: &str) -> Result<bool, StoreError>;

    /// Returns `false` if the board does not exist.
    async fn delete_board(&self, board_id: &str) -> Result<bool, StoreError>;

    /// Insert or replace a member's role. Returns `false` if the board does not exist.
    async fn set_member_role(&self, board_id: &str, user_id: &str, role: BoardRole) -> Result<bool, StoreError>;

    /// Returns `false` if the member was not present.
    async fn remove_member(&self, board_id: &str, user_id: &str) -> Result<bool, StoreError>;
}

/// Shape document store, one collection per room.
#[async_trait::async_trait]
pub trait ShapeStore: Send + Sync {
    async fn list_shapes(&self, room_id: &str) -> Result<Vec<Value>, StoreError>;

    async fn get_shape(&self, room_id: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Replace-or-insert every document in one atomic batch.
    async fn upsert_shapes(&self, room_id: &str, docs: &[(String, Value)]) -> Result<(), StoreError>;

    /// Shallow-merge `fields` into an existing document. Returns `false` if
    /// the document does not exist; nothing is created in that case.
    async fn merge_shape(&self, room_id: &str, id: &str, fields: &Map<String, Value>) -> Result<bool, StoreError>;

    /// Remove documents in one atomic batch. Absent ids are ignored.
    async fn delete_shapes(&self, room_id: &str, ids: &[String]) -> Result<(), StoreError>;

    /// Remove every document in a room.
    async fn clear_room(&self, room_id: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
