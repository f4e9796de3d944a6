//! Board service — metadata, membership and roles.
//!
//! DESIGN
//! ======
//! Boards are created, shared and deleted through the REST routes. The
//! creator is the owner, forever: the owner role can never be granted,
//! changed or removed here. Only the owner manages members.
//!
//! Role changes need no notification to the relay: the authorization gate
//! reads roles fresh on every mutation. Deleting a board does touch the
//! relay, because its live room must not outlive it.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;
use uuid::Uuid;

use crate::protocol::ErrorCode;
use crate::store::{Board, BoardMember, BoardRole, StoreError};
use crate::state::AppState;

const MIN_BOARD_NAME_CHARS: usize = 3;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("board not found: {0}")]
    NotFound(String),
    #[error("forbidden")]
    Forbidden,
    #[error("board name must be at least {MIN_BOARD_NAME_CHARS} characters")]
    InvalidName,
    #[error("the board owner cannot be reassigned or removed")]
    OwnerImmutable,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for BoardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_BOARD_NOT_FOUND",
            Self::Forbidden => "E_FORBIDDEN",
            Self::InvalidName => "E_INVALID_NAME",
            Self::OwnerImmutable => "E_OWNER_IMMUTABLE",
            Self::Store(e) => e.error_code(),
        }
    }
}

fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

fn validate_name(name: &str) -> Result<&str, BoardError> {
    let name = name.trim();
    if name.chars().count() < MIN_BOARD_NAME_CHARS {
        return Err(BoardError::InvalidName);
    }
    Ok(name)
}

async fn load(state: &AppState, board_id: &str) -> Result<Board, BoardError> {
    state
        .boards
        .get_board(board_id)
        .await?
        .ok_or_else(|| BoardError::NotFound(board_id.to_owned()))
}

async fn load_as_owner(state: &AppState, board_id: &str, user_id: &str) -> Result<Board, BoardError> {
    let board = load(state, board_id).await?;
    if board.owner_id != user_id {
        return Err(BoardError::Forbidden);
    }
    Ok(board)
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a board owned by `owner_id`.
///
/// # Errors
///
/// Returns `InvalidName` for names shorter than three characters.
pub async fn create_board(state: &AppState, owner_id: &str, name: &str) -> Result<Board, BoardError> {
    let name = validate_name(name)?;
    let board = Board {
        id: Uuid::new_v4().to_string(),
        name: name.to_owned(),
        owner_id: owner_id.to_owned(),
        created_at: now_ms(),
        members: vec![BoardMember { user_id: owner_id.to_owned(), role: BoardRole::Owner }],
    };
    state.boards.create_board(&board).await?;
    info!(board_id = %board.id, %owner_id, "board created");
    Ok(board)
}

/// Boards the user belongs to, newest first.
///
/// # Errors
///
/// Returns a store error if the lookup fails.
pub async fn list_boards(state: &AppState, user_id: &str) -> Result<Vec<Board>, BoardError> {
    Ok(state.boards.list_boards_for_member(user_id).await?)
}

/// Fetch a board the user is a member of.
///
/// # Errors
///
/// Returns `NotFound` or `Forbidden` for non-members.
pub async fn get_board(state: &AppState, board_id: &str, user_id: &str) -> Result<Board, BoardError> {
    let board = load(state, board_id).await?;
    if board.role_of(user_id).is_none() {
        return Err(BoardError::Forbidden);
    }
    Ok(board)
}

/// Rename a board. Owner only.
///
/// # Errors
///
/// Returns `Forbidden` for non-owners and `InvalidName` for short names.
pub async fn rename_board(state: &AppState, board_id: &str, user_id: &str, name: &str) -> Result<Board, BoardError> {
    let name = validate_name(name)?;
    let mut board = load_as_owner(state, board_id, user_id).await?;
    if !state.boards.rename_board(board_id, name).await? {
        return Err(BoardError::NotFound(board_id.to_owned()));
    }
    name.clone_into(&mut board.name);
    Ok(board)
}

/// Delete a board, its shapes, and close its live room. Owner only.
///
/// # Errors
///
/// Returns `Forbidden` for non-owners.
pub async fn delete_board(state: &AppState, board_id: &str, user_id: &str) -> Result<(), BoardError> {
    load_as_owner(state, board_id, user_id).await?;

    // Once metadata is gone the gate denies every mutation for this room.
    if !state.boards.delete_board(board_id).await? {
        return Err(BoardError::NotFound(board_id.to_owned()));
    }
    let closed = state.rooms.close_room(board_id).await;
    state.shapes.clear_room(board_id).await?;
    info!(%board_id, closed, "board deleted");
    Ok(())
}

// =============================================================================
// MEMBERS
// =============================================================================

/// Add a member or change an existing member's role. Owner only.
///
/// # Errors
///
/// Returns `OwnerImmutable` when granting `owner` or targeting the owner.
pub async fn set_member_role(
    state: &AppState,
    board_id: &str,
    acting_user: &str,
    target_user: &str,
    role: BoardRole,
) -> Result<Board, BoardError> {
    let board = load_as_owner(state, board_id, acting_user).await?;
    if role == BoardRole::Owner || target_user == board.owner_id {
        return Err(BoardError::OwnerImmutable);
    }

    if !state.boards.set_member_role(board_id, target_user, role).await? {
        return Err(BoardError::NotFound(board_id.to_owned()));
    }
    info!(%board_id, %target_user, role = role.as_str(), "member role set");
    load(state, board_id).await
}

/// Remove a member. Owner only. Removing a non-member is a no-op.
///
/// # Errors
///
/// Returns `OwnerImmutable` when targeting the owner.
pub async fn remove_member(state: &AppState, board_id: &str, acting_user: &str, target_user: &str) -> Result<(), BoardError> {
    let board = load_as_owner(state, board_id, acting_user).await?;
    if target_user == board.owner_id {
        return Err(BoardError::OwnerImmutable);
    }

    if state.boards.remove_member(board_id, target_user).await? {
        info!(%board_id, %target_user, "member removed");
    }
    Ok(())
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
