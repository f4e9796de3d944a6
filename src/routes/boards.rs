//! Board and member management routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use tracing::warn;

use crate::protocol::{ErrorCode, PresenceUser};
use crate::routes::auth::ActingUser;
use crate::services::board::{self, BoardError};
use crate::state::AppState;
use crate::store::{Board, BoardRole};

#[derive(Deserialize)]
pub struct BoardNameBody {
    pub name: String,
}

#[derive(Deserialize)]
pub struct InviteMemberBody {
    pub user_id: String,
    pub role: Option<BoardRole>,
}

#[derive(Deserialize)]
pub struct UpdateMemberBody {
    pub role: BoardRole,
}

pub(crate) fn board_error_to_status(err: BoardError) -> StatusCode {
    match err {
        BoardError::NotFound(_) => StatusCode::NOT_FOUND,
        BoardError::Forbidden => StatusCode::FORBIDDEN,
        BoardError::InvalidName => StatusCode::BAD_REQUEST,
        BoardError::OwnerImmutable => StatusCode::CONFLICT,
        BoardError::Store(e) => {
            warn!(error = %e, code = e.error_code(), "board store error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `POST /api/boards` — create a board owned by the caller.
pub async fn create_board(
    State(state): State<AppState>,
    auth: ActingUser,
    Json(body): Json<BoardNameBody>,
) -> Result<(StatusCode, Json<Board>), StatusCode> {
    let board = board::create_board(&state, &auth.user_id, &body.name)
        .await
        .map_err(board_error_to_status)?;
    Ok((StatusCode::CREATED, Json(board)))
}

/// `GET /api/boards` — boards the caller belongs to.
pub async fn list_boards(State(state): State<AppState>, auth: ActingUser) -> Result<Json<Vec<Board>>, StatusCode> {
    let boards = board::list_boards(&state, &auth.user_id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(boards))
}

/// `GET /api/boards/:id` — one board, members only.
pub async fn get_board(
    State(state): State<AppState>,
    auth: ActingUser,
    Path(board_id): Path<String>,
) -> Result<Json<Board>, StatusCode> {
    let board = board::get_board(&state, &board_id, &auth.user_id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(board))
}

/// `PATCH /api/boards/:id` — rename.
pub async fn rename_board(
    State(state): State<AppState>,
    auth: ActingUser,
    Path(board_id): Path<String>,
    Json(body): Json<BoardNameBody>,
) -> Result<Json<Board>, StatusCode> {
    let board = board::rename_board(&state, &board_id, &auth.user_id, &body.name)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(board))
}

/// `DELETE /api/boards/:id` — delete board, shapes and live room.
pub async fn delete_board(
    State(state): State<AppState>,
    auth: ActingUser,
    Path(board_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    board::delete_board(&state, &board_id, &auth.user_id)
        .await
        .map_err(board_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/boards/:id/presence` — users currently connected.
pub async fn list_presence(
    State(state): State<AppState>,
    auth: ActingUser,
    Path(board_id): Path<String>,
) -> Result<Json<Vec<PresenceUser>>, StatusCode> {
    board::get_board(&state, &board_id, &auth.user_id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(state.rooms.presence(&board_id).await))
}

/// `POST /api/boards/:id/members` — invite a user (editor by default).
pub async fn invite_member(
    State(state): State<AppState>,
    auth: ActingUser,
    Path(board_id): Path<String>,
    Json(body): Json<InviteMemberBody>,
) -> Result<Json<Board>, StatusCode> {
    let role = body.role.unwrap_or(BoardRole::Editor);
    let board = board::set_member_role(&state, &board_id, &auth.user_id, &body.user_id, role)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(board))
}

/// `PATCH /api/boards/:id/members/:user_id` — change a member's role.
pub async fn update_member(
    State(state): State<AppState>,
    auth: ActingUser,
    Path((board_id, member_user_id)): Path<(String, String)>,
    Json(body): Json<UpdateMemberBody>,
) -> Result<Json<Board>, StatusCode> {
    let board = board::set_member_role(&state, &board_id, &auth.user_id, &member_user_id, body.role)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(board))
}

/// `DELETE /api/boards/:id/members/:user_id` — remove a member.
pub async fn remove_member(
    State(state): State<AppState>,
    auth: ActingUser,
    Path((board_id, member_user_id)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    board::remove_member(&state, &board_id, &auth.user_id, &member_user_id)
        .await
        .map_err(board_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "boards_test.rs"]
mod tests;
