//! Authorization gate — may this user change this board?
//!
//! The board's role map is read fresh on every mutating event, never cached,
//! so a demotion takes effect on the very next event rather than on
//! reconnect. Anything other than a stored `owner` or `editor` role denies,
//! including a missing board and a failed lookup.

use tracing::{debug, warn};

use crate::protocol::ErrorCode;
use crate::store::{BoardRole, BoardStore};

pub async fn can_mutate(boards: &dyn BoardStore, room_id: &str, user_id: &str) -> bool {
    match boards.get_board(room_id).await {
        Ok(Some(board)) => board.role_of(user_id).is_some_and(BoardRole::can_mutate),
        Ok(None) => {
            debug!(%room_id, %user_id, "no board metadata for room; denying mutation");
            false
        }
        Err(e) => {
            warn!(%room_id, %user_id, error = %e, code = e.error_code(), "role lookup failed; denying mutation");
            false
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
