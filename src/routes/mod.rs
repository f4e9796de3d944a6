//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the relay's WebSocket endpoint and the board
//! administration API. The socket is reachable at both `/ws` and `/` so
//! clients that connect to the bare host keep working.

pub mod auth;
pub mod boards;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws::handle_ws))
        .route("/ws", get(ws::handle_ws))
        .route("/api/boards", get(boards::list_boards).post(boards::create_board))
        .route(
            "/api/boards/{id}",
            get(boards::get_board)
                .patch(boards::rename_board)
                .delete(boards::delete_board),
        )
        .route("/api/boards/{id}/presence", get(boards::list_presence))
        .route("/api/boards/{id}/members", post(boards::invite_member))
        .route(
            "/api/boards/{id}/members/{user_id}",
            patch(boards::update_member).delete(boards::remove_member),
        )
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
