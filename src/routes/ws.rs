//! WebSocket handler — one task per connected client.
//!
//! DESIGN
//! ======
//! The upgrade is refused outright if any identity parameter is missing; no
//! state is created and no event is sent.
//!
//! After upgrade the socket is split. A writer task drains the session's
//! outbound queue into the socket and pings on an interval. The reader loop
//! handles inbound frames one at a time, so each connection's events are
//! applied in receipt order.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → join room → `PRESENCE_UPDATE` to the room
//! 2. `LOAD_BOARD` to this session (skipped if the store read fails)
//! 3. Inbound frames → parse → mutation processor
//! 4. Close, read error, idle timeout, replacement or eviction → leave room
//!    → `PRESENCE_UPDATE` to whoever remains

use std::collections::HashMap;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::protocol::{self, ClientEvent, ErrorCode, ServerEvent};
use crate::services::mutation::{self, Disposition};
use crate::services::persistence;
use crate::services::room::{Identity, Joined, SessionHandle};
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = match Identity::from_params(&params) {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, code = e.error_code(), "ws: admission refused");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, identity))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(socket: WebSocket, state: AppState, identity: Identity) {
    let Joined { handle, outbound, mut evicted } = state.rooms.join(identity).await;
    let session_id = handle.session_id;
    let room_id = handle.room_id.clone();

    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(sink, outbound, state.config.heartbeat_interval));

    send_initial_load(&state, &handle).await;

    let idle_timeout = state.config.idle_timeout;
    let mut last_seen = Instant::now();
    let mut liveness = tokio::time::interval(idle_timeout.min(state.config.heartbeat_interval));
    liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            msg = stream.next() => {
                let Some(Ok(msg)) = msg else { break };
                last_seen = Instant::now();
                match msg {
                    Message::Text(text) => {
                        dispatch_text(&state, &handle, text.as_str()).await;
                    }
                    Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                        Ok(text) => {
                            dispatch_text(&state, &handle, text).await;
                        }
                        Err(e) => warn!(%session_id, error = %e, "ws: non-utf8 binary frame ignored"),
                    },
                    Message::Close(_) => break,
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }
            _ = &mut evicted => {
                info!(%room_id, %session_id, "ws: session closed by relay");
                break;
            }
            _ = &mut writer => break,
            _ = liveness.tick() => {
                if last_seen.elapsed() > idle_timeout {
                    warn!(%room_id, %session_id, "ws: idle timeout");
                    break;
                }
            }
        }
    }

    state.rooms.leave(&handle).await;
    // Last sender gone: the writer flushes what is queued, then closes.
    drop(handle);
    info!(%room_id, %session_id, "ws: client disconnected");
}

/// Send the room's persisted objects to a freshly joined session. A failed
/// load leaves the session joined with no `LOAD_BOARD`.
async fn send_initial_load(state: &AppState, handle: &SessionHandle) {
    match persistence::load_room_objects(state.shapes.as_ref(), &handle.room_id).await {
        Ok(shapes) => {
            info!(room_id = %handle.room_id, session_id = %handle.session_id, count = shapes.len(), "ws: board loaded");
            handle.send(ServerEvent::LoadBoard(shapes)).await;
        }
        Err(e) => {
            warn!(room_id = %handle.room_id, error = %e, code = e.error_code(), "ws: board load failed; joining empty");
        }
    }
}

/// Parse and process one inbound text frame. Malformed frames are logged and
/// ignored; the connection stays open.
pub(crate) async fn dispatch_text(state: &AppState, handle: &SessionHandle, text: &str) -> Option<Disposition> {
    let event = match protocol::parse_client_event(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(session_id = %handle.session_id, error = %e, "ws: malformed inbound message ignored");
            return None;
        }
    };
    if !matches!(event, ClientEvent::CursorMove(_)) {
        debug!(session_id = %handle.session_id, event = event.name(), "ws: inbound");
    }
    Some(mutation::handle_client_event(state, handle, event).await)
}

// =============================================================================
// WRITER
// =============================================================================

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerEvent>,
    heartbeat: Duration,
) {
    let mut ping = tokio::time::interval(heartbeat);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await;

    loop {
        tokio::select! {
            event = outbound.recv() => {
                let Some(event) = event else { break };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, event = event.name(), "ws: failed to serialize event");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    return;
                }
            }
        }
    }

    let _ = sink.send(Message::Close(None)).await;
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
