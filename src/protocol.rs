//! Wire protocol — the envelope every WebSocket message travels in.
//!
//! ARCHITECTURE
//! ============
//! Every message in either direction is a JSON text frame shaped
//! `{ "type": "...", "payload": ... }`. Client events and relay events are
//! separate enums so the relay can never accidentally accept a message only
//! it is allowed to emit (`LOAD_BOARD`, `PRESENCE_UPDATE`).
//!
//! DESIGN
//! ======
//! - Mutation payloads are relayed to peers field for field, including
//!   fields the relay does not model.
//! - `OBJECT_UPDATE` carries a partial object: `id` plus whatever fields
//!   changed. The relay does not know which fields are valid for which shape.
//! - Cursor events gain the sender's `userId` on the way out.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::shape::{Point, Shape};

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code attached to log lines.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Partial object update: the target id plus changed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePatch {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ShapePatch {
    /// Fields that may be merged into a stored object. The object's identity
    /// and variant tag are fixed at creation.
    #[must_use]
    pub fn mergeable_fields(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|(k, _)| k.as_str() != "id" && k.as_str() != "type")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorMove {
    pub pos: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedCursor {
    pub pos: Point,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// A connected user as shown in the presence list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUser {
    pub id: String,
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresencePayload {
    pub users: Vec<PresenceUser>,
}

// =============================================================================
// EVENTS
// =============================================================================

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientEvent {
    ObjectAdd(Vec<Shape>),
    ObjectUpdate(ShapePatch),
    ObjectDelete(Vec<String>),
    CursorMove(CursorMove),
}

impl ClientEvent {
    /// Event name as it appears on the wire. Used for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ObjectAdd(_) => "OBJECT_ADD",
            Self::ObjectUpdate(_) => "OBJECT_UPDATE",
            Self::ObjectDelete(_) => "OBJECT_DELETE",
            Self::CursorMove(_) => "CURSOR_MOVE",
        }
    }
}

/// Messages the relay sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    LoadBoard(Vec<Shape>),
    PresenceUpdate(PresencePayload),
    CursorMove(RelayedCursor),
    ObjectAdd(Vec<Shape>),
    ObjectUpdate(ShapePatch),
    ObjectDelete(Vec<String>),
}

impl ServerEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadBoard(_) => "LOAD_BOARD",
            Self::PresenceUpdate(_) => "PRESENCE_UPDATE",
            Self::CursorMove(_) => "CURSOR_MOVE",
            Self::ObjectAdd(_) => "OBJECT_ADD",
            Self::ObjectUpdate(_) => "OBJECT_UPDATE",
            Self::ObjectDelete(_) => "OBJECT_DELETE",
        }
    }
}

/// Parse one inbound text frame.
///
/// # Errors
///
/// Returns the `serde_json` error for unparseable JSON, unknown `type`
/// values and payloads that do not match their type.
pub fn parse_client_event(text: &str) -> Result<ClientEvent, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
