//! Persistence adapter — accepted mutations to durable store operations.
//!
//! DESIGN
//! ======
//! Shapes are written as whole JSON documents keyed by object id. Adds are
//! upserts, so redelivering an add is harmless. Updates are shallow merges
//! into the stored document and never create one. Deletes ignore ids that
//! are already gone.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here is retried and nothing is reported to clients. By the time a
//! write runs, peers have already seen the event; a failed write leaves them
//! ahead of the store until the next successful write to the same object.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::protocol::{ErrorCode, ShapePatch};
use crate::shape::{self, Shape};
use crate::store::{ShapeStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("failed to encode object {id}: {source}")]
    Encode { id: String, source: serde_json::Error },
    #[error("update would leave object {id} undecodable: {source}")]
    InvalidPatch { id: String, source: serde_json::Error },
}

impl ErrorCode for PersistError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::NotFound(_) => "E_OBJECT_NOT_FOUND",
            Self::Encode { .. } => "E_ENCODE",
            Self::InvalidPatch { .. } => "E_INVALID_PATCH",
        }
    }
}

// =============================================================================
// LOAD
// =============================================================================

/// Full persisted object set for a room. Stored documents that no longer
/// decode as a shape are skipped.
///
/// # Errors
///
/// Returns [`PersistError::Store`] if the store cannot be read.
pub async fn load_room_objects(store: &dyn ShapeStore, room_id: &str) -> Result<Vec<Shape>, PersistError> {
    let docs = store.list_shapes(room_id).await?;

    let mut shapes = Vec::with_capacity(docs.len());
    for doc in docs {
        let id = doc.get("id").and_then(Value::as_str).unwrap_or("-").to_owned();
        match serde_json::from_value::<Shape>(doc) {
            Ok(shape) => shapes.push(shape),
            Err(e) => warn!(%room_id, %id, error = %e, "skipping undecodable stored object"),
        }
    }

    let dangling = shape::dangling_connectors(&shapes).len();
    if dangling > 0 {
        debug!(%room_id, dangling, "room has connectors with missing endpoints");
    }
    Ok(shapes)
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// Upsert every shape in one batch. Within a batch the last shape for a
/// given id wins.
///
/// # Errors
///
/// Returns [`PersistError::Store`] if the batch write fails.
pub async fn apply_add(store: &dyn ShapeStore, room_id: &str, shapes: &[Shape]) -> Result<(), PersistError> {
    let mut docs: Vec<(String, Value)> = Vec::with_capacity(shapes.len());
    let mut index: HashMap<&str, usize> = HashMap::new();

    for shape in shapes {
        let doc = serde_json::to_value(shape)
            .map_err(|source| PersistError::Encode { id: shape.id().to_owned(), source })?;
        match index.get(shape.id()) {
            Some(&i) => {
                debug!(%room_id, id = shape.id(), kind = shape.kind(), "duplicate id in batch; last wins");
                docs[i].1 = doc;
            }
            None => {
                index.insert(shape.id(), docs.len());
                docs.push((shape.id().to_owned(), doc));
            }
        }
    }

    store.upsert_shapes(room_id, &docs).await?;
    debug!(%room_id, count = docs.len(), "objects upserted");
    Ok(())
}

/// Merge the changed fields of `patch` into the stored object. The merged
/// document must still decode as a [`Shape`], otherwise nothing is written.
///
/// # Errors
///
/// Returns [`PersistError::InvalidPatch`] if a field has the wrong type for
/// the object's variant, [`PersistError::NotFound`] if the object does not
/// exist (e.g. the update raced a delete) and [`PersistError::Store`] on
/// store failure.
pub async fn apply_update(store: &dyn ShapeStore, room_id: &str, patch: &ShapePatch) -> Result<(), PersistError> {
    let fields = patch.mergeable_fields();
    if fields.is_empty() {
        return Ok(());
    }

    let Some(mut merged) = store.get_shape(room_id, &patch.id).await? else {
        return Err(PersistError::NotFound(patch.id.clone()));
    };
    if let Value::Object(doc) = &mut merged {
        doc.extend(fields.clone());
    }
    if let Err(source) = serde_json::from_value::<Shape>(merged) {
        return Err(PersistError::InvalidPatch { id: patch.id.clone(), source });
    }

    if store.merge_shape(room_id, &patch.id, &fields).await? {
        debug!(%room_id, id = %patch.id, fields = fields.len(), "object updated");
        Ok(())
    } else {
        Err(PersistError::NotFound(patch.id.clone()))
    }
}

/// Remove objects by id in one batch. Already-absent ids are not an error.
///
/// # Errors
///
/// Returns [`PersistError::Store`] if the batch delete fails.
pub async fn apply_delete(store: &dyn ShapeStore, room_id: &str, ids: &[String]) -> Result<(), PersistError> {
    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(id.clone());
        }
    }

    store.delete_shapes(room_id, &unique).await?;
    debug!(%room_id, count = unique.len(), "objects deleted");
    Ok(())
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
