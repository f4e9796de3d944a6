//! Postgres store backend.
//!
//! DESIGN
//! ======
//! - `boards` + `board_members`: one row per member, so the member list and
//!   the role map cannot drift apart.
//! - `board_shapes`: one JSONB document per object keyed by `(board_id, id)`.
//!   Partial updates use `data || $patch`, which is a shallow merge, and run
//!   as a single statement so concurrent updates to one object are atomic.
//! - Batch upsert runs inside a transaction; batch delete is one statement.

use serde_json::{Map, Value};
use sqlx::PgPool;

use super::{Board, BoardMember, BoardRole, BoardStore, ShapeStore, StoreError};

#[derive(Clone)]
pub struct PgBoardStore {
    pool: PgPool,
}

impl PgBoardStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_members(&self, board_id: &str) -> Result<Vec<BoardMember>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT user_id, role FROM board_members WHERE board_id = $1 ORDER BY user_id",
        )
        .bind(board_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(user_id, role)| {
                let role = BoardRole::parse(&role).ok_or(StoreError::InvalidRole(role))?;
                Ok(BoardMember { user_id, role })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl BoardStore for PgBoardStore {
    async fn get_board(&self, board_id: &str) -> Result<Option<Board>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, String, i64)>(
            "SELECT id, name, owner_id, created_at FROM boards WHERE id = $1",
        )
        .bind(board_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, name, owner_id, created_at)) = row else {
            return Ok(None);
        };
        let members = self.load_members(&id).await?;
        Ok(Some(Board { id, name, owner_id, created_at, members }))
    }

    async fn create_board(&self, board: &Board) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO boards (id, name, owner_id, created_at) VALUES ($1, $2, $3, $4)")
            .bind(&board.id)
            .bind(&board.name)
            .bind(&board.owner_id)
            .bind(board.created_at)
            .execute(tx.as_mut())
            .await?;
        for member in &board.members {
            sqlx::query("INSERT INTO board_members (board_id, user_id, role) VALUES ($1, $2, $3)")
                .bind(&board.id)
                .bind(&member.user_id)
                .bind(member.role.as_str())
                .execute(tx.as_mut())
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_boards_for_member(&self, user_id: &str) -> Result<Vec<Board>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, String, i64)>(
            "SELECT b.id, b.name, b.owner_id, b.created_at
             FROM boards b
             JOIN board_members m ON m.board_id = b.id
             WHERE m.user_id = $1
             ORDER BY b.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut boards = Vec::with_capacity(rows.len());
        for (id, name, owner_id, created_at) in rows {
            let members = self.load_members(&id).await?;
            boards.push(Board { id, name, owner_id, created_at, members });
        }
        Ok(boards)
    }

    async fn rename_board(&self, board_id: &str, name: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE boards SET name = $2 WHERE id = $1")
            .bind(board_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_board(&self, board_id: &str) -> Result<bool, StoreError> {
        // Members cascade.
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(board_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_member_role(&self, board_id: &str, user_id: &str, role: BoardRole) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO board_members (board_id, user_id, role)
             SELECT id, $2, $3 FROM boards WHERE id = $1
             ON CONFLICT (board_id, user_id) DO UPDATE SET role = EXCLUDED.role",
        )
        .bind(board_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_member(&self, board_id: &str, user_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM board_members WHERE board_id = $1 AND user_id = $2")
            .bind(board_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// SHAPES
// =============================================================================

#[derive(Clone)]
pub struct PgShapeStore {
    pool: PgPool,
}

impl PgShapeStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ShapeStore for PgShapeStore {
    async fn list_shapes(&self, room_id: &str) -> Result<Vec<Value>, StoreError> {
        let rows = sqlx::query_scalar::<_, Value>("SELECT data FROM board_shapes WHERE board_id = $1 ORDER BY created_at, id")
            .bind(room_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_shape(&self, room_id: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let doc = sqlx::query_scalar::<_, Value>("SELECT data FROM board_shapes WHERE board_id = $1 AND id = $2")
            .bind(room_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    async fn upsert_shapes(&self, room_id: &str, docs: &[(String, Value)]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for (id, doc) in docs {
            sqlx::query(
                "INSERT INTO board_shapes (board_id, id, data) VALUES ($1, $2, $3)
                 ON CONFLICT (board_id, id) DO UPDATE SET data = EXCLUDED.data, updated_at = now()",
            )
            .bind(room_id)
            .bind(id)
            .bind(doc)
            .execute(tx.as_mut())
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn merge_shape(&self, room_id: &str, id: &str, fields: &Map<String, Value>) -> Result<bool, StoreError> {
        let patch = Value::Object(fields.clone());
        let result = sqlx::query(
            "UPDATE board_shapes SET data = data || $3, updated_at = now() WHERE board_id = $1 AND id = $2",
        )
        .bind(room_id)
        .bind(id)
        .bind(&patch)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_shapes(&self, room_id: &str, ids: &[String]) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM board_shapes WHERE board_id = $1 AND id = ANY($2)")
            .bind(room_id)
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_room(&self, room_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM board_shapes WHERE board_id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "postgres_test.rs"]
mod tests;
