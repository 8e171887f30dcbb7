//! Folder database operations

use async_trait::async_trait;
use uuid::Uuid;

use super::{constraint_error, FolderRepository, PgRepository};
use crate::error::{MediaError, MediaResult};
use crate::folder::models::{Folder, FOLDER_CYCLE_MESSAGE};

/// Advisory lock key held while a folder is re-parented.
const FOLDER_MOVE_LOCK_KEY: i64 = 0x6d65_6469_615f_6d76;

const DUPLICATE_SIBLING: &str = "A folder with this name already exists here";
const MISSING_PARENT: &str = "Parent folder does not exist";

#[async_trait]
impl FolderRepository for PgRepository {
    async fn create_folder(&self, name: &str, parent_id: Option<Uuid>) -> MediaResult<Folder> {
        let folder = Folder::new(name, parent_id);

        sqlx::query_as::<_, Folder>(
            r#"
            INSERT INTO media_folders (id, name, parent_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, parent_id, created_at
            "#,
        )
        .bind(folder.id)
        .bind(&folder.name)
        .bind(folder.parent_id)
        .bind(folder.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(|e| constraint_error(e, DUPLICATE_SIBLING, MISSING_PARENT))
    }

    async fn get_folder(&self, id: Uuid) -> MediaResult<Option<Folder>> {
        Ok(sqlx::query_as::<_, Folder>(
            "SELECT id, name, parent_id, created_at FROM media_folders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?)
    }

    async fn list_child_folders(&self, parent_id: Option<Uuid>) -> MediaResult<Vec<Folder>> {
        Ok(sqlx::query_as::<_, Folder>(
            "SELECT id, name, parent_id, created_at FROM media_folders \
             WHERE parent_id IS NOT DISTINCT FROM $1 ORDER BY name ASC",
        )
        .bind(parent_id)
        .fetch_all(self.pool())
        .await?)
    }

    async fn child_folder_ids(&self, parent_ids: &[Uuid]) -> MediaResult<Vec<Uuid>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM media_folders WHERE parent_id = ANY($1)")
                .bind(parent_ids)
                .fetch_all(self.pool())
                .await?,
        )
    }

    async fn update_folder(
        &self,
        id: Uuid,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> MediaResult<Folder> {
        let mut tx = self.pool().begin().await?;

        if let Some(parent) = parent_id {
            // Moves are serialized, so the walk sees every committed re-parent.
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(FOLDER_MOVE_LOCK_KEY)
                .execute(&mut *tx)
                .await?;

            let creates_cycle = sqlx::query_scalar::<_, bool>(
                r#"
                WITH RECURSIVE ancestors(id, parent_id) AS (
                    SELECT id, parent_id FROM media_folders WHERE id = $1
                    UNION
                    SELECT f.id, f.parent_id
                      FROM media_folders f
                      JOIN ancestors a ON f.id = a.parent_id
                )
                SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $2)
                "#,
            )
            .bind(parent)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if creates_cycle {
                return Err(MediaError::validation(FOLDER_CYCLE_MESSAGE));
            }
        }

        let folder = sqlx::query_as::<_, Folder>(
            r#"
            UPDATE media_folders SET name = $2, parent_id = $3
             WHERE id = $1
            RETURNING id, name, parent_id, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(parent_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, DUPLICATE_SIBLING, MISSING_PARENT))?
        .ok_or_else(|| MediaError::not_found(format!("Folder {id} not found")))?;

        tx.commit().await?;
        Ok(folder)
    }

    async fn delete_folders(&self, ids: &[Uuid]) -> MediaResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM media_folders WHERE id = ANY($1)")
            .bind(ids)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
