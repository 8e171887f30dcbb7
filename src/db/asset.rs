//! Asset database operations

use async_trait::async_trait;
use uuid::Uuid;

use super::{constraint_error, AssetRepository, PgRepository};
use crate::asset::models::{Asset, AssetMetadataUpdate, NewAsset};
use crate::error::{MediaError, MediaResult};

const ASSET_COLUMNS: &str = "id, display_name, stored_name, mime_type, size_bytes, relative_path, \
     content_hash, caption, folder_id, created_at, updated_at";

#[async_trait]
impl AssetRepository for PgRepository {
    async fn find_by_hash(&self, content_hash: &str) -> MediaResult<Option<Asset>> {
        let query = format!("SELECT {ASSET_COLUMNS} FROM media_assets WHERE content_hash = $1");
        Ok(sqlx::query_as::<_, Asset>(&query)
            .bind(content_hash)
            .fetch_optional(self.pool())
            .await?)
    }

    async fn get_asset(&self, id: Uuid) -> MediaResult<Option<Asset>> {
        let query = format!("SELECT {ASSET_COLUMNS} FROM media_assets WHERE id = $1");
        Ok(sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(self.pool())
            .await?)
    }

    async fn get_assets_by_ids(&self, ids: &[Uuid]) -> MediaResult<Vec<Asset>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {ASSET_COLUMNS} FROM media_assets WHERE id = ANY($1) ORDER BY created_at DESC, seq DESC"
        );
        Ok(sqlx::query_as::<_, Asset>(&query)
            .bind(ids)
            .fetch_all(self.pool())
            .await?)
    }

    async fn create_asset(&self, new: NewAsset) -> MediaResult<Asset> {
        let asset = Asset::from_new(new);
        let query = format!(
            r#"
            INSERT INTO media_assets ({ASSET_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ASSET_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Asset>(&query)
            .bind(asset.id)
            .bind(&asset.display_name)
            .bind(&asset.stored_name)
            .bind(&asset.mime_type)
            .bind(asset.size_bytes)
            .bind(&asset.relative_path)
            .bind(&asset.content_hash)
            .bind(asset.caption.as_deref())
            .bind(asset.folder_id)
            .bind(asset.created_at)
            .bind(asset.updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| {
                constraint_error(
                    e,
                    "An asset with identical content already exists",
                    "Target folder does not exist",
                )
            })
    }

    async fn list_assets_by_folder(&self, folder_id: Option<Uuid>) -> MediaResult<Vec<Asset>> {
        let query = format!(
            "SELECT {ASSET_COLUMNS} FROM media_assets \
             WHERE folder_id IS NOT DISTINCT FROM $1 ORDER BY created_at DESC, seq DESC"
        );
        Ok(sqlx::query_as::<_, Asset>(&query)
            .bind(folder_id)
            .fetch_all(self.pool())
            .await?)
    }

    async fn list_assets_in_folders(&self, folder_ids: &[Uuid]) -> MediaResult<Vec<Asset>> {
        if folder_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {ASSET_COLUMNS} FROM media_assets \
             WHERE folder_id = ANY($1) ORDER BY created_at DESC, seq DESC"
        );
        Ok(sqlx::query_as::<_, Asset>(&query)
            .bind(folder_ids)
            .fetch_all(self.pool())
            .await?)
    }

    async fn update_asset_metadata(
        &self,
        id: Uuid,
        update: &AssetMetadataUpdate,
    ) -> MediaResult<Asset> {
        let query = format!(
            r#"
            UPDATE media_assets
               SET display_name = COALESCE($2, display_name),
                   caption = CASE WHEN $3 THEN $4 ELSE caption END,
                   updated_at = NOW()
             WHERE id = $1
            RETURNING {ASSET_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .bind(update.display_name.as_deref().map(str::trim))
            .bind(update.caption_provided())
            .bind(update.caption.clone().flatten())
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| MediaError::not_found(format!("Asset {id} not found")))
    }

    async fn move_assets(&self, ids: &[Uuid], target_folder_id: Option<Uuid>) -> MediaResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "UPDATE media_assets SET folder_id = $2, updated_at = NOW() WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(target_folder_id)
        .execute(self.pool())
        .await
        .map_err(|e| constraint_error(e, "Asset move conflicts", "Target folder does not exist"))?;

        Ok(result.rows_affected())
    }

    async fn delete_assets(&self, ids: &[Uuid]) -> MediaResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM media_assets WHERE id = ANY($1)")
            .bind(ids)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
