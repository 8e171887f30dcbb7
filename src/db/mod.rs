//! Database module - repositories and AppState
//!
//! This module is split into submodules for better separation of concerns:
//! - `asset` - Asset queries for PostgreSQL
//! - `folder` - Folder queries for PostgreSQL
//! - `memory` - In-process repository with the same constraints
//! - `schema` - Idempotent schema bootstrap

mod asset;
mod folder;
mod memory;
pub mod schema;

use async_trait::async_trait;
use log::info;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::asset::models::{Asset, AssetMetadataUpdate, NewAsset};
use crate::config::MediaConfig;
use crate::error::{MediaError, MediaResult};
use crate::folder::models::Folder;
use crate::library::MediaLibrary;
use crate::storage::{LocalDiskStorage, StorageProvider};

pub use memory::MemoryRepository;

/// Persistent records of stored files.
#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn find_by_hash(&self, content_hash: &str) -> MediaResult<Option<Asset>>;

    async fn get_asset(&self, id: Uuid) -> MediaResult<Option<Asset>>;

    async fn get_assets_by_ids(&self, ids: &[Uuid]) -> MediaResult<Vec<Asset>>;

    /// Fails with `Conflict` when `content_hash` is already recorded.
    async fn create_asset(&self, new: NewAsset) -> MediaResult<Asset>;

    /// Assets directly inside `folder_id` (`None` = root), newest first.
    async fn list_assets_by_folder(&self, folder_id: Option<Uuid>) -> MediaResult<Vec<Asset>>;

    /// Union of `list_assets_by_folder` over `folder_ids`.
    async fn list_assets_in_folders(&self, folder_ids: &[Uuid]) -> MediaResult<Vec<Asset>>;

    async fn update_asset_metadata(
        &self,
        id: Uuid,
        update: &AssetMetadataUpdate,
    ) -> MediaResult<Asset>;

    async fn move_assets(&self, ids: &[Uuid], target_folder_id: Option<Uuid>) -> MediaResult<u64>;

    /// Removes rows only; physical files are the caller's job.
    async fn delete_assets(&self, ids: &[Uuid]) -> MediaResult<u64>;
}

/// Persistent folder hierarchy.
#[async_trait]
pub trait FolderRepository: Send + Sync {
    /// Fails with `Conflict` on a duplicate sibling name and `NotFound` on a
    /// missing parent.
    async fn create_folder(&self, name: &str, parent_id: Option<Uuid>) -> MediaResult<Folder>;

    async fn get_folder(&self, id: Uuid) -> MediaResult<Option<Folder>>;

    /// Direct children of `parent_id` (`None` = root), name ascending.
    async fn list_child_folders(&self, parent_id: Option<Uuid>) -> MediaResult<Vec<Folder>>;

    /// Ids of folders whose parent is one of `parent_ids`.
    async fn child_folder_ids(&self, parent_ids: &[Uuid]) -> MediaResult<Vec<Uuid>>;

    /// Rewrites name and parent in one atomic step. Fails with `Validation`
    /// when `parent_id` is `id` itself or one of its descendants, checked
    /// against the committed hierarchy at update time.
    async fn update_folder(
        &self,
        id: Uuid,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> MediaResult<Folder>;

    /// Deletes folder rows. Descendant folders and their asset rows cascade.
    async fn delete_folders(&self, ids: &[Uuid]) -> MediaResult<u64>;
}

pub trait MediaRepository: AssetRepository + FolderRepository {}

impl<T: AssetRepository + FolderRepository> MediaRepository for T {}

/// PostgreSQL-backed repository.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Translates constraint violations into the media error taxonomy.
pub(crate) fn constraint_error(error: sqlx::Error, conflict: &str, missing: &str) -> MediaError {
    if let Some(db_error) = error.as_database_error() {
        if db_error.is_unique_violation() {
            return MediaError::conflict(conflict);
        }
        if db_error.is_foreign_key_violation() {
            return MediaError::not_found(missing);
        }
    }
    MediaError::Database(error)
}

#[derive(Clone)]
pub struct AppState {
    pub library: Arc<MediaLibrary>,
}

impl AppState {
    pub async fn new_with_config(config: &MediaConfig) -> anyhow::Result<Self> {
        let repository: Arc<dyn MediaRepository> = if config.uses_memory_repository() {
            info!("Using in-process media repository; records will not survive a restart");
            Arc::new(MemoryRepository::new())
        } else {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(20)
                .min_connections(2)
                .acquire_timeout(std::time::Duration::from_secs(30))
                .idle_timeout(std::time::Duration::from_secs(900))
                .max_lifetime(std::time::Duration::from_secs(1800))
                .connect(&config.database_url)
                .await?;
            schema::ensure_schema(&pool).await?;
            Arc::new(PgRepository::new(pool))
        };

        let storage = Arc::new(LocalDiskStorage::new(
            &config.upload_root,
            &config.public_prefix,
            config.image_max_width,
        )?);

        Ok(Self::new_with_repository_and_storage(
            repository,
            storage,
            config.max_upload_bytes,
        ))
    }

    pub fn new_with_repository_and_storage(
        repository: Arc<dyn MediaRepository>,
        storage: Arc<dyn StorageProvider>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            library: Arc::new(MediaLibrary::new(repository, storage, max_upload_bytes)),
        }
    }
}
