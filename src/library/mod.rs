//! Media library service: every operation the HTTP layer (or any other
//! caller) may invoke.
//!
//! - `ingest` - upload pipeline with content-hash dedup
//! - `cleanup` - recursive folder delete and asset deletes

mod cleanup;
mod ingest;

use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

use crate::asset::models::{Asset, AssetMetadataUpdate, AssetMove};
use crate::auth::Caller;
use crate::db::MediaRepository;
use crate::error::{MediaError, MediaResult};
use crate::folder::models::{
    normalize_folder_name, Folder, FolderContents, FolderUpdate, FOLDER_CYCLE_MESSAGE,
};
use crate::folder::FolderTree;
use crate::storage::StorageProvider;

pub use ingest::UploadRequest;

pub struct MediaLibrary {
    repository: Arc<dyn MediaRepository>,
    storage: Arc<dyn StorageProvider>,
    max_upload_bytes: usize,
}

impl MediaLibrary {
    pub fn new(
        repository: Arc<dyn MediaRepository>,
        storage: Arc<dyn StorageProvider>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            repository,
            storage,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn repository(&self) -> &dyn MediaRepository {
        self.repository.as_ref()
    }

    pub fn storage(&self) -> &dyn StorageProvider {
        self.storage.as_ref()
    }

    fn tree(&self) -> FolderTree<'_, dyn MediaRepository> {
        FolderTree::new(self.repository.as_ref())
    }

    pub async fn get_asset(&self, id: Uuid) -> MediaResult<Asset> {
        self.repository
            .get_asset(id)
            .await?
            .ok_or_else(|| MediaError::not_found(format!("Asset {id} not found")))
    }

    /// Assets for the ids that exist; unknown ids are skipped.
    pub async fn get_assets_by_ids(&self, ids: &[Uuid]) -> MediaResult<Vec<Asset>> {
        self.repository.get_assets_by_ids(ids).await
    }

    pub async fn update_asset_metadata(
        &self,
        caller: &Caller,
        id: Uuid,
        update: &AssetMetadataUpdate,
    ) -> MediaResult<Asset> {
        caller.ensure_authorized()?;
        update.validate()?;

        let asset = self.repository.update_asset_metadata(id, update).await?;
        info!("Asset {} metadata updated by {}", id, caller.subject);
        Ok(asset)
    }

    /// Reassigns assets to `target_folder_id` (`None` = root).
    ///
    /// The target is not looked up first; a missing folder is only caught by
    /// the repository's foreign key.
    pub async fn move_assets(
        &self,
        caller: &Caller,
        asset_ids: &[Uuid],
        target_folder_id: Option<Uuid>,
    ) -> MediaResult<AssetMove> {
        caller.ensure_authorized()?;
        if asset_ids.is_empty() {
            return Err(MediaError::validation("No asset ids supplied"));
        }

        let moved_count = self
            .repository
            .move_assets(asset_ids, target_folder_id)
            .await?;
        info!(
            "Moved {} of {} assets to folder {:?}",
            moved_count,
            asset_ids.len(),
            target_folder_id
        );
        Ok(AssetMove { moved_count })
    }

    pub async fn create_folder(
        &self,
        caller: &Caller,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> MediaResult<Folder> {
        caller.ensure_authorized()?;
        let name = normalize_folder_name(name)?;

        let folder = self.repository.create_folder(&name, parent_id).await?;
        info!("Folder '{}' ({}) created under {:?}", folder.name, folder.id, parent_id);
        Ok(folder)
    }

    /// Child folders, assets and the root-first breadcrumb trail of
    /// `folder_id` (`None` = root).
    pub async fn list_folder_contents(&self, folder_id: Option<Uuid>) -> MediaResult<FolderContents> {
        if let Some(id) = folder_id {
            if self.repository.get_folder(id).await?.is_none() {
                return Err(MediaError::not_found(format!("Folder {id} not found")));
            }
        }

        let folders = self.repository.list_child_folders(folder_id).await?;
        let assets = self.repository.list_assets_by_folder(folder_id).await?;
        let breadcrumbs = self.tree().compute_breadcrumbs(folder_id).await?;
        debug!(
            "Folder {:?} holds {} folders and {} assets",
            folder_id,
            folders.len(),
            assets.len()
        );

        Ok(FolderContents {
            folders,
            assets,
            breadcrumbs,
        })
    }

    pub async fn rename_folder(&self, caller: &Caller, id: Uuid, name: &str) -> MediaResult<Folder> {
        let update = FolderUpdate {
            name: Some(name.to_string()),
            parent_id: None,
        };
        self.update_folder(caller, id, &update).await
    }

    pub async fn move_folder(
        &self,
        caller: &Caller,
        id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> MediaResult<Folder> {
        let update = FolderUpdate {
            name: None,
            parent_id: Some(new_parent_id),
        };
        self.update_folder(caller, id, &update).await
    }

    /// Rename and/or re-parent a folder. A folder can never be moved under
    /// itself or one of its descendants.
    pub async fn update_folder(
        &self,
        caller: &Caller,
        id: Uuid,
        update: &FolderUpdate,
    ) -> MediaResult<Folder> {
        caller.ensure_authorized()?;
        if update.name.is_none() && update.parent_id.is_none() {
            return Err(MediaError::validation("No folder fields to update"));
        }

        let current = self
            .repository
            .get_folder(id)
            .await?
            .ok_or_else(|| MediaError::not_found(format!("Folder {id} not found")))?;

        let name = match &update.name {
            Some(name) => normalize_folder_name(name)?,
            None => current.name.clone(),
        };
        let parent_id = update.parent_id.unwrap_or(current.parent_id);

        if let Some(new_parent) = parent_id.filter(|p| Some(*p) != current.parent_id) {
            if self.repository.get_folder(new_parent).await?.is_none() {
                return Err(MediaError::not_found(format!(
                    "Parent folder {new_parent} not found"
                )));
            }
            if self.tree().is_self_or_ancestor(id, new_parent).await? {
                return Err(MediaError::validation(FOLDER_CYCLE_MESSAGE));
            }
        }

        // The repository repeats the ancestor check atomically with the write,
        // which catches opposing moves committed since the check above.
        let folder = self.repository.update_folder(id, &name, parent_id).await?;
        info!(
            "Folder {} is now '{}' under {:?}",
            folder.id, folder.name, folder.parent_id
        );
        Ok(folder)
    }
}
