use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::HashSet;
use uuid::Uuid;

use super::MediaLibrary;
use crate::asset::models::{Asset, AssetDeletion};
use crate::auth::Caller;
use crate::error::{MediaError, MediaResult};
use crate::folder::models::FolderDeletion;
use crate::metrics;
use crate::storage::RemoveOutcome;

impl MediaLibrary {
    /// Deletes folders together with every descendant folder, their asset
    /// rows and the files behind those rows.
    ///
    /// File removal is best-effort and always attempted before any row is
    /// deleted, so a failed removal can still be retried from the metadata.
    /// `deleted_folder_count` is the number of distinct requested ids.
    pub async fn delete_folders(
        &self,
        caller: &Caller,
        folder_ids: &[Uuid],
    ) -> MediaResult<FolderDeletion> {
        caller.ensure_authorized()?;
        if folder_ids.is_empty() {
            return Err(MediaError::validation("No folder ids supplied"));
        }

        let requested: HashSet<Uuid> = folder_ids.iter().copied().collect();
        let closure = self.tree().resolve_descendants(&requested).await?;
        let closure: Vec<Uuid> = closure.into_iter().collect();
        debug!(
            "Deleting {} requested folders expands to {} folders",
            requested.len(),
            closure.len()
        );

        let assets = self.repository.list_assets_in_folders(&closure).await?;
        let file_removal_failures = self.remove_files(&assets).await;

        let asset_ids: Vec<Uuid> = assets.iter().map(|a| a.id).collect();
        let deleted_asset_count = self.repository.delete_assets(&asset_ids).await?;

        // Descendants are named explicitly; the row cascade is only a backstop.
        let deleted_rows = self.repository.delete_folders(&closure).await?;

        info!(
            "Deleted {} folders ({} requested), {} assets, {} file removals failed",
            deleted_rows,
            requested.len(),
            deleted_asset_count,
            file_removal_failures
        );

        Ok(FolderDeletion {
            deleted_folder_count: requested.len(),
            deleted_asset_count,
            file_removal_failures,
        })
    }

    /// Best-effort delete of several assets; unknown ids are ignored.
    pub async fn bulk_delete_assets(
        &self,
        caller: &Caller,
        asset_ids: &[Uuid],
    ) -> MediaResult<AssetDeletion> {
        caller.ensure_authorized()?;
        if asset_ids.is_empty() {
            return Err(MediaError::validation("No asset ids supplied"));
        }

        let assets = self.repository.get_assets_by_ids(asset_ids).await?;
        let file_removal_failures = self.remove_files(&assets).await;

        let ids: Vec<Uuid> = assets.iter().map(|a| a.id).collect();
        let deleted_count = self.repository.delete_assets(&ids).await?;
        info!(
            "Bulk deleted {} of {} requested assets, {} file removals failed",
            deleted_count,
            asset_ids.len(),
            file_removal_failures
        );

        Ok(AssetDeletion {
            deleted_count,
            file_removal_failures,
        })
    }

    /// Deletes one asset. The row goes even when the file could not be removed.
    pub async fn delete_asset(&self, caller: &Caller, id: Uuid) -> MediaResult<RemoveOutcome> {
        caller.ensure_authorized()?;
        let asset = self.get_asset(id).await?;

        let outcome = self.storage.remove(&asset.relative_path).await;
        metrics::record_removal(&outcome);
        if let RemoveOutcome::Failed(reason) = &outcome {
            warn!("File for asset {} was not removed: {}", id, reason);
        }

        self.repository.delete_assets(&[id]).await?;
        info!("Asset {} deleted ({})", id, outcome.label());
        Ok(outcome)
    }

    /// Removes the files of `assets` concurrently and returns how many failed.
    async fn remove_files(&self, assets: &[Asset]) -> usize {
        let outcomes = join_all(
            assets
                .iter()
                .map(|asset| self.storage.remove(&asset.relative_path)),
        )
        .await;

        let mut failures = 0;
        for (asset, outcome) in assets.iter().zip(&outcomes) {
            metrics::record_removal(outcome);
            if let RemoveOutcome::Failed(reason) = outcome {
                warn!(
                    "File {} of asset {} was not removed: {}",
                    asset.relative_path, asset.id, reason
                );
                failures += 1;
            }
        }
        failures
    }
}
