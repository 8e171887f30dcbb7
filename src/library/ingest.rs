use log::{debug, error, info, warn};
use uuid::Uuid;

use super::MediaLibrary;
use crate::asset::models::{NewAsset, UploadOutcome};
use crate::auth::Caller;
use crate::error::{MediaError, MediaResult};
use crate::hashing::content_hash;
use crate::metrics;
use crate::storage::StoredObject;

/// One uploaded file as received from the transport.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
    pub folder_id: Option<Uuid>,
}

impl MediaLibrary {
    /// Turns an uploaded buffer into a durable asset.
    ///
    /// Identical content is stored once: a dedup hit, including one detected
    /// only when the insert loses a race, returns the existing asset with
    /// `is_new_upload == false` and leaves no extra file behind.
    pub async fn upload(&self, caller: &Caller, request: UploadRequest) -> MediaResult<UploadOutcome> {
        caller.ensure_authorized()?;

        if request.bytes.is_empty() {
            return Err(MediaError::validation("Uploaded file is empty"));
        }
        if request.bytes.len() > self.max_upload_bytes {
            return Err(MediaError::validation(format!(
                "File is {} bytes; the limit is {} bytes",
                request.bytes.len(),
                self.max_upload_bytes
            )));
        }
        if let Some(folder_id) = request.folder_id {
            if self.repository.get_folder(folder_id).await?.is_none() {
                return Err(MediaError::not_found(format!(
                    "Folder {folder_id} not found"
                )));
            }
        }

        let hash = content_hash(&request.bytes);
        debug!("Upload '{}' hashed to {}", request.filename, hash);

        if let Some(existing) = self.repository.find_by_hash(&hash).await? {
            info!(
                "Upload '{}' matches existing asset {}; nothing written",
                request.filename, existing.id
            );
            metrics::record_upload(false);
            return Ok(UploadOutcome {
                asset: existing,
                is_new_upload: false,
            });
        }

        let stored = self
            .storage
            .store(&request.bytes, &request.filename, &request.mime_type)
            .await
            .map_err(|e| {
                error!("Failed to store upload '{}': {}", request.filename, e);
                MediaError::from(e)
            })?;
        debug!("Upload '{}' written to {}", request.filename, stored.relative_path);

        let new_asset = new_asset_record(&request, &stored, hash.clone());
        match self.repository.create_asset(new_asset).await {
            Ok(asset) => {
                info!("Asset {} created at {}", asset.id, asset.relative_path);
                metrics::record_upload(true);
                Ok(UploadOutcome {
                    asset,
                    is_new_upload: true,
                })
            }
            Err(err) if err.is_conflict() => {
                warn!(
                    "Concurrent upload of identical content won the insert; reclaiming {}",
                    stored.relative_path
                );
                let outcome = self.storage.remove(&stored.relative_path).await;
                metrics::record_removal(&outcome);
                metrics::record_orphan_reclaimed();

                match self.repository.find_by_hash(&hash).await? {
                    Some(existing) => {
                        metrics::record_upload(false);
                        Ok(UploadOutcome {
                            asset: existing,
                            is_new_upload: false,
                        })
                    }
                    // The winning row was deleted again before we could read it.
                    None => Err(err),
                }
            }
            Err(err) => {
                error!("Failed to record asset for '{}': {}", request.filename, err);
                let outcome = self.storage.remove(&stored.relative_path).await;
                metrics::record_removal(&outcome);
                Err(err)
            }
        }
    }
}

fn new_asset_record(request: &UploadRequest, stored: &StoredObject, content_hash: String) -> NewAsset {
    let display_name = request.filename.trim();
    NewAsset {
        display_name: if display_name.is_empty() {
            stored.stored_name.clone()
        } else {
            display_name.to_string()
        },
        stored_name: stored.stored_name.clone(),
        mime_type: stored.mime_type.clone(),
        size_bytes: i64::try_from(stored.size_bytes).unwrap_or(i64::MAX),
        relative_path: stored.relative_path.clone(),
        content_hash,
        folder_id: request.folder_id,
    }
}
