use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// One physically stored, content-addressed file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[schema(example = "a1b2c3d4-e5f6-7890-1234-567890abcdef")]
    pub id: Uuid,
    #[schema(example = "Easter Service.jpg")]
    pub display_name: String,
    #[schema(example = "3f2a9c0e5b7d4e1f8a6b2c3d4e5f6a7b-Easter_Service.webp")]
    pub stored_name: String,
    #[schema(example = "image/webp")]
    pub mime_type: String,
    pub size_bytes: i64,
    #[schema(example = "/uploads/2024/12/3f2a9c0e5b7d4e1f8a6b2c3d4e5f6a7b-Easter_Service.webp")]
    pub relative_path: String,
    #[schema(example = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")]
    pub content_hash: String,
    #[schema(example = "Choir during the Easter morning service")]
    pub caption: Option<String>,
    pub folder_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields recorded when the ingestion pipeline creates an asset.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub display_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub relative_path: String,
    pub content_hash: String,
    pub folder_id: Option<Uuid>,
}

impl Asset {
    pub fn from_new(new: NewAsset) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            display_name: new.display_name,
            stored_name: new.stored_name,
            mime_type: new.mime_type,
            size_bytes: new.size_bytes,
            relative_path: new.relative_path,
            content_hash: new.content_hash,
            caption: None,
            folder_id: new.folder_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a metadata edit. Storage-bound fields are never touched.
    pub fn apply_metadata(&mut self, update: &AssetMetadataUpdate) {
        if let Some(display_name) = &update.display_name {
            self.display_name = display_name.trim().to_string();
        }
        if let Some(caption) = &update.caption {
            self.caption = caption.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Partial edit of display-only fields. An explicit `"caption": null` clears
/// the caption; leaving it out keeps the current one.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadataUpdate {
    #[schema(example = "Easter Sunday 2024")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<String>, example = "Choir during the Easter morning service")]
    pub caption: Option<Option<String>>,
}

impl AssetMetadataUpdate {
    pub fn validate(&self) -> MediaResult<()> {
        if self.display_name.is_none() && self.caption.is_none() {
            return Err(MediaError::validation("No metadata fields to update"));
        }
        if let Some(name) = &self.display_name {
            if name.trim().is_empty() {
                return Err(MediaError::validation("Display name cannot be empty"));
            }
        }
        Ok(())
    }

    pub fn caption_provided(&self) -> bool {
        self.caption.is_some()
    }
}

/// Maps a present field (even `null`) to `Some`, so a missing field stays `None`.
pub(crate) fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Result of a single upload. A dedup hit is a success with `is_new_upload: false`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub asset: Asset,
    pub is_new_upload: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetMove {
    pub moved_count: u64,
}

/// Best-effort batch delete report.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetDeletion {
    pub deleted_count: u64,
    pub file_removal_failures: usize,
}
