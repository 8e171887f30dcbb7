use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::asset::models::{deserialize_present, Asset};
use crate::error::{MediaError, MediaResult};

pub const FOLDER_CYCLE_MESSAGE: &str =
    "A folder cannot be moved into itself or one of its descendants";

/// A node in the tree used to organize assets. `parent_id == None` is a root folder.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: Uuid,
    #[schema(example = "Bulletins")]
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Folder {
    pub fn new(name: &str, parent_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            parent_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
    pub id: Uuid,
    pub name: String,
}

impl From<&Folder> for Breadcrumb {
    fn from(folder: &Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name.clone(),
        }
    }
}

#[derive(Debug, Serialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderContents {
    pub folders: Vec<Folder>,
    pub assets: Vec<Asset>,
    pub breadcrumbs: Vec<Breadcrumb>,
}

/// Report of a recursive folder delete. `deleted_folder_count` counts the
/// requested folders only, not the descendants removed with them.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderDeletion {
    pub deleted_folder_count: usize,
    pub deleted_asset_count: u64,
    pub file_removal_failures: usize,
}

/// Rename and/or re-parent. `"parentId": null` moves the folder to the root.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderUpdate {
    #[schema(example = "Youth Ministry")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,
}

/// Trims a folder name and rejects ones that cannot be shown as a path segment.
pub fn normalize_folder_name(name: &str) -> MediaResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(MediaError::validation("Folder name cannot be empty"));
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(MediaError::validation(
            "Folder name cannot contain path separators",
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folder_name() {
        assert_eq!(normalize_folder_name("  Reports ").unwrap(), "Reports");
        assert!(normalize_folder_name("   ").is_err());
        assert!(normalize_folder_name("a/b").is_err());
    }

    #[test]
    fn test_folder_update_parent_null_means_root() {
        let to_root: FolderUpdate = serde_json::from_str(r#"{"parentId": null}"#).unwrap();
        assert_eq!(to_root.parent_id, Some(None));

        let rename_only: FolderUpdate = serde_json::from_str(r#"{"name": "Sermons"}"#).unwrap();
        assert_eq!(rename_only.parent_id, None);
    }
}
