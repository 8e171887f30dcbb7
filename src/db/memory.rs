//! In-process repository.
//!
//! Enforces the same unique and foreign-key constraints as the PostgreSQL
//! schema, including `ON DELETE CASCADE`, so the orchestration code behaves
//! identically against either back-end.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::{AssetRepository, FolderRepository};
use crate::asset::models::{Asset, AssetMetadataUpdate, NewAsset};
use crate::error::{MediaError, MediaResult};
use crate::folder::models::{Folder, FOLDER_CYCLE_MESSAGE};

#[derive(Default)]
struct Tables {
    // (insertion sequence, row); the sequence breaks created_at ties.
    assets: HashMap<Uuid, (u64, Asset)>,
    assets_by_hash: HashMap<String, Uuid>,
    folders: HashMap<Uuid, Folder>,
    next_seq: u64,
}

impl Tables {
    fn sibling_name_taken(&self, name: &str, parent_id: Option<Uuid>, except: Option<Uuid>) -> bool {
        self.folders.values().any(|folder| {
            folder.parent_id == parent_id && folder.name == name && Some(folder.id) != except
        })
    }

    fn require_folder(&self, folder_id: Option<Uuid>, message: &str) -> MediaResult<()> {
        match folder_id {
            Some(id) if !self.folders.contains_key(&id) => Err(MediaError::not_found(message)),
            _ => Ok(()),
        }
    }

    /// True when `ancestor` is `folder_id` or lies on its parent chain.
    fn is_within(&self, ancestor: Uuid, folder_id: Uuid) -> bool {
        let mut visited = HashSet::new();
        let mut cursor = Some(folder_id);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            if !visited.insert(id) {
                return false;
            }
            cursor = self.folders.get(&id).and_then(|folder| folder.parent_id);
        }
        false
    }

    fn newest_first(&self, mut rows: Vec<(u64, Asset)>) -> Vec<Asset> {
        rows.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });
        rows.into_iter().map(|(_, asset)| asset).collect()
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset_count(&self) -> usize {
        self.tables.lock().assets.len()
    }

    pub fn folder_count(&self) -> usize {
        self.tables.lock().folders.len()
    }
}

#[async_trait]
impl AssetRepository for MemoryRepository {
    async fn find_by_hash(&self, content_hash: &str) -> MediaResult<Option<Asset>> {
        let tables = self.tables.lock();
        Ok(tables
            .assets_by_hash
            .get(content_hash)
            .and_then(|id| tables.assets.get(id))
            .map(|(_, asset)| asset.clone()))
    }

    async fn get_asset(&self, id: Uuid) -> MediaResult<Option<Asset>> {
        Ok(self.tables.lock().assets.get(&id).map(|(_, a)| a.clone()))
    }

    async fn get_assets_by_ids(&self, ids: &[Uuid]) -> MediaResult<Vec<Asset>> {
        let tables = self.tables.lock();
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        let rows = tables
            .assets
            .iter()
            .filter(|(id, _)| wanted.contains(id))
            .map(|(_, row)| row.clone())
            .collect();
        Ok(tables.newest_first(rows))
    }

    async fn create_asset(&self, new: NewAsset) -> MediaResult<Asset> {
        let mut tables = self.tables.lock();
        if tables.assets_by_hash.contains_key(&new.content_hash) {
            return Err(MediaError::conflict(
                "An asset with identical content already exists",
            ));
        }
        tables.require_folder(new.folder_id, "Target folder does not exist")?;

        let asset = Asset::from_new(new);
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables
            .assets_by_hash
            .insert(asset.content_hash.clone(), asset.id);
        tables.assets.insert(asset.id, (seq, asset.clone()));
        Ok(asset)
    }

    async fn list_assets_by_folder(&self, folder_id: Option<Uuid>) -> MediaResult<Vec<Asset>> {
        let tables = self.tables.lock();
        let rows = tables
            .assets
            .values()
            .filter(|(_, asset)| asset.folder_id == folder_id)
            .cloned()
            .collect();
        Ok(tables.newest_first(rows))
    }

    async fn list_assets_in_folders(&self, folder_ids: &[Uuid]) -> MediaResult<Vec<Asset>> {
        let tables = self.tables.lock();
        let wanted: HashSet<&Uuid> = folder_ids.iter().collect();
        let rows = tables
            .assets
            .values()
            .filter(|(_, asset)| asset.folder_id.as_ref().is_some_and(|id| wanted.contains(id)))
            .cloned()
            .collect();
        Ok(tables.newest_first(rows))
    }

    async fn update_asset_metadata(
        &self,
        id: Uuid,
        update: &AssetMetadataUpdate,
    ) -> MediaResult<Asset> {
        let mut tables = self.tables.lock();
        let (_, asset) = tables
            .assets
            .get_mut(&id)
            .ok_or_else(|| MediaError::not_found(format!("Asset {id} not found")))?;
        asset.apply_metadata(update);
        Ok(asset.clone())
    }

    async fn move_assets(&self, ids: &[Uuid], target_folder_id: Option<Uuid>) -> MediaResult<u64> {
        let mut tables = self.tables.lock();
        tables.require_folder(target_folder_id, "Target folder does not exist")?;

        let now = Utc::now();
        let mut moved = 0;
        for id in ids.iter().collect::<HashSet<_>>() {
            if let Some((_, asset)) = tables.assets.get_mut(id) {
                asset.folder_id = target_folder_id;
                asset.updated_at = now;
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn delete_assets(&self, ids: &[Uuid]) -> MediaResult<u64> {
        let mut tables = self.tables.lock();
        let mut deleted = 0;
        for id in ids.iter().collect::<HashSet<_>>() {
            if let Some((_, asset)) = tables.assets.remove(id) {
                tables.assets_by_hash.remove(&asset.content_hash);
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

#[async_trait]
impl FolderRepository for MemoryRepository {
    async fn create_folder(&self, name: &str, parent_id: Option<Uuid>) -> MediaResult<Folder> {
        let mut tables = self.tables.lock();
        tables.require_folder(parent_id, "Parent folder does not exist")?;
        if tables.sibling_name_taken(name, parent_id, None) {
            return Err(MediaError::conflict(
                "A folder with this name already exists here",
            ));
        }

        let folder = Folder::new(name, parent_id);
        tables.folders.insert(folder.id, folder.clone());
        Ok(folder)
    }

    async fn get_folder(&self, id: Uuid) -> MediaResult<Option<Folder>> {
        Ok(self.tables.lock().folders.get(&id).cloned())
    }

    async fn list_child_folders(&self, parent_id: Option<Uuid>) -> MediaResult<Vec<Folder>> {
        let tables = self.tables.lock();
        let mut children: Vec<Folder> = tables
            .folders
            .values()
            .filter(|folder| folder.parent_id == parent_id)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    async fn child_folder_ids(&self, parent_ids: &[Uuid]) -> MediaResult<Vec<Uuid>> {
        let tables = self.tables.lock();
        let parents: HashSet<&Uuid> = parent_ids.iter().collect();
        Ok(tables
            .folders
            .values()
            .filter(|folder| {
                folder
                    .parent_id
                    .as_ref()
                    .is_some_and(|parent| parents.contains(parent))
            })
            .map(|folder| folder.id)
            .collect())
    }

    async fn update_folder(
        &self,
        id: Uuid,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> MediaResult<Folder> {
        let mut tables = self.tables.lock();
        if !tables.folders.contains_key(&id) {
            return Err(MediaError::not_found(format!("Folder {id} not found")));
        }
        tables.require_folder(parent_id, "Parent folder does not exist")?;
        if parent_id.is_some_and(|parent| tables.is_within(id, parent)) {
            return Err(MediaError::validation(FOLDER_CYCLE_MESSAGE));
        }
        if tables.sibling_name_taken(name, parent_id, Some(id)) {
            return Err(MediaError::conflict(
                "A folder with this name already exists here",
            ));
        }

        let folder = tables
            .folders
            .get_mut(&id)
            .ok_or_else(|| MediaError::not_found(format!("Folder {id} not found")))?;
        folder.name = name.to_string();
        folder.parent_id = parent_id;
        Ok(folder.clone())
    }

    async fn delete_folders(&self, ids: &[Uuid]) -> MediaResult<u64> {
        let mut tables = self.tables.lock();

        let mut doomed: HashSet<Uuid> = ids
            .iter()
            .copied()
            .filter(|id| tables.folders.contains_key(id))
            .collect();
        let deleted = doomed.len() as u64;

        // ON DELETE CASCADE down the parent chain.
        loop {
            let before = doomed.len();
            let children: Vec<Uuid> = tables
                .folders
                .values()
                .filter(|f| f.parent_id.is_some_and(|p| doomed.contains(&p)))
                .map(|f| f.id)
                .collect();
            doomed.extend(children);
            if doomed.len() == before {
                break;
            }
        }

        let orphaned_assets: Vec<Uuid> = tables
            .assets
            .values()
            .filter(|(_, a)| a.folder_id.is_some_and(|f| doomed.contains(&f)))
            .map(|(_, a)| a.id)
            .collect();
        for asset_id in orphaned_assets {
            if let Some((_, asset)) = tables.assets.remove(&asset_id) {
                tables.assets_by_hash.remove(&asset.content_hash);
            }
        }
        tables.folders.retain(|id, _| !doomed.contains(id));

        Ok(deleted)
    }
}
