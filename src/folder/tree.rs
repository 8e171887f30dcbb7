//! Hierarchy queries over the folder repository.

use log::warn;
use std::collections::HashSet;
use uuid::Uuid;

use super::models::Breadcrumb;
use crate::db::FolderRepository;
use crate::error::MediaResult;

/// Read-side view of the folder hierarchy.
pub struct FolderTree<'a, R: FolderRepository + ?Sized> {
    repository: &'a R,
}

impl<'a, R: FolderRepository + ?Sized> FolderTree<'a, R> {
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// Breadth-first closure of `root_ids` over the child relation, roots
    /// included. Each folder is expanded once, so malformed cyclic data
    /// still terminates.
    pub async fn resolve_descendants(&self, root_ids: &HashSet<Uuid>) -> MediaResult<HashSet<Uuid>> {
        let mut closure: HashSet<Uuid> = root_ids.clone();
        let mut frontier: Vec<Uuid> = root_ids.iter().copied().collect();

        while !frontier.is_empty() {
            let children = self.repository.child_folder_ids(&frontier).await?;
            frontier = children
                .into_iter()
                .filter(|id| closure.insert(*id))
                .collect();
        }

        Ok(closure)
    }

    /// Root-first chain ending at `folder_id`. A dangling parent reference
    /// ends the walk and the valid part of the chain is returned.
    pub async fn compute_breadcrumbs(&self, folder_id: Option<Uuid>) -> MediaResult<Vec<Breadcrumb>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = folder_id;

        while let Some(id) = cursor {
            if !seen.insert(id) {
                warn!("Folder {} appears twice in its own ancestor chain", id);
                break;
            }
            match self.repository.get_folder(id).await? {
                Some(folder) => {
                    chain.push(Breadcrumb::from(&folder));
                    cursor = folder.parent_id;
                }
                None => {
                    if !chain.is_empty() {
                        warn!("Folder chain has a dangling parent reference to {}", id);
                    }
                    break;
                }
            }
        }

        chain.reverse();
        Ok(chain)
    }

    /// True when `candidate` is `folder_id` itself or one of its ancestors.
    pub async fn is_self_or_ancestor(&self, candidate: Uuid, folder_id: Uuid) -> MediaResult<bool> {
        let mut seen = HashSet::new();
        let mut cursor = Some(folder_id);

        while let Some(id) = cursor {
            if id == candidate {
                return Ok(true);
            }
            if !seen.insert(id) {
                break;
            }
            cursor = match self.repository.get_folder(id).await? {
                Some(folder) => folder.parent_id,
                None => None,
            };
        }

        Ok(false)
    }
}
