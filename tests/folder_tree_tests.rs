mod common;

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use church_media_server::folder::models::Folder;
use church_media_server::folder::FolderTree;
use church_media_server::db::FolderRepository;
use church_media_server::{MediaError, MediaResult};

use common::{admin, setup, text_upload};

/// Read-only folder table holding whatever rows a test hands it, including
/// rows the real schema would never allow.
struct FixtureFolders {
    rows: HashMap<Uuid, Folder>,
}

impl FixtureFolders {
    fn new(rows: Vec<Folder>) -> Self {
        Self {
            rows: rows.into_iter().map(|f| (f.id, f)).collect(),
        }
    }
}

fn folder(name: &str, id: Uuid, parent_id: Option<Uuid>) -> Folder {
    Folder {
        id,
        name: name.to_string(),
        parent_id,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl FolderRepository for FixtureFolders {
    async fn create_folder(&self, _name: &str, _parent_id: Option<Uuid>) -> MediaResult<Folder> {
        Err(MediaError::validation("fixture is read-only"))
    }

    async fn get_folder(&self, id: Uuid) -> MediaResult<Option<Folder>> {
        Ok(self.rows.get(&id).cloned())
    }

    async fn list_child_folders(&self, parent_id: Option<Uuid>) -> MediaResult<Vec<Folder>> {
        Ok(self
            .rows
            .values()
            .filter(|f| f.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn child_folder_ids(&self, parent_ids: &[Uuid]) -> MediaResult<Vec<Uuid>> {
        Ok(self
            .rows
            .values()
            .filter(|f| f.parent_id.is_some_and(|p| parent_ids.contains(&p)))
            .map(|f| f.id)
            .collect())
    }

    async fn update_folder(
        &self,
        _id: Uuid,
        _name: &str,
        _parent_id: Option<Uuid>,
    ) -> MediaResult<Folder> {
        Err(MediaError::validation("fixture is read-only"))
    }

    async fn delete_folders(&self, _ids: &[Uuid]) -> MediaResult<u64> {
        Err(MediaError::validation("fixture is read-only"))
    }
}

#[tokio::test]
async fn test_sibling_names_are_unique_per_parent() {
    let t = setup();
    let x = t.library.create_folder(&admin(), "X", None).await.unwrap();
    let y = t.library.create_folder(&admin(), "Y", None).await.unwrap();

    t.library
        .create_folder(&admin(), "Reports", Some(x.id))
        .await
        .unwrap();
    let duplicate = t
        .library
        .create_folder(&admin(), "Reports", Some(x.id))
        .await
        .unwrap_err();
    assert!(duplicate.is_conflict());

    t.library
        .create_folder(&admin(), "Reports", Some(y.id))
        .await
        .expect("same name under a different parent is allowed");

    let root_duplicate = t.library.create_folder(&admin(), "X", None).await.unwrap_err();
    assert!(root_duplicate.is_conflict());
}

#[tokio::test]
async fn test_breadcrumbs_stop_at_dangling_parent() {
    let missing = Uuid::new_v4();
    let b = folder("B", Uuid::new_v4(), Some(missing));
    let c = folder("C", Uuid::new_v4(), Some(b.id));
    let repo = FixtureFolders::new(vec![b.clone(), c.clone()]);

    let crumbs = FolderTree::new(&repo)
        .compute_breadcrumbs(Some(c.id))
        .await
        .unwrap();

    let names: Vec<&str> = crumbs.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["B", "C"]);
}

#[tokio::test]
async fn test_breadcrumbs_for_root_are_empty() {
    let repo = FixtureFolders::new(Vec::new());
    let crumbs = FolderTree::new(&repo).compute_breadcrumbs(None).await.unwrap();
    assert!(crumbs.is_empty());
}

#[tokio::test]
async fn test_cyclic_rows_terminate() {
    let a_id = Uuid::new_v4();
    let b_id = Uuid::new_v4();
    let repo = FixtureFolders::new(vec![
        folder("A", a_id, Some(b_id)),
        folder("B", b_id, Some(a_id)),
    ]);
    let tree = FolderTree::new(&repo);

    let closure = tree
        .resolve_descendants(&HashSet::from([a_id]))
        .await
        .unwrap();
    assert_eq!(closure, HashSet::from([a_id, b_id]));

    let crumbs = tree.compute_breadcrumbs(Some(a_id)).await.unwrap();
    assert_eq!(crumbs.len(), 2);
}

#[tokio::test]
async fn test_descendant_closure_includes_roots() {
    let a = folder("A", Uuid::new_v4(), None);
    let b = folder("B", Uuid::new_v4(), Some(a.id));
    let c = folder("C", Uuid::new_v4(), Some(b.id));
    let d = folder("D", Uuid::new_v4(), None);
    let repo = FixtureFolders::new(vec![a.clone(), b.clone(), c.clone(), d]);

    let closure = FolderTree::new(&repo)
        .resolve_descendants(&HashSet::from([a.id]))
        .await
        .unwrap();

    assert_eq!(closure, HashSet::from([a.id, b.id, c.id]));
}

#[tokio::test]
async fn test_list_folder_contents() {
    let t = setup();
    let parent = t.library.create_folder(&admin(), "Ministries", None).await.unwrap();
    t.library
        .create_folder(&admin(), "Youth", Some(parent.id))
        .await
        .unwrap();
    t.library
        .create_folder(&admin(), "Choir", Some(parent.id))
        .await
        .unwrap();
    let older = t
        .library
        .upload(&admin(), text_upload("first", "first.txt", Some(parent.id)))
        .await
        .unwrap();
    let newer = t
        .library
        .upload(&admin(), text_upload("second", "second.txt", Some(parent.id)))
        .await
        .unwrap();

    let contents = t.library.list_folder_contents(Some(parent.id)).await.unwrap();

    let names: Vec<&str> = contents.folders.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Choir", "Youth"]);
    let ids: Vec<Uuid> = contents.assets.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![newer.asset.id, older.asset.id]);
    assert_eq!(contents.breadcrumbs.len(), 1);
    assert_eq!(contents.breadcrumbs[0].id, parent.id);

    let root = t.library.list_folder_contents(None).await.unwrap();
    assert_eq!(root.folders.len(), 1);
    assert!(root.assets.is_empty());
    assert!(root.breadcrumbs.is_empty());

    let missing = t
        .library
        .list_folder_contents(Some(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(missing, MediaError::NotFound(_)));
}

#[tokio::test]
async fn test_folder_cannot_move_into_own_subtree() {
    let t = setup();
    let a = t.library.create_folder(&admin(), "A", None).await.unwrap();
    let b = t.library.create_folder(&admin(), "B", Some(a.id)).await.unwrap();

    let into_child = t
        .library
        .move_folder(&admin(), a.id, Some(b.id))
        .await
        .unwrap_err();
    assert!(matches!(into_child, MediaError::Validation(_)));

    let into_self = t
        .library
        .move_folder(&admin(), a.id, Some(a.id))
        .await
        .unwrap_err();
    assert!(matches!(into_self, MediaError::Validation(_)));

    let to_root = t.library.move_folder(&admin(), b.id, None).await.unwrap();
    assert_eq!(to_root.parent_id, None);

    let to_missing = t
        .library
        .move_folder(&admin(), b.id, Some(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(to_missing, MediaError::NotFound(_)));
}

#[tokio::test]
async fn test_opposing_moves_keep_the_tree_acyclic() {
    let t = setup();
    let a = t.library.create_folder(&admin(), "A", None).await.unwrap();
    let b = t.library.create_folder(&admin(), "B", None).await.unwrap();

    let caller = admin();
    let (a_under_b, b_under_a) = tokio::join!(
        t.library.move_folder(&caller, a.id, Some(b.id)),
        t.library.move_folder(&caller, b.id, Some(a.id)),
    );

    let outcomes = [a_under_b, b_under_a];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(MediaError::Validation(_)))));

    // Both folders are still reachable from the root.
    let roots: HashSet<Uuid> = t
        .library
        .list_folder_contents(None)
        .await
        .unwrap()
        .folders
        .iter()
        .map(|f| f.id)
        .collect();
    let reachable = FolderTree::new(t.library.repository())
        .resolve_descendants(&roots)
        .await
        .unwrap();
    assert_eq!(reachable, HashSet::from([a.id, b.id]));
}

#[tokio::test]
async fn test_rename_folder() {
    let t = setup();
    let sermons = t.library.create_folder(&admin(), "Sermons", None).await.unwrap();
    t.library.create_folder(&admin(), "Music", None).await.unwrap();

    let renamed = t
        .library
        .rename_folder(&admin(), sermons.id, "  Sermons 2024 ")
        .await
        .unwrap();
    assert_eq!(renamed.name, "Sermons 2024");

    let clash = t
        .library
        .rename_folder(&admin(), sermons.id, "Music")
        .await
        .unwrap_err();
    assert!(clash.is_conflict());
}

#[tokio::test]
async fn test_move_assets_between_folders() {
    let t = setup();
    let target = t.library.create_folder(&admin(), "Archive", None).await.unwrap();
    let one = t
        .library
        .upload(&admin(), text_upload("one", "one.txt", None))
        .await
        .unwrap();
    let two = t
        .library
        .upload(&admin(), text_upload("two", "two.txt", None))
        .await
        .unwrap();

    let moved = t
        .library
        .move_assets(&admin(), &[one.asset.id, two.asset.id], Some(target.id))
        .await
        .unwrap();
    assert_eq!(moved.moved_count, 2);
    assert_eq!(
        t.library
            .list_folder_contents(Some(target.id))
            .await
            .unwrap()
            .assets
            .len(),
        2
    );

    let back = t
        .library
        .move_assets(&admin(), &[one.asset.id], None)
        .await
        .unwrap();
    assert_eq!(back.moved_count, 1);

    let missing_target = t
        .library
        .move_assets(&admin(), &[two.asset.id], Some(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(missing_target, MediaError::NotFound(_)));

    let empty = t.library.move_assets(&admin(), &[], None).await.unwrap_err();
    assert!(matches!(empty, MediaError::Validation(_)));
}
