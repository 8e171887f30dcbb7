mod common;

use uuid::Uuid;

use church_media_server::asset::models::Asset;
use church_media_server::db::{AssetRepository, FolderRepository};
use church_media_server::folder::models::{Folder, FolderDeletion};
use church_media_server::storage::{RemoveOutcome, StorageProvider};
use church_media_server::MediaError;

use common::{admin, setup, text_upload, viewer, TestLibrary};

struct Chain {
    a: Folder,
    b: Folder,
    c: Folder,
    assets: Vec<Asset>,
}

/// A -> B -> C with one asset in each folder.
async fn build_chain(t: &TestLibrary) -> Chain {
    let a = t.library.create_folder(&admin(), "A", None).await.unwrap();
    let b = t.library.create_folder(&admin(), "B", Some(a.id)).await.unwrap();
    let c = t.library.create_folder(&admin(), "C", Some(b.id)).await.unwrap();

    let mut assets = Vec::new();
    for folder in [&a, &b, &c] {
        let outcome = t
            .library
            .upload(
                &admin(),
                text_upload(&format!("content of {}", folder.name), "file.txt", Some(folder.id)),
            )
            .await
            .unwrap();
        assets.push(outcome.asset);
    }

    Chain { a, b, c, assets }
}

#[tokio::test]
async fn test_delete_removes_whole_subtree_and_files() {
    let t = setup();
    let chain = build_chain(&t).await;
    assert_eq!(t.storage.file_count(), 3);

    let report = t.library.delete_folders(&admin(), &[chain.a.id]).await.unwrap();

    assert_eq!(
        report,
        FolderDeletion {
            deleted_folder_count: 1,
            deleted_asset_count: 3,
            file_removal_failures: 0,
        }
    );
    for folder in [&chain.a, &chain.b, &chain.c] {
        assert!(t.repository.get_folder(folder.id).await.unwrap().is_none());
    }
    assert_eq!(t.repository.asset_count(), 0);
    assert_eq!(t.storage.file_count(), 0);
}

#[tokio::test]
async fn test_failed_file_removal_does_not_block_metadata_cleanup() {
    let t = setup();
    let chain = build_chain(&t).await;
    let stuck = &chain.assets[1];
    t.storage.fail_removal_of(&stuck.relative_path);

    let report = t.library.delete_folders(&admin(), &[chain.a.id]).await.unwrap();

    assert_eq!(report.deleted_folder_count, 1);
    assert_eq!(report.deleted_asset_count, 3);
    assert_eq!(report.file_removal_failures, 1);
    assert_eq!(t.repository.asset_count(), 0);
    assert_eq!(t.repository.folder_count(), 0);
    // Only the stuck file is left behind for a later orphan scan.
    assert_eq!(t.storage.file_count(), 1);
    assert!(t.storage.contains(&stuck.relative_path));
}

#[tokio::test]
async fn test_count_reflects_requested_ids_only() {
    let t = setup();
    let chain = build_chain(&t).await;

    let report = t
        .library
        .delete_folders(&admin(), &[chain.a.id, chain.b.id, chain.a.id])
        .await
        .unwrap();

    assert_eq!(report.deleted_folder_count, 2);
    assert_eq!(t.repository.folder_count(), 0);
}

#[tokio::test]
async fn test_unrelated_folders_and_root_assets_survive() {
    let t = setup();
    let chain = build_chain(&t).await;
    let other = t.library.create_folder(&admin(), "Other", None).await.unwrap();
    let kept_in_folder = t
        .library
        .upload(&admin(), text_upload("keep me", "keep.txt", Some(other.id)))
        .await
        .unwrap();
    let kept_at_root = t
        .library
        .upload(&admin(), text_upload("root file", "root.txt", None))
        .await
        .unwrap();

    t.library.delete_folders(&admin(), &[chain.a.id]).await.unwrap();

    assert!(t.repository.get_folder(other.id).await.unwrap().is_some());
    assert!(t
        .repository
        .get_asset(kept_in_folder.asset.id)
        .await
        .unwrap()
        .is_some());
    assert!(t.storage.contains(&kept_at_root.asset.relative_path));
    assert_eq!(t.repository.asset_count(), 2);
}

#[tokio::test]
async fn test_delete_folders_requires_ids_and_role() {
    let t = setup();
    let chain = build_chain(&t).await;

    let empty = t.library.delete_folders(&admin(), &[]).await.unwrap_err();
    assert!(matches!(empty, MediaError::Validation(_)));

    let denied = t
        .library
        .delete_folders(&viewer(), &[chain.a.id])
        .await
        .unwrap_err();
    assert!(matches!(denied, MediaError::Unauthorized(_)));
    assert_eq!(t.repository.folder_count(), 3);
    assert_eq!(t.storage.file_count(), 3);
}

#[tokio::test]
async fn test_bulk_delete_skips_unknown_ids() {
    let t = setup();
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
    t.storage.fail_removal_of(&two.asset.relative_path);

    let report = t
        .library
        .bulk_delete_assets(&admin(), &[one.asset.id, two.asset.id, Uuid::new_v4()])
        .await
        .unwrap();

    assert_eq!(report.deleted_count, 2);
    assert_eq!(report.file_removal_failures, 1);
    assert_eq!(t.repository.asset_count(), 0);
}

#[tokio::test]
async fn test_delete_single_asset() {
    let t = setup();
    let uploaded = t
        .library
        .upload(&admin(), text_upload("notice", "notice.txt", None))
        .await
        .unwrap();

    let outcome = t
        .library
        .delete_asset(&admin(), uploaded.asset.id)
        .await
        .unwrap();
    assert_eq!(outcome, RemoveOutcome::Deleted);
    assert_eq!(t.storage.file_count(), 0);

    let again = t
        .library
        .delete_asset(&admin(), uploaded.asset.id)
        .await
        .unwrap_err();
    assert!(matches!(again, MediaError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_asset_whose_file_is_already_gone() {
    let t = setup();
    let uploaded = t
        .library
        .upload(&admin(), text_upload("notice", "notice.txt", None))
        .await
        .unwrap();
    t.library
        .storage()
        .remove(&uploaded.asset.relative_path)
        .await;

    let outcome = t
        .library
        .delete_asset(&admin(), uploaded.asset.id)
        .await
        .unwrap();

    assert_eq!(outcome, RemoveOutcome::AlreadyAbsent);
    assert_eq!(t.repository.asset_count(), 0);
}
