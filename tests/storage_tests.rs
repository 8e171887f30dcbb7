use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use church_media_server::storage::{LocalDiskStorage, RemoveOutcome, StorageError, StorageProvider};

fn disk_storage(dir: &tempfile::TempDir) -> LocalDiskStorage {
    LocalDiskStorage::new(dir.path().join("uploads"), "/uploads", 1920).unwrap()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([10, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn test_same_suggested_name_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let storage = disk_storage(&dir);

    let first = storage.store(b"first photo", "photo.jpg", "text/plain").await.unwrap();
    let second = storage.store(b"second photo", "photo.jpg", "text/plain").await.unwrap();

    assert_ne!(first.relative_path, second.relative_path);
    assert_eq!(storage.read(&first.relative_path).await.unwrap(), b"first photo");
    assert_eq!(storage.read(&second.relative_path).await.unwrap(), b"second photo");
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let storage = disk_storage(&dir);
    let stored = storage.store(b"bulletin", "bulletin.txt", "text/plain").await.unwrap();

    assert_eq!(storage.remove(&stored.relative_path).await, RemoveOutcome::Deleted);
    assert_eq!(
        storage.remove(&stored.relative_path).await,
        RemoveOutcome::AlreadyAbsent
    );
    assert_eq!(
        storage.remove("/uploads/1999/01/never-written.txt").await,
        RemoveOutcome::AlreadyAbsent
    );
    assert!(!storage.exists(&stored.relative_path).await.unwrap());
}

#[tokio::test]
async fn test_remove_outside_root_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let storage = disk_storage(&dir);

    let outcome = storage.remove("/uploads/../../etc/passwd").await;
    assert!(outcome.is_failure());
}

#[tokio::test]
async fn test_wide_image_becomes_bounded_webp() {
    let dir = tempfile::tempdir().unwrap();
    let storage = disk_storage(&dir);

    let stored = storage
        .store(&png(2400, 100), "Easter Banner.PNG", "image/png")
        .await
        .unwrap();

    assert_eq!(stored.mime_type, "image/webp");
    assert!(stored.stored_name.ends_with("Easter_Banner.webp"));
    assert!(stored.relative_path.ends_with(".webp"));

    let written = storage.read(&stored.relative_path).await.unwrap();
    assert_eq!(written.len() as u64, stored.size_bytes);
    let decoded = image::load_from_memory_with_format(&written, ImageFormat::WebP).unwrap();
    assert_eq!(decoded.dimensions(), (1920, 80));
}

#[tokio::test]
async fn test_gif_is_stored_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let storage = disk_storage(&dir);
    let bytes = b"GIF89a not really decoded".to_vec();

    let stored = storage.store(&bytes, "wave.gif", "image/gif").await.unwrap();

    assert_eq!(stored.mime_type, "image/gif");
    assert!(stored.stored_name.ends_with("wave.gif"));
    assert_eq!(storage.read(&stored.relative_path).await.unwrap(), bytes);
}

#[tokio::test]
async fn test_undecodable_image_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let storage = disk_storage(&dir);

    let err = storage
        .store(b"definitely not a jpeg", "fake.jpg", "image/jpeg")
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::UndecodableImage(_)));
}

#[tokio::test]
async fn test_very_long_upload_names_are_stored() {
    let dir = tempfile::tempdir().unwrap();
    let storage = disk_storage(&dir);

    let document = storage
        .store(b"annual report", &format!("{}.pdf", "d".repeat(250)), "application/pdf")
        .await
        .unwrap();
    assert!(document.stored_name.len() <= 255);
    assert!(document.stored_name.ends_with(".pdf"));
    assert!(storage.exists(&document.relative_path).await.unwrap());

    let photo = storage
        .store(&png(40, 20), &format!("{}.jpg", "p".repeat(250)), "image/jpeg")
        .await
        .unwrap();
    assert!(photo.stored_name.len() <= 255);
    assert!(photo.stored_name.ends_with(".webp"));
    assert!(storage.exists(&photo.relative_path).await.unwrap());
}
