#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use church_media_server::auth::Caller;
use church_media_server::db::{MediaRepository, MemoryRepository};
use church_media_server::library::UploadRequest;
use church_media_server::storage::{
    sanitize_name, RemoveOutcome, StorageError, StorageProvider, StoredObject,
};
use church_media_server::MediaLibrary;

pub const TEST_MAX_UPLOAD_BYTES: usize = 1024;

/// In-memory `StorageProvider` with switchable failures.
#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    failing_removals: Mutex<HashSet<String>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later `remove` of `relative_path` reports `Failed`.
    pub fn fail_removal_of(&self, relative_path: &str) {
        self.failing_removals
            .lock()
            .insert(relative_path.to_string());
    }

    pub fn fail_writes(&self) {
        *self.fail_writes.lock() = true;
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.files.lock().contains_key(relative_path)
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    async fn store(
        &self,
        data: &[u8],
        suggested_name: &str,
        mime_type: &str,
    ) -> Result<StoredObject, StorageError> {
        if *self.fail_writes.lock() {
            return Err(StorageError::Io {
                path: "/memory".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }

        let stored_name = format!("{}-{}", Uuid::new_v4().simple(), sanitize_name(suggested_name));
        let relative_path = format!("/uploads/2024/12/{stored_name}");
        self.files
            .lock()
            .insert(relative_path.clone(), data.to_vec());

        Ok(StoredObject {
            relative_path,
            stored_name,
            mime_type: mime_type.to_string(),
            size_bytes: data.len() as u64,
        })
    }

    async fn remove(&self, relative_path: &str) -> RemoveOutcome {
        if self.failing_removals.lock().contains(relative_path) {
            return RemoveOutcome::Failed("simulated I/O error".to_string());
        }
        match self.files.lock().remove(relative_path) {
            Some(_) => RemoveOutcome::Deleted,
            None => RemoveOutcome::AlreadyAbsent,
        }
    }

    async fn exists(&self, relative_path: &str) -> Result<bool, StorageError> {
        Ok(self.contains(relative_path))
    }

    async fn read(&self, relative_path: &str) -> Result<Vec<u8>, StorageError> {
        self.files
            .lock()
            .get(relative_path)
            .cloned()
            .ok_or_else(|| StorageError::InvalidPath(relative_path.to_string()))
    }
}

pub struct TestLibrary {
    pub library: MediaLibrary,
    pub repository: Arc<MemoryRepository>,
    pub storage: Arc<MemoryStorage>,
}

pub fn setup() -> TestLibrary {
    let repository = Arc::new(MemoryRepository::new());
    let storage = Arc::new(MemoryStorage::new());
    let library = MediaLibrary::new(
        repository.clone(),
        storage.clone(),
        TEST_MAX_UPLOAD_BYTES,
    );
    TestLibrary {
        library,
        repository,
        storage,
    }
}

/// Library over an arbitrary repository, backed by a fresh `MemoryStorage`.
pub fn library_over(repository: Arc<dyn MediaRepository>) -> (MediaLibrary, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let library = MediaLibrary::new(repository, storage.clone(), TEST_MAX_UPLOAD_BYTES);
    (library, storage)
}

pub fn admin() -> Caller {
    Caller::new("admin-1", "admin")
}

pub fn viewer() -> Caller {
    Caller::new("member-9", "member")
}

pub fn text_upload(content: &str, filename: &str, folder_id: Option<Uuid>) -> UploadRequest {
    UploadRequest {
        bytes: content.as_bytes().to_vec(),
        filename: filename.to_string(),
        mime_type: "text/plain".to_string(),
        folder_id,
    }
}
