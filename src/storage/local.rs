use async_trait::async_trait;
use chrono::{Datelike, Utc};
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::rendition::{self, RENDITION_MIME_TYPE};
use super::{
    fit_name, sanitize_name, RemoveOutcome, StorageError, StorageProvider, StoredObject,
    MAX_FILE_NAME_BYTES,
};

/// Bytes taken by the `{token}-` prefix of every stored name.
const TOKEN_PREFIX_BYTES: usize = 33;

/// Local-disk storage rooted at an upload directory.
///
/// Layout: `{root}/{year}/{month}/{token}-{sanitized-name}`; the public path is
/// the same layout under `public_prefix`, e.g. `/uploads/2024/12/3f2a...-choir.webp`.
pub struct LocalDiskStorage {
    root: PathBuf,
    public_prefix: String,
    image_max_width: u32,
}

impl LocalDiskStorage {
    /// Creates the root directory if it does not exist yet.
    pub fn new(
        root: impl Into<PathBuf>,
        public_prefix: &str,
        image_max_width: u32,
    ) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            path: root.clone(),
            source,
        })?;
        info!("Local disk storage ready at {}", root.display());

        Ok(Self {
            root,
            public_prefix: format!("/{}", public_prefix.trim_matches('/')),
            image_max_width,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a public path back onto the upload root, refusing anything that
    /// could escape it.
    fn resolve(&self, relative_path: &str) -> Result<PathBuf, StorageError> {
        let inner = relative_path
            .strip_prefix(&self.public_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| StorageError::InvalidPath(relative_path.to_string()))?;

        let inner = Path::new(inner);
        let is_plain = inner
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain || inner.as_os_str().is_empty() {
            return Err(StorageError::InvalidPath(relative_path.to_string()));
        }

        Ok(self.root.join(inner))
    }

    async fn write_new_file(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        let io_error = |source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        };

        // create_new: an existing file is never overwritten.
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(io_error)?;

        let written = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(source) = written {
            drop(file);
            if let Err(cleanup) = fs::remove_file(path).await {
                warn!(
                    "Could not remove partially written file {}: {}",
                    path.display(),
                    cleanup
                );
            }
            return Err(io_error(source));
        }

        Ok(())
    }
}

#[async_trait]
impl StorageProvider for LocalDiskStorage {
    async fn store(
        &self,
        data: &[u8],
        suggested_name: &str,
        mime_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let sanitized = sanitize_name(suggested_name);

        let (payload, file_name, stored_mime) = if rendition::should_reencode(mime_type) {
            debug!("Re-encoding {} ({}) as WebP", sanitized, mime_type);
            let source = data.to_vec();
            let max_width = self.image_max_width;
            let encoded =
                tokio::task::spawn_blocking(move || rendition::render_webp(&source, max_width))
                    .await
                    .map_err(|e| StorageError::Rendition(e.to_string()))??;
            (
                encoded,
                rendition::rendition_name(&sanitized),
                RENDITION_MIME_TYPE.to_string(),
            )
        } else {
            (data.to_vec(), sanitized, mime_type.to_string())
        };

        let now = Utc::now();
        let partition = format!("{:04}/{:02}", now.year(), now.month());
        let directory = self.root.join(&partition);
        fs::create_dir_all(&directory)
            .await
            .map_err(|source| StorageError::Io {
                path: directory.clone(),
                source,
            })?;

        let file_name = fit_name(&file_name, MAX_FILE_NAME_BYTES - TOKEN_PREFIX_BYTES);
        let stored_name = format!("{}-{}", Uuid::new_v4().simple(), file_name);
        let path = directory.join(&stored_name);
        self.write_new_file(&path, &payload).await?;

        let relative_path = format!("{}/{}/{}", self.public_prefix, partition, stored_name);
        info!(
            "Stored {} bytes at {} ({})",
            payload.len(),
            relative_path,
            stored_mime
        );

        Ok(StoredObject {
            relative_path,
            stored_name,
            mime_type: stored_mime,
            size_bytes: payload.len() as u64,
        })
    }

    async fn remove(&self, relative_path: &str) -> RemoveOutcome {
        let path = match self.resolve(relative_path) {
            Ok(path) => path,
            Err(e) => {
                warn!("Refusing to remove {}: {}", relative_path, e);
                return RemoveOutcome::Failed(e.to_string());
            }
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed physical file {}", path.display());
                RemoveOutcome::Deleted
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Physical file {} was already absent", path.display());
                RemoveOutcome::AlreadyAbsent
            }
            Err(e) => {
                warn!("Failed to remove physical file {}: {}", path.display(), e);
                RemoveOutcome::Failed(e.to_string())
            }
        }
    }

    async fn exists(&self, relative_path: &str) -> Result<bool, StorageError> {
        let path = self.resolve(relative_path)?;
        fs::try_exists(&path)
            .await
            .map_err(|source| StorageError::Io { path, source })
    }

    async fn read(&self, relative_path: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(relative_path)?;
        fs::read(&path)
            .await
            .map_err(|source| StorageError::Io { path, source })
    }
}
