//! Physical persistence of uploaded bytes, independent of metadata.
//!
//! Callers only ever see the public-facing relative path returned by
//! [`StorageProvider::store`]; how that path maps onto a medium is the
//! provider's business. [`LocalDiskStorage`] is the single-node implementation.

mod local;
pub mod rendition;

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

pub use local::LocalDiskStorage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),
    #[error("Content is not a decodable image: {0}")]
    UndecodableImage(String),
    #[error("Image rendition failed: {0}")]
    Rendition(String),
}

/// Result of writing one upload to the medium.
///
/// When the provider re-encodes an image, `stored_name`, `mime_type` and
/// `size_bytes` describe the rendition that was written, not the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub relative_path: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Per-file outcome of a physical removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RemoveOutcome {
    Deleted,
    AlreadyAbsent,
    Failed(String),
}

impl RemoveOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RemoveOutcome::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            RemoveOutcome::Deleted => "deleted",
            RemoveOutcome::AlreadyAbsent => "already_absent",
            RemoveOutcome::Failed(_) => "failed",
        }
    }
}

/// Capability interface over the physical medium.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Persists `data` under a fresh, collision-safe name derived from
    /// `suggested_name` and returns the path actually written.
    async fn store(
        &self,
        data: &[u8],
        suggested_name: &str,
        mime_type: &str,
    ) -> Result<StoredObject, StorageError>;

    /// Deletes the file at `relative_path`. Never fails: an absent file is
    /// `AlreadyAbsent`, any other problem is logged and reported as `Failed`.
    async fn remove(&self, relative_path: &str) -> RemoveOutcome;

    async fn exists(&self, relative_path: &str) -> Result<bool, StorageError>;

    async fn read(&self, relative_path: &str) -> Result<Vec<u8>, StorageError>;
}

/// Longest single path component the supported filesystems accept, in bytes.
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Extensions longer than this are treated as part of the stem when shortening.
const MAX_KEPT_EXTENSION_BYTES: usize = 16;

/// Filename-safe version of an uploaded name. Never empty.
pub fn sanitize_name(original: &str) -> String {
    let cleaned: String = sanitize_filename::sanitize(original)
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Shortens `name` to at most `max_bytes` by trimming the stem on a char
/// boundary. A short extension is kept intact.
pub fn fit_name(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_KEPT_EXTENSION_BYTES => name.split_at(dot),
        _ => (name, ""),
    };
    let mut cut = max_bytes.saturating_sub(extension.len()).min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &stem[..cut], extension)
}
