//! Runtime configuration for the media server, read from the environment.

use anyhow::{Context, Result};
use std::path::PathBuf;

pub const DEFAULT_UPLOAD_ROOT: &str = "./public/uploads";
pub const DEFAULT_PUBLIC_PREFIX: &str = "/uploads";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_IMAGE_MAX_WIDTH: u32 = 1920;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// `DATABASE_URL` value that selects the in-process repository instead of PostgreSQL.
pub const MEMORY_DATABASE_URL: &str = "memory";

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub database_url: String,
    pub upload_root: PathBuf,
    pub public_prefix: String,
    pub max_upload_bytes: usize,
    pub image_max_width: u32,
    pub bind_address: String,
}

impl MediaConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("MAX_UPLOAD_BYTES is not a byte count: {raw}"))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let image_max_width = match lookup("IMAGE_MAX_WIDTH") {
            Some(raw) => {
                let width = raw
                    .trim()
                    .parse::<u32>()
                    .with_context(|| format!("IMAGE_MAX_WIDTH is not a pixel width: {raw}"))?;
                anyhow::ensure!(width > 0, "IMAGE_MAX_WIDTH must be greater than zero");
                width
            }
            None => DEFAULT_IMAGE_MAX_WIDTH,
        };

        let mut public_prefix =
            lookup("UPLOAD_PUBLIC_PREFIX").unwrap_or_else(|| DEFAULT_PUBLIC_PREFIX.to_string());
        if !public_prefix.starts_with('/') {
            public_prefix.insert(0, '/');
        }
        let public_prefix = public_prefix.trim_end_matches('/').to_string();
        anyhow::ensure!(
            !public_prefix.is_empty(),
            "UPLOAD_PUBLIC_PREFIX must not be the site root"
        );

        Ok(Self {
            database_url,
            upload_root: PathBuf::from(
                lookup("UPLOAD_ROOT").unwrap_or_else(|| DEFAULT_UPLOAD_ROOT.to_string()),
            ),
            public_prefix,
            max_upload_bytes,
            image_max_width,
            bind_address: lookup("BIND_ADDRESS")
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
        })
    }

    pub fn uses_memory_repository(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }
}
