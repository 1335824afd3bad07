pub mod local;
pub mod s3;

use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::Config;

pub use local::LocalStorage;
pub use s3::S3Storage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub key: String,
    pub original_name: String,
    pub size: u64,
    pub content_type: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic blob store addressed by slash-separated keys.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<FileInfo>;

    async fn download(&self, key: &str) -> Result<Vec<u8>>;

    /// Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn get_url(&self, key: &str) -> Result<String>;

    async fn exists(&self, key: &str) -> Result<bool>;
}

/// S3 when a bucket is configured, the local upload directory otherwise.
pub async fn storage_from_config(config: &Config) -> Result<Arc<dyn Storage>> {
    match &config.s3 {
        Some(s3) => {
            tracing::info!(bucket = %s3.bucket, region = %s3.region, "Storage backend: S3");
            Ok(Arc::new(S3Storage::new(s3).await?))
        }
        None => {
            tracing::info!(dir = %config.upload_dir, "Storage backend: local filesystem");
            Ok(Arc::new(
                LocalStorage::new(&config.upload_dir, &config.upload_base_url).await?,
            ))
        }
    }
}

/// Normalizes a client-supplied relative path, rejecting anything that could
/// escape the storage root.
pub fn sanitize_relative_path(raw: &str) -> Result<PathBuf> {
    if raw.contains('\0') || raw.contains('\\') {
        return Err(StorageError::InvalidKey(raw.to_string()));
    }

    let mut clean = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::InvalidKey(raw.to_string()))
            }
        }
    }
    Ok(clean)
}
