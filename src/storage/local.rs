use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{sanitize_relative_path, FileInfo, Result, Storage, StorageError};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    pub async fn new<P: AsRef<Path>>(base_path: P, base_url: &str) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).await?;

        Ok(Self {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = sanitize_relative_path(key)?;
        if relative.as_os_str().is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(relative))
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<FileInfo> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let written = async {
            let mut file = fs::File::create(&path).await?;
            file.write_all(&data).await?;
            file.flush().await
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&path).await;
            return Err(err.into());
        }

        let original_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| key.to_string());

        Ok(FileInfo {
            key: key.to_string(),
            original_name,
            size: data.len() as u64,
            content_type: content_type.to_string(),
            url: self.url_for(key),
            created_at: Utc::now(),
        })
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_url(&self, key: &str) -> Result<String> {
        if !self.exists(key).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(self.url_for(key))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        Ok(fs::try_exists(&path).await?)
    }
}
