use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::admin::dto::{FileEntry, FileListing};
use crate::error::{AppError, Result};
use crate::storage::sanitize_relative_path;

/// Read/delete access to the local upload directory for administrators.
#[derive(Debug, Clone)]
pub struct FileBrowser {
    root: PathBuf,
}

impl FileBrowser {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directories first, then files, each sorted by name. A missing directory lists as empty.
    pub async fn list(&self, dir: Option<&str>) -> Result<FileListing> {
        let relative = sanitize_relative_path(dir.unwrap_or_default())
            .map_err(|_| AppError::BadRequest("Invalid directory path".to_string()))?;
        let current_dir = to_slash(&relative);
        let target = self.root.join(&relative);

        let mut reader = match tokio::fs::read_dir(&target).await {
            Ok(reader) => reader,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FileListing {
                    files: Vec::new(),
                    total: 0,
                    total_size: 0,
                    current_dir,
                })
            }
            Err(err) => return Err(AppError::Internal(format!("Failed to read directory: {err}"))),
        };

        let mut files = Vec::new();
        let mut total_size = 0;
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read directory: {e}")))?
        {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = metadata.is_dir();

            let (extension, mime_type) = if is_dir {
                (String::new(), String::new())
            } else {
                total_size += metadata.len();
                let extension = Path::new(&name)
                    .extension()
                    .map(|ext| ext.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                let mime = mime_guess::from_path(&name).first_or_octet_stream();
                (extension, mime.essence_str().to_string())
            };

            files.push(FileEntry {
                path: to_slash(&relative.join(&name)),
                name,
                size: metadata.len(),
                is_dir,
                mod_time: metadata.modified().ok().map(DateTime::<Utc>::from),
                extension,
                mime_type,
            });
        }

        files.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));

        Ok(FileListing {
            total: files.len(),
            files,
            total_size,
            current_dir,
        })
    }

    /// Removes a file, or a directory with everything under it.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let relative = sanitize_relative_path(path)
            .map_err(|_| AppError::BadRequest("Invalid file path".to_string()))?;
        if relative.as_os_str().is_empty() {
            return Err(AppError::BadRequest("File path is required".to_string()));
        }

        let target = self.root.join(&relative);
        let metadata = match tokio::fs::metadata(&target).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound("File not found".to_string()))
            }
            Err(err) => return Err(AppError::Internal(format!("Failed to stat file: {err}"))),
        };

        let removed = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_file(&target).await
        };
        removed.map_err(|e| AppError::Internal(format!("Failed to delete file: {e}")))?;

        tracing::info!(path = %to_slash(&relative), "Upload removed by admin");
        Ok(())
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
