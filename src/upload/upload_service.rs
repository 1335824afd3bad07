use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::storage::{sanitize_relative_path, FileInfo, Storage};

pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const MAX_FILES_PER_REQUEST: usize = 10;

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_file_size: usize,
    /// Empty means any type.
    pub allowed_mime_types: Vec<String>,
    /// Lowercase, dot-prefixed. Empty means any extension.
    pub allowed_extensions: Vec<String>,
    pub path_prefix: Option<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            allowed_mime_types: [
                "image/jpeg",
                "image/png",
                "image/gif",
                "image/webp",
                "application/pdf",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            allowed_extensions: [".jpg", ".jpeg", ".png", ".gif", ".webp", ".pdf"]
                .into_iter()
                .map(String::from)
                .collect(),
            path_prefix: None,
        }
    }
}

impl UploadPolicy {
    pub fn images_only() -> Self {
        Self {
            max_file_size: 5 * 1024 * 1024,
            allowed_mime_types: ["image/jpeg", "image/png", "image/gif", "image/webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_extensions: [".jpg", ".jpeg", ".png", ".gif", ".webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            path_prefix: None,
        }
    }

    /// Checks size, MIME type and extension. Returns the lowercase extension.
    pub fn check(&self, file: &IncomingFile) -> Result<String> {
        if self.max_file_size > 0 && file.data.len() > self.max_file_size {
            return Err(AppError::Upload(format!(
                "file too large: {} bytes (max: {})",
                file.data.len(),
                self.max_file_size
            )));
        }

        let content_type = file.content_type();
        if !self.allowed_mime_types.is_empty()
            && !self
                .allowed_mime_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
        {
            return Err(AppError::Upload(format!(
                "file type not allowed: {content_type}"
            )));
        }

        let extension = file.extension();
        if !self.allowed_extensions.is_empty()
            && !self.allowed_extensions.iter().any(|allowed| *allowed == extension)
        {
            return Err(AppError::Upload(format!(
                "file extension not allowed: {extension}"
            )));
        }

        Ok(extension)
    }

    /// `YYYY/MM/DD/<uuid><ext>`, under the optional prefix.
    pub fn generate_key(&self, extension: &str, now: DateTime<Utc>) -> String {
        let key = format!("{}/{}{}", now.format("%Y/%m/%d"), Uuid::new_v4(), extension);
        match &self.path_prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
            None => key,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl IncomingFile {
    pub fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|value| !value.is_empty())
            .unwrap_or("application/octet-stream")
    }

    pub fn extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn Storage>,
    policy: Arc<UploadPolicy>,
}

impl UploadService {
    pub fn new(storage: Arc<dyn Storage>, policy: UploadPolicy) -> Self {
        Self {
            storage,
            policy: Arc::new(policy),
        }
    }

    pub async fn upload(&self, file: IncomingFile) -> Result<FileInfo> {
        let extension = self.policy.check(&file)?;
        let key = self.policy.generate_key(&extension, Utc::now());
        let content_type = file.content_type().to_string();

        let mut info = self.storage.upload(&key, file.data, &content_type).await?;
        info.original_name = file.filename;

        tracing::info!(key = %info.key, size = info.size, "File uploaded");
        Ok(info)
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let clean = sanitize_relative_path(key)?;
        if clean.as_os_str().is_empty() {
            return Err(AppError::BadRequest("File key is required".to_string()));
        }
        self.storage.delete(key).await?;
        tracing::info!(%key, "File deleted");
        Ok(())
    }
}
