use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client,
};
use chrono::Utc;

use super::{FileInfo, Result, Storage, StorageError};
use crate::config::S3Config;

const PRESIGNED_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// AWS S3 or any S3-compatible service (MinIO, Spaces) when an endpoint is set.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(config: &S3Config) -> Result<Self> {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "static",
            ));
        }

        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        })
    }
}

fn backend<E: std::error::Error>(err: E) -> StorageError {
    StorageError::Backend(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<FileInfo> {
        let size = data.len() as u64;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(size as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(backend)?;

        let url = self.get_url(key).await.unwrap_or_default();

        Ok(FileInfo {
            key: key.to_string(),
            original_name: key.rsplit('/').next().unwrap_or(key).to_string(),
            size,
            content_type: content_type.to_string(),
            url,
            created_at: Utc::now(),
        })
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().map(|e| e.is_no_such_key()).unwrap_or(false) {
                    StorageError::NotFound(key.to_string())
                } else {
                    backend(err)
                }
            })?;

        let bytes = output.body.collect().await.map_err(backend)?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn get_url(&self, key: &str) -> Result<String> {
        let presigning = PresigningConfig::expires_in(PRESIGNED_URL_TTL).map_err(backend)?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(backend)?;

        Ok(request.uri().to_string())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().map(|e| e.is_not_found()).unwrap_or(false) => {
                Ok(false)
            }
            Err(err) => Err(backend(err)),
        }
    }
}
