use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use tracing::{debug, info};

use crate::config::settings::AppConfig;
use crate::error::WorkerError;
use crate::infrastructure::storage::ObjectStore;

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(
        endpoint: &str,
        region: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        info!("✅ S3 client ready for {} (bucket {})", endpoint, bucket);

        Self {
            client: Client::from_conf(config),
            bucket: bucket.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.minio_url,
            &config.minio_region,
            &config.minio_bucket,
            &config.minio_access_key,
            &config.minio_secret_key,
        )
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn bucket_exists(&self) -> Result<bool, WorkerError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let err = err.into_service_error();
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(WorkerError::Storage(format!(
                        "failed to check bucket {}: {}",
                        self.bucket,
                        DisplayErrorContext(&err)
                    )))
                }
            }
        }
    }

    async fn create_bucket(&self) -> Result<(), WorkerError> {
        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                WorkerError::Storage(format!(
                    "failed to create bucket {}: {}",
                    self.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    async fn put_object(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<(), WorkerError> {
        let body = ByteStream::from_path(path).await.map_err(|e| {
            WorkerError::Storage(format!("failed to open {}: {}", path.display(), e))
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                WorkerError::Storage(format!(
                    "failed to upload {}: {}",
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!(key, "Uploaded object");
        Ok(())
    }
}
