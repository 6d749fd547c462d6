pub mod s3;

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::error::WorkerError;

/// The subset of an object store the worker relies on. Puts are
/// create-or-overwrite, which is what makes re-running a job safe.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self) -> Result<bool, WorkerError>;

    async fn create_bucket(&self) -> Result<(), WorkerError>;

    async fn put_object(&self, path: &Path, key: &str, content_type: &str)
        -> Result<(), WorkerError>;
}

pub async fn ensure_bucket(store: &dyn ObjectStore) -> Result<(), WorkerError> {
    if store.bucket_exists().await? {
        info!("Bucket already exists");
    } else {
        store.create_bucket().await?;
        info!("🪣 Created bucket");
    }
    Ok(())
}
