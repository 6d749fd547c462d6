use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::WorkerError;

/// Retrieves a job's source video into the local workspace.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Writes the resource at `url` to `dest` and returns the number of bytes
    /// written.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, WorkerError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, WorkerError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| WorkerError::Configuration(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, WorkerError> {
        info!("⬇️ Downloading source from {}", url);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WorkerError::Fetch(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WorkerError::Fetch(format!("GET {} returned {}", url, status)));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| WorkerError::Fetch(format!("reading body of {} failed: {}", url, e)))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(bytes = written, path = %dest.display(), "Source saved");
        Ok(written)
    }
}
