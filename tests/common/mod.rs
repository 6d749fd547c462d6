#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use hls_worker::error::{JobError, WorkerError};
use hls_worker::infrastructure::http::fetcher::SourceFetcher;
use hls_worker::infrastructure::queue::delivery::{Disposition, InboundMessage};
use hls_worker::infrastructure::storage::ObjectStore;
use hls_worker::modules::transcode::encoder::Encoder;
use hls_worker::modules::transcode::events::JobDescriptor;
use hls_worker::modules::transcode::ladder::Ladder;
use hls_worker::modules::transcode::processor::{JobHandler, JobProcessor};
use hls_worker::modules::transcode::uploader::StorageUploader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// In-memory bucket that records every put in order.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    puts: Mutex<Vec<String>>,
    bucket: Mutex<bool>,
    fail_on: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_on(&self, key: &str) {
        *self.fail_on.lock().unwrap() = Some(key.to_string());
    }

    pub fn clear_failure(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    pub fn has_bucket(&self) -> bool {
        *self.bucket.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn bucket_exists(&self) -> Result<bool, WorkerError> {
        Ok(*self.bucket.lock().unwrap())
    }

    async fn create_bucket(&self) -> Result<(), WorkerError> {
        *self.bucket.lock().unwrap() = true;
        Ok(())
    }

    async fn put_object(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<(), WorkerError> {
        if self.fail_on.lock().unwrap().as_deref() == Some(key) {
            return Err(WorkerError::Storage(format!("injected failure for {}", key)));
        }
        let body = tokio::fs::read(path).await?;
        self.puts.lock().unwrap().push(key.to_string());
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// Writes fixed bytes instead of talking to the network.
pub struct StaticFetcher {
    body: Option<Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn serving(body: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            body: Some(body.to_vec()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            body: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, WorkerError> {
        self.calls.lock().unwrap().push(url.to_string());
        match &self.body {
            Some(body) => {
                tokio::fs::write(dest, body).await?;
                Ok(body.len() as u64)
            }
            None => Err(WorkerError::Fetch(format!("GET {} returned 503", url))),
        }
    }
}

/// Stands in for ffmpeg: writes a playlist and two segments derived from the
/// input bytes, or fails on a chosen rendition.
#[derive(Default)]
pub struct ScriptedEncoder {
    fail_on: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedEncoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(rendition: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(rendition.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Encoder for ScriptedEncoder {
    async fn encode(
        &self,
        input: &Path,
        hls_root: &Path,
        rendition: &str,
    ) -> Result<(), WorkerError> {
        self.calls.lock().unwrap().push(rendition.to_string());
        if self.fail_on.as_deref() == Some(rendition) {
            return Err(WorkerError::Encoder(format!("ffmpeg exited with 1 for {}", rendition)));
        }

        let source = tokio::fs::read(input).await?;
        let dir = hls_root.join(rendition);
        tokio::fs::create_dir_all(&dir).await?;

        let mut playlist = String::from("#EXTM3U\n#EXT-X-TARGETDURATION:10\n");
        for i in 0..2 {
            let name = format!("segment_{:03}.ts", i);
            let mut body = rendition.as_bytes().to_vec();
            body.extend_from_slice(&source);
            tokio::fs::write(dir.join(&name), body).await?;
            playlist.push_str(&format!("#EXTINF:10.0,\n{}\n", name));
        }
        playlist.push_str("#EXT-X-ENDLIST\n");
        tokio::fs::write(dir.join("playlist.m3u8"), playlist).await?;
        // Encoders leave logs around; these must not be uploaded.
        tokio::fs::write(dir.join("encode.log"), "frame=1").await?;
        Ok(())
    }
}

pub fn processor(
    work_root: &Path,
    ladder: Ladder,
    fetcher: Arc<dyn SourceFetcher>,
    encoder: Arc<dyn Encoder>,
    store: Arc<MemoryStore>,
) -> JobProcessor {
    JobProcessor::new(
        PathBuf::from(work_root),
        Arc::new(ladder),
        fetcher,
        encoder,
        StorageUploader::new(store),
    )
}

pub fn job(id: &str) -> JobDescriptor {
    JobDescriptor {
        id: id.to_string(),
        source_url: format!("http://media.local/{}.mp4", id),
        filename: "source.mp4".to_string(),
    }
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// A delivery whose settlement is written to a shared log.
pub struct MemoryDelivery {
    pub body: Vec<u8>,
    log: Arc<Mutex<Vec<Disposition>>>,
}

impl MemoryDelivery {
    pub fn new(body: &[u8], log: &Arc<Mutex<Vec<Disposition>>>) -> Self {
        Self {
            body: body.to_vec(),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl InboundMessage for MemoryDelivery {
    fn payload(&self) -> &[u8] {
        &self.body
    }

    async fn settle(&self, disposition: Disposition) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(disposition);
        Ok(())
    }
}

pub type Outcome = fn(&JobDescriptor) -> Result<(), JobError>;

/// Handler that records the jobs it sees and answers with `outcome`.
pub struct RecordingHandler {
    pub seen: Mutex<Vec<JobDescriptor>>,
    outcome: Outcome,
    on_handle: Option<Box<dyn Fn() + Send + Sync>>,
}

impl RecordingHandler {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            outcome,
            on_handle: None,
        }
    }

    pub fn with_hook(outcome: Outcome, hook: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            outcome,
            on_handle: Some(Box::new(hook)),
        }
    }

    pub fn seen_ids(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|j| j.id.clone()).collect()
    }
}

#[async_trait]
impl JobHandler for RecordingHandler {
    async fn handle(&self, job: JobDescriptor) -> Result<(), JobError> {
        if let Some(hook) = &self.on_handle {
            hook();
        }
        // Yield so a concurrently requested shutdown has a chance to race.
        tokio::task::yield_now().await;
        let outcome = (self.outcome)(&job);
        self.seen.lock().unwrap().push(job);
        outcome
    }
}
