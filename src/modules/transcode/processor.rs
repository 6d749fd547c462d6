use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use crate::error::{JobError, Phase, PhaseExt};
use crate::infrastructure::http::fetcher::SourceFetcher;
use crate::modules::transcode::encoder::Encoder;
use crate::modules::transcode::events::JobDescriptor;
use crate::modules::transcode::ladder::Ladder;
use crate::modules::transcode::manifest::write_master_playlist;
use crate::modules::transcode::uploader::StorageUploader;
use crate::modules::transcode::workspace::Workspace;

/// Consumer-facing side of job processing.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: JobDescriptor) -> Result<(), JobError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub renditions: usize,
    pub uploaded: usize,
}

pub struct JobProcessor {
    work_root: PathBuf,
    ladder: Arc<Ladder>,
    fetcher: Arc<dyn SourceFetcher>,
    encoder: Arc<dyn Encoder>,
    uploader: StorageUploader,
}

impl JobProcessor {
    pub fn new(
        work_root: impl Into<PathBuf>,
        ladder: Arc<Ladder>,
        fetcher: Arc<dyn SourceFetcher>,
        encoder: Arc<dyn Encoder>,
        uploader: StorageUploader,
    ) -> Self {
        Self {
            work_root: work_root.into(),
            ladder,
            fetcher,
            encoder,
            uploader,
        }
    }

    /// Runs one job end to end: fetch, encode every rung of the ladder in
    /// order, write the master playlist, upload. Any failure aborts the rest
    /// of the job. The workspace is gone by the time this returns.
    pub async fn process(&self, job: &JobDescriptor) -> Result<JobReport, JobError> {
        let started = Instant::now();
        info!(job_id = %job.id, "🎬 Starting job");

        let workspace =
            Workspace::acquire(&self.work_root, &job.id).in_phase(Phase::Workspace)?;
        let result = self.run(job, &workspace).await;
        workspace.release();

        // Failures are logged by the consumer, next to the ack decision.
        if let Ok(report) = &result {
            info!(
                job_id = %job.id,
                renditions = report.renditions,
                objects = report.uploaded,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "✅ Job finished"
            );
        }
        result
    }

    async fn run(&self, job: &JobDescriptor, workspace: &Workspace) -> Result<JobReport, JobError> {
        let source = workspace.source_path(&job.filename);
        self.fetcher
            .fetch(&job.source_url, &source)
            .await
            .in_phase(Phase::Fetch)?;

        let hls_dir = workspace.hls_dir();
        let mut encoded = Vec::with_capacity(self.ladder.len());
        for spec in self.ladder.iter() {
            info!(job_id = %job.id, rendition = %spec.name, "Encoding rendition");
            self.encoder
                .encode(&source, &hls_dir, &spec.name)
                .await
                .in_phase(Phase::Encode(spec.name.clone()))?;
            encoded.push(spec.name.as_str());
        }

        write_master_playlist(&hls_dir, &encoded, &self.ladder)
            .await
            .in_phase(Phase::Manifest)?;

        let uploaded = self
            .uploader
            .upload_tree(&hls_dir, &job.id)
            .await
            .in_phase(Phase::Upload)?;

        Ok(JobReport {
            renditions: encoded.len(),
            uploaded,
        })
    }
}

#[async_trait]
impl JobHandler for JobProcessor {
    async fn handle(&self, job: JobDescriptor) -> Result<(), JobError> {
        self.process(&job).await.map(|_| ())
    }
}
