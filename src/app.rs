use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::settings::AppConfig;
use crate::infrastructure::http::fetcher::HttpFetcher;
use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::infrastructure::storage::s3::S3Storage;
use crate::infrastructure::storage::{ObjectStore, ensure_bucket};
use crate::modules::transcode::encoder::FfmpegEncoder;
use crate::modules::transcode::ladder::Ladder;
use crate::modules::transcode::processor::JobProcessor;
use crate::modules::transcode::uploader::StorageUploader;
use crate::state::AppState;

pub fn load_ladder(config: &AppConfig) -> Result<Ladder> {
    match &config.ladder_file {
        Some(path) => {
            let ladder = Ladder::load(path)?;
            info!(path = %path.display(), renditions = ladder.len(), "Loaded rendition ladder");
            Ok(ladder)
        }
        None => Ok(Ladder::standard()),
    }
}

/// Connects to the object store and the broker and assembles the job
/// pipeline. Fails if any collaborator is unreachable or misconfigured.
pub async fn create_app(config: AppConfig) -> Result<AppState> {
    let ladder = Arc::new(load_ladder(&config)?);

    let storage = S3Storage::from_config(&config);
    ensure_bucket(&storage)
        .await
        .with_context(|| format!("bucket {} is not usable", storage.bucket()))?;
    let store: Arc<dyn ObjectStore> = Arc::new(storage);

    let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout)?);
    let encoder = Arc::new(FfmpegEncoder::new(&config.ffmpeg_path, ladder.clone()));
    let processor = Arc::new(JobProcessor::new(
        config.work_dir.clone(),
        ladder,
        fetcher,
        encoder,
        StorageUploader::new(store),
    ));

    let queue = RabbitMqService::new(&config.rabbitmq_url).await?;

    Ok(AppState::new(config, queue, processor))
}
