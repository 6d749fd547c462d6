use anyhow::Result;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hls_worker::app;
use hls_worker::config::settings::AppConfig;
use hls_worker::workers::transcoder::{self, StopReason};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting HLS worker...");

    let config = AppConfig::new()?;
    let state = app::create_app(config).await?;

    let consumer = state
        .queue
        .consumer(&state.config.queue_name, &state.config.consumer_tag)
        .await?;

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let reason = transcoder::run(consumer, state.processor.as_ref(), shutdown).await;
    state.queue.close().await;

    match reason {
        StopReason::StreamError(e) => {
            error!("Worker stopped: {}", e);
            Err(anyhow::anyhow!("delivery stream failed: {}", e))
        }
        StopReason::StreamClosed | StopReason::Cancelled => {
            info!("👋 Worker shutdown complete");
            Ok(())
        }
    }
}

async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, finishing current job");
    shutdown.cancel();
}
