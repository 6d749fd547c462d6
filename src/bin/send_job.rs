//! Publishes a single transcoding job, for local testing.
//!
//! ```text
//! send-job test-123 https://example.com/sample.mp4 sample.mp4
//! ```

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;

use hls_worker::config::env::EnvKey;
use hls_worker::infrastructure::queue::rabbitmq::RabbitMqService;
use hls_worker::modules::transcode::events::JobDescriptor;

#[derive(Parser, Debug)]
#[command(name = "send-job", about = "Publish a video job to the transcoding queue")]
struct Args {
    /// Job id; becomes the object key prefix
    id: String,

    /// Where the worker downloads the source video from
    url: String,

    /// File name to store the source under
    filename: String,

    #[arg(long, env = "RABBITMQ_URL")]
    amqp_url: Option<String>,

    #[arg(long, env = "RABBITMQ_QUEUE")]
    queue: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    let amqp_url = args
        .amqp_url
        .or_else(|| EnvKey::RabbitMqUrl.default_value().map(str::to_string))
        .unwrap_or_default();
    let queue = args
        .queue
        .or_else(|| EnvKey::RabbitMqQueue.default_value().map(str::to_string))
        .unwrap_or_default();

    let job = JobDescriptor {
        id: args.id,
        source_url: args.url,
        filename: args.filename,
    };
    let body = serde_json::to_vec(&job)?;
    // Refuse to publish what the worker would drop as malformed.
    JobDescriptor::from_payload(&body)?;

    let service = RabbitMqService::new(&amqp_url).await?;
    service.publish(&queue, &body).await?;
    service.close().await;

    println!("✅ Sent message to {}: {}", queue, String::from_utf8_lossy(&body));
    Ok(())
}
