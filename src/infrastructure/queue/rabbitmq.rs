use anyhow::{anyhow, Result};
use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection,
    ConnectionProperties, Consumer,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Prefetch window: one unacknowledged delivery per consumer, so a worker
/// never holds more than the job it is working on.
pub const PREFETCH: u16 = 1;

/// Jobs survive a broker restart.
fn queue_options() -> QueueDeclareOptions {
    QueueDeclareOptions {
        durable: true,
        ..QueueDeclareOptions::default()
    }
}

/// Deliveries stay unacknowledged until the worker settles them.
fn consume_options() -> BasicConsumeOptions {
    BasicConsumeOptions {
        no_ack: false,
        ..BasicConsumeOptions::default()
    }
}

#[derive(Clone)]
pub struct RabbitMqService {
    url: String,
    conn: Arc<Mutex<Connection>>,
    channel: Arc<Mutex<Channel>>,
}

impl RabbitMqService {
    async fn connect(url: &str) -> Result<(Connection, Channel)> {
        info!("Connecting to RabbitMQ");
        let conn = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| anyhow!("Failed to connect to RabbitMQ: {}", e))?;

        let channel = conn
            .create_channel()
            .await
            .map_err(|e| anyhow!("Failed to create channel: {}", e))?;

        info!("✅ Connected to RabbitMQ");
        Ok((conn, channel))
    }

    pub async fn new(url: &str) -> Result<Self> {
        let (conn, channel) = Self::connect(url).await?;

        Ok(Self {
            url: url.to_string(),
            conn: Arc::new(Mutex::new(conn)),
            channel: Arc::new(Mutex::new(channel)),
        })
    }

    async fn reconnect(&self) -> Result<()> {
        warn!("RabbitMQ connection dropped, reconnecting...");
        let (conn, channel) = Self::connect(&self.url).await?;
        *self.conn.lock().await = conn;
        *self.channel.lock().await = channel;
        Ok(())
    }

    async fn declare(channel: &Channel, queue: &str) -> Result<()> {
        channel
            .queue_declare(queue, queue_options(), FieldTable::default())
            .await
            .map_err(|e| anyhow!("Failed to declare queue {}: {}", queue, e))?;
        Ok(())
    }

    /// Registers a manual-ack consumer on `queue` with the prefetch window
    /// applied. The returned stream yields deliveries until the channel closes.
    pub async fn consumer(&self, queue: &str, tag: &str) -> Result<Consumer> {
        let channel = self.channel.lock().await;

        Self::declare(&channel, queue).await?;

        channel
            .basic_qos(PREFETCH, BasicQosOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to set QoS: {}", e))?;

        let consumer = channel
            .basic_consume(queue, tag, consume_options(), FieldTable::default())
            .await
            .map_err(|e| anyhow!("Failed to register consumer: {}", e))?;

        info!(queue, prefetch = PREFETCH, "Consumer registered");
        Ok(consumer)
    }

    async fn publish_internal(&self, queue: &str, payload: &[u8]) -> Result<()> {
        let channel = self.channel.lock().await;

        Self::declare(&channel, queue).await?;

        channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("application/json".into()),
            )
            .await
            .map_err(|e| anyhow!("Failed to publish message: {}", e))?
            .await
            .map_err(|e| anyhow!("Failed to confirm publication: {}", e))?;

        Ok(())
    }

    pub async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        if let Err(e) = self.publish_internal(queue, payload).await {
            warn!("RabbitMQ publish failed: {}. Retrying after reconnect.", e);
            self.reconnect().await?;
            self.publish_internal(queue, payload).await?;
        }

        Ok(())
    }

    /// Closes the channel, then the connection. Unacknowledged deliveries go
    /// back to the queue.
    pub async fn close(&self) {
        if let Err(e) = self.channel.lock().await.close(200, "worker shutdown".into()).await {
            warn!("Failed to close RabbitMQ channel: {}", e);
        }
        if let Err(e) = self.conn.lock().await.close(200, "worker shutdown".into()).await {
            warn!("Failed to close RabbitMQ connection: {}", e);
        }
        info!("RabbitMQ connection closed");
    }
}
