use anyhow::Result;
use async_trait::async_trait;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicNackOptions};

/// What happens to a delivery once the worker is done with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Processed; remove from the queue.
    Ack,
    /// Failed; put back for another attempt.
    Requeue,
    /// Can never succeed; discard.
    Drop,
}

/// A message received from the broker that has to be settled exactly once.
#[async_trait]
pub trait InboundMessage: Send + Sync {
    fn payload(&self) -> &[u8];

    async fn settle(&self, disposition: Disposition) -> Result<()>;
}

#[async_trait]
impl InboundMessage for Delivery {
    fn payload(&self) -> &[u8] {
        &self.data
    }

    async fn settle(&self, disposition: Disposition) -> Result<()> {
        match disposition {
            Disposition::Ack => {
                self.acker.ack(BasicAckOptions::default()).await?;
            }
            Disposition::Requeue | Disposition::Drop => {
                self.acker
                    .nack(BasicNackOptions {
                        requeue: disposition == Disposition::Requeue,
                        ..BasicNackOptions::default()
                    })
                    .await?;
            }
        }
        Ok(())
    }
}
