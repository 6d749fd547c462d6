use std::fmt::Display;

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{JobError, WorkerError};
use crate::infrastructure::queue::delivery::{Disposition, InboundMessage};
use crate::modules::transcode::events::JobDescriptor;
use crate::modules::transcode::processor::JobHandler;

/// Why the delivery loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    StreamClosed,
    StreamError(String),
}

/// Ack policy for a handled message. Every handler failure is requeued,
/// non-retryable ones included: there is no dead-letter path, so the
/// message stays visible to an operator instead of vanishing.
pub fn disposition(outcome: &Result<(), JobError>) -> Disposition {
    match outcome {
        Ok(()) => Disposition::Ack,
        Err(_) => Disposition::Requeue,
    }
}

/// Decodes one delivery, runs the handler and settles the message.
/// Returns the disposition that was applied.
pub async fn handle_delivery<M, H>(message: &M, handler: &H) -> Disposition
where
    M: InboundMessage + ?Sized,
    H: JobHandler + ?Sized,
{
    let disposition = match JobDescriptor::from_payload(message.payload()) {
        Err(e) => {
            warn!(error = %e, "🗑️ Dropping malformed message");
            Disposition::Drop
        }
        Ok(job) => {
            info!(
                job_id = %job.id,
                url = %job.source_url,
                filename = %job.filename,
                "📦 Received job"
            );
            let job_id = job.id.clone();
            let outcome = handler.handle(job).await;
            if let Err(e) = &outcome {
                log_failure(&job_id, e);
            }
            disposition(&outcome)
        }
    };

    if let Err(e) = message.settle(disposition).await {
        error!(error = %e, ?disposition, "Failed to settle message");
    }
    disposition
}

fn log_failure(job_id: &str, err: &JobError) {
    if err.is_retryable() {
        warn!(job_id, phase = %err.phase, error = %err.source, "❌ Job failed, requeueing");
    } else {
        let kind = match err.source {
            WorkerError::Configuration(_) => "configuration",
            _ => "environment",
        };
        error!(
            job_id,
            phase = %err.phase,
            error = %err.source,
            kind,
            "Job failed with a non-retryable error, requeueing for operator attention"
        );
    }
}

/// Pulls deliveries one at a time until cancelled or the broker stream ends.
///
/// Cancellation is only observed between deliveries: a job that has already
/// been received always runs to completion and is settled before the loop
/// exits.
pub async fn run<S, M, E, H>(
    mut deliveries: S,
    handler: &H,
    shutdown: CancellationToken,
) -> StopReason
where
    S: Stream<Item = Result<M, E>> + Unpin,
    M: InboundMessage,
    E: Display,
    H: JobHandler + ?Sized,
{
    info!("🎥 Transcoder worker listening");

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Shutdown requested, no longer taking deliveries");
                return StopReason::Cancelled;
            }
            next = deliveries.next() => next,
        };

        match next {
            Some(Ok(message)) => {
                handle_delivery(&message, handler).await;
            }
            Some(Err(e)) => {
                error!(error = %e, "Delivery stream failed");
                return StopReason::StreamError(e.to_string());
            }
            None => {
                warn!("Delivery stream closed by broker");
                return StopReason::StreamClosed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Phase;

    #[test]
    fn success_acks_and_failure_requeues() {
        assert_eq!(disposition(&Ok(())), Disposition::Ack);

        let transient = JobError::new(Phase::Fetch, WorkerError::Fetch("503".into()));
        assert_eq!(disposition(&Err(transient)), Disposition::Requeue);

        let config = JobError::new(
            Phase::Encode("4k".into()),
            WorkerError::Configuration("unknown rendition".into()),
        );
        assert_eq!(disposition(&Err(config)), Disposition::Requeue);
    }
}
