use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::error::{EncoderError, EncoderResult};
use crate::infrastructure::queue::Notifier;
use crate::modules::job::events::{JobNotificationError, JobResult};
use crate::modules::job::model::Job;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Reject,
}

/// Sole consumer of job results: publishes one notification per result and
/// settles the originating delivery.
pub struct JobManager {
    notifier: Arc<dyn Notifier>,
}

impl JobManager {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn run(&self, mut results: mpsc::Receiver<JobResult>) {
        while let Some(result) = results.recv().await {
            self.handle(result).await;
        }
        info!("Result channel closed, job manager stopping");
    }

    pub async fn handle(&self, result: JobResult) -> Disposition {
        let JobResult {
            job,
            delivery,
            error,
        } = result;
        let message_id = delivery.message_id().unwrap_or("-").to_string();

        let notified = match (&error, &job) {
            (Some(err), _) => {
                log_failure(&message_id, job.as_ref(), err);
                self.notify_failure(delivery.body(), err)
                    .await
                    .map(|_| Disposition::Reject)
            }
            (None, Some(job)) => self.notify_success(job).await.map(|_| Disposition::Ack),
            (None, None) => Err(EncoderError::Notify("result carries neither job nor error".into())),
        };

        let disposition = notified.unwrap_or_else(|e| {
            error!("MessageID: {} | Notification failed: {}", message_id, e);
            Disposition::Reject
        });

        let settled = match disposition {
            Disposition::Ack => delivery.ack().await,
            Disposition::Reject => delivery.reject().await,
        };
        if let Err(e) = settled {
            warn!("MessageID: {} | Failed to settle delivery: {}", message_id, e);
        }

        disposition
    }

    async fn notify_success(&self, job: &Job) -> EncoderResult<()> {
        let payload = serde_json::to_vec(job).map_err(|e| EncoderError::Notify(e.to_string()))?;
        self.notifier.notify(&payload).await
    }

    async fn notify_failure(&self, body: &[u8], err: &EncoderError) -> EncoderResult<()> {
        let payload = serde_json::to_vec(&JobNotificationError::new(body, err))
            .map_err(|e| EncoderError::Notify(e.to_string()))?;
        self.notifier.notify(&payload).await
    }
}

fn log_failure(message_id: &str, job: Option<&Job>, err: &EncoderError) {
    match job {
        Some(job) => error!(
            kind = err.kind(),
            "MessageID: {} | VideoID: {} | JobID: {} | Status: {} | Error: {}",
            message_id,
            job.video.id,
            job.id,
            job.status,
            err
        ),
        None => error!(kind = err.kind(), "MessageID: {} | Error: {}", message_id, err),
    }
}
