use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use validator::Validate;

use crate::common::json::ensure_document;
use crate::error::EncoderResult;
use crate::infrastructure::queue::{DeliveryHandle, DeliveryStream};
use crate::modules::job::events::JobResult;
use crate::modules::job::model::Job;
use crate::modules::job::service::JobService;
use crate::modules::video::dto::VideoDraft;
use crate::modules::video::model::Video;
use crate::state::AppState;

/// Spawns `max_conversion_concurrency` workers that share `deliveries` and
/// report into `results`. Workers stop once the stream is closed and drained.
pub fn spawn_job_workers(
    state: AppState,
    deliveries: DeliveryStream,
    results: mpsc::Sender<JobResult>,
) -> Vec<JoinHandle<()>> {
    let count = state.settings.max_conversion_concurrency;
    info!("🎥 Starting {} job workers", count);

    (0..count)
        .map(|worker_id| {
            let worker = JobWorker::new(worker_id, state.clone());
            let deliveries = deliveries.clone();
            let results = results.clone();
            tokio::spawn(worker.run(deliveries, results))
        })
        .collect()
}

pub struct JobWorker {
    id: usize,
    state: AppState,
}

impl JobWorker {
    pub fn new(id: usize, state: AppState) -> Self {
        Self { id, state }
    }

    pub async fn run(self, deliveries: DeliveryStream, results: mpsc::Sender<JobResult>) {
        while let Ok(delivery) = deliveries.recv().await {
            info!(worker = self.id, "📦 Received encoding job");

            let result = self.process(delivery).await;
            if results.send(result).await.is_err() {
                error!(worker = self.id, "Result channel closed, stopping worker");
                return;
            }
        }
        warn!(worker = self.id, "Delivery stream closed");
    }

    /// Turns one delivery into exactly one `JobResult`.
    pub async fn process(&self, delivery: DeliveryHandle) -> JobResult {
        let mut job = match self.prepare(delivery.body()).await {
            Ok(job) => job,
            Err(e) => return JobResult::failed(None, delivery, e),
        };

        let service = JobService::new(self.state.clone(), &job);
        match service.start(&mut job).await {
            Ok(()) => JobResult::completed(job, delivery),
            Err(e) => JobResult::failed(Some(job), delivery, e),
        }
    }

    /// Parses, validates and persists the video, then creates its job.
    async fn prepare(&self, body: &[u8]) -> EncoderResult<Job> {
        ensure_document(body)?;
        let draft: VideoDraft = serde_json::from_slice(body)?;

        let video = Video::from_draft(draft);
        video.validate()?;
        self.state.videos.insert(&video).await?;

        let job = Job::new(self.state.settings.output_bucket.clone(), video)?;
        self.state.jobs.insert(&job).await?;

        Ok(job)
    }
}
