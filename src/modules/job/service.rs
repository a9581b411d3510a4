use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{error, info, warn};

use super::model::{Job, JobStatus};
use crate::error::{EncoderError, EncoderResult};
use crate::modules::video::service::VideoService;
use crate::state::AppState;
use crate::workers::uploader::{UploadOutcome, VideoUpload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Download,
    Fragment,
    Encode,
    Upload,
    Cleanup,
}

/// The pipeline, in order. Each status is persisted before its stage runs;
/// COMPLETED is persisted once every stage has returned.
const PIPELINE: [(JobStatus, Stage); 5] = [
    (JobStatus::Downloading, Stage::Download),
    (JobStatus::Fragmenting, Stage::Fragment),
    (JobStatus::Encoding, Stage::Encode),
    (JobStatus::Uploading, Stage::Upload),
    (JobStatus::Finishing, Stage::Cleanup),
];

pub struct JobService {
    state: AppState,
    video: VideoService,
}

impl JobService {
    pub fn new(state: AppState, job: &Job) -> Self {
        let video = VideoService::new(
            job.video.clone(),
            state.settings.local_storage_path.clone(),
            Arc::clone(&state.storage),
            Arc::clone(&state.tool),
        );
        Self { state, video }
    }

    /// Drives `job` from STARTING to COMPLETED. On any error the job is
    /// marked FAILED, persisted, and the error is handed back.
    pub async fn start(&self, job: &mut Job) -> EncoderResult<()> {
        match self.drive(job).await {
            Ok(()) => {
                info!("✅ Job {} completed", job.id);
                Ok(())
            }
            Err(e) => Err(self.fail_job(job, e).await),
        }
    }

    async fn drive(&self, job: &mut Job) -> EncoderResult<()> {
        for (status, stage) in PIPELINE {
            self.update_job_status(job, status).await?;
            self.run_stage(stage, job).await?;
        }
        self.update_job_status(job, JobStatus::Completed).await
    }

    async fn run_stage(&self, stage: Stage, job: &Job) -> EncoderResult<()> {
        match stage {
            Stage::Download => self
                .video
                .download(&self.state.settings.input_bucket)
                .await
                .map(|_| ()),
            Stage::Fragment => self.video.fragment().await.map(|_| ()),
            Stage::Encode => self.video.encode().await.map(|_| ()),
            Stage::Upload => self.perform_upload(job).await,
            Stage::Cleanup => {
                // The encoded tree is already at its destination.
                if let Err(e) = self.video.cleanup().await {
                    warn!("Cleanup for job {} left files behind: {}", job.id, e);
                }
                Ok(())
            }
        }
    }

    async fn perform_upload(&self, job: &Job) -> EncoderResult<()> {
        let upload = VideoUpload::prepare(
            Arc::clone(&self.state.storage),
            self.video.storage_root().to_path_buf(),
            self.video.encoded_dir(),
            job.output_bucket_path.clone(),
        )
        .await?;

        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(Arc::new(upload).process_upload(self.state.settings.max_upload_concurrency, done_tx));

        match done_rx.await {
            Ok(UploadOutcome::Completed) => Ok(()),
            Ok(UploadOutcome::Failed(message)) => Err(EncoderError::Transfer(message)),
            Err(_) => Err(EncoderError::transfer("upload ended without a result")),
        }
    }

    /// Persists `status` and only then applies it to `job`, so a failed
    /// write leaves the job in its last stored state.
    async fn update_job_status(&self, job: &mut Job, status: JobStatus) -> EncoderResult<()> {
        let mut next = job.clone();
        next.transition(status)?;
        *job = self.state.jobs.update(&next).await?;
        Ok(())
    }

    async fn fail_job(&self, job: &mut Job, err: EncoderError) -> EncoderError {
        job.fail(&err.to_string());

        match self.state.jobs.update(job).await {
            Ok(updated) => *job = updated,
            Err(persist) => error!("Failed to persist FAILED state for job {}: {}", job.id, persist),
        }

        err
    }
}
