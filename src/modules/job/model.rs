use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::error::{EncoderError, EncoderResult};
use crate::modules::video::model::{Video, validate_uuid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Starting,
    Downloading,
    Fragmenting,
    Encoding,
    Uploading,
    Finishing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Starting => "STARTING",
            JobStatus::Downloading => "DOWNLOADING",
            JobStatus::Fragmenting => "FRAGMENTING",
            JobStatus::Encoding => "ENCODING",
            JobStatus::Uploading => "UPLOADING",
            JobStatus::Finishing => "FINISHING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    // Position on the happy path. FAILED sits outside it.
    fn rank(&self) -> Option<u8> {
        match self {
            JobStatus::Starting => Some(0),
            JobStatus::Downloading => Some(1),
            JobStatus::Fragmenting => Some(2),
            JobStatus::Encoding => Some(3),
            JobStatus::Uploading => Some(4),
            JobStatus::Finishing => Some(5),
            JobStatus::Completed => Some(6),
            JobStatus::Failed => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = EncoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTING" => Ok(JobStatus::Starting),
            "DOWNLOADING" => Ok(JobStatus::Downloading),
            "FRAGMENTING" => Ok(JobStatus::Fragmenting),
            "ENCODING" => Ok(JobStatus::Encoding),
            "UPLOADING" => Ok(JobStatus::Uploading),
            "FINISHING" => Ok(JobStatus::Finishing),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(EncoderError::Validation(format!("unknown job status {other}"))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct Job {
    #[serde(rename = "job_id")]
    #[validate(custom(function = "validate_uuid"))]
    pub id: Uuid,
    #[validate(length(min = 1, message = "output bucket path can't be empty"))]
    pub output_bucket_path: String,
    pub status: JobStatus,
    #[validate(nested)]
    pub video: Video,
    #[serde(default)]
    pub error: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Job {
    pub fn new(output_bucket_path: impl Into<String>, video: Video) -> EncoderResult<Self> {
        let now = OffsetDateTime::now_utc();
        let job = Self {
            id: Uuid::new_v4(),
            output_bucket_path: output_bucket_path.into(),
            status: JobStatus::Starting,
            video,
            error: String::new(),
            created_at: now,
            updated_at: now,
        };

        job.validate()?;
        Ok(job)
    }

    /// Moves the job forward. Only strictly later happy-path states are
    /// accepted, plus FAILED from any non-terminal state.
    pub fn transition(&mut self, next: JobStatus) -> EncoderResult<()> {
        if self.status.is_terminal() {
            return Err(EncoderError::Validation(format!(
                "job {} is already {}",
                self.id, self.status
            )));
        }

        let forward = match (self.status.rank(), next.rank()) {
            (_, None) => true,
            (Some(current), Some(target)) => target > current,
            (None, Some(_)) => false,
        };
        if !forward {
            return Err(EncoderError::Validation(format!(
                "job {} can't move from {} to {}",
                self.id, self.status, next
            )));
        }

        self.status = next;
        self.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    /// Records the failure text and forces FAILED. A job that already
    /// reached a terminal state keeps it.
    pub fn fail(&mut self, error: &str) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.error = error.to_string();
        self.updated_at = OffsetDateTime::now_utc();
    }
}
