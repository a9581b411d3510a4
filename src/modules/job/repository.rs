use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{Job, JobStatus};
use crate::error::{EncoderError, EncoderResult};
use crate::infrastructure::db::pool::DbPool;
use crate::modules::video::model::Video;

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert(&self, job: &Job) -> EncoderResult<Uuid>;
    /// Persists the job and returns it with a refreshed `updated_at`.
    async fn update(&self, job: &Job) -> EncoderResult<Job>;
    async fn find(&self, id: Uuid) -> EncoderResult<Job>;
}

pub struct PgJobRepository {
    pool: DbPool,
}

impl PgJobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// Job joined with its video.
#[derive(FromRow)]
struct JobRow {
    id: Uuid,
    output_bucket_path: String,
    status: String,
    error: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    video_id: Uuid,
    video_resource_id: String,
    video_file_path: String,
    video_created_at: OffsetDateTime,
}

impl TryFrom<JobRow> for Job {
    type Error = EncoderError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            output_bucket_path: row.output_bucket_path,
            status: row.status.parse::<JobStatus>()?,
            video: Video {
                id: row.video_id,
                resource_id: row.video_resource_id,
                file_path: row.video_file_path,
                created_at: row.video_created_at,
            },
            error: row.error.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn insert(&self, job: &Job) -> EncoderResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO jobs (id, video_id, output_bucket_path, status, error, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(job.id)
        .bind(job.video.id)
        .bind(&job.output_bucket_path)
        .bind(job.status.as_str())
        .bind(&job.error)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EncoderError::Persistence(format!("failed to insert job: {e}")))?;

        Ok(id)
    }

    async fn update(&self, job: &Job) -> EncoderResult<Job> {
        let mut updated = job.clone();
        updated.updated_at = OffsetDateTime::now_utc();

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET output_bucket_path = $1, status = $2, error = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(&updated.output_bucket_path)
        .bind(updated.status.as_str())
        .bind(&updated.error)
        .bind(updated.updated_at)
        .bind(updated.id)
        .execute(&self.pool)
        .await
        .map_err(|e| EncoderError::Persistence(format!("failed to update job: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(EncoderError::NotFound(format!("job {}", job.id)));
        }

        Ok(updated)
    }

    async fn find(&self, id: Uuid) -> EncoderResult<Job> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT
                j.id, j.output_bucket_path, j.status, j.error, j.created_at, j.updated_at,
                v.id AS video_id,
                v.resource_id AS video_resource_id,
                v.file_path AS video_file_path,
                v.created_at AS video_created_at
            FROM jobs j
            JOIN videos v ON v.id = j.video_id
            WHERE j.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EncoderError::Persistence(format!("failed to fetch job: {e}")))?
        .ok_or_else(|| EncoderError::NotFound(format!("job {id}")))?;

        Job::try_from(row)
    }
}
