use async_trait::async_trait;
use uuid::Uuid;

use super::model::Video;
use crate::error::{EncoderError, EncoderResult};
use crate::infrastructure::db::pool::DbPool;

#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn insert(&self, video: &Video) -> EncoderResult<Uuid>;
    async fn update(&self, video: &Video) -> EncoderResult<Video>;
    async fn find(&self, id: Uuid) -> EncoderResult<Video>;
}

pub struct PgVideoRepository {
    pool: DbPool,
}

impl PgVideoRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    async fn insert(&self, video: &Video) -> EncoderResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO videos (id, resource_id, file_path, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(video.id)
        .bind(&video.resource_id)
        .bind(&video.file_path)
        .bind(video.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EncoderError::Persistence(format!("failed to insert video: {e}")))?;

        Ok(id)
    }

    async fn update(&self, video: &Video) -> EncoderResult<Video> {
        sqlx::query_as::<_, Video>(
            r#"
            UPDATE videos
            SET resource_id = $1, file_path = $2
            WHERE id = $3
            RETURNING id, resource_id, file_path, created_at
            "#,
        )
        .bind(&video.resource_id)
        .bind(&video.file_path)
        .bind(video.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EncoderError::Persistence(format!("failed to update video: {e}")))?
        .ok_or_else(|| EncoderError::NotFound(format!("video {}", video.id)))
    }

    async fn find(&self, id: Uuid) -> EncoderResult<Video> {
        sqlx::query_as::<_, Video>(
            r#"
            SELECT id, resource_id, file_path, created_at
            FROM videos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EncoderError::Persistence(format!("failed to fetch video: {e}")))?
        .ok_or_else(|| EncoderError::NotFound(format!("video {id}")))
    }
}
