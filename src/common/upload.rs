use bytes::Bytes;
use tracing::error;

use crate::error::EncoderResult;
use crate::infrastructure::storage::s3::StorageService;

// Minimum part size for S3 is 5MB. We use 6MB to be safe.
pub const MIN_PART_SIZE: usize = 6 * 1024 * 1024;

pub struct MultipartUploader<'a> {
    storage: &'a StorageService,
    bucket: String,
    key: String,
    upload_id: String,
    parts: Vec<aws_sdk_s3::types::CompletedPart>,
    part_number: i32,
    buffer: Vec<u8>,
}

impl<'a> MultipartUploader<'a> {
    pub async fn new(
        storage: &'a StorageService,
        bucket: &str,
        key: String,
        content_type: &str,
    ) -> EncoderResult<Self> {
        let upload_id = storage
            .create_multipart_upload(bucket, &key, content_type)
            .await?;

        Ok(Self {
            storage,
            bucket: bucket.to_string(),
            key,
            upload_id,
            parts: Vec::new(),
            part_number: 1,
            buffer: Vec::with_capacity(MIN_PART_SIZE),
        })
    }

    pub async fn write_chunk(&mut self, chunk: Bytes) -> EncoderResult<()> {
        self.buffer.extend_from_slice(&chunk);

        if self.buffer.len() >= MIN_PART_SIZE {
            self.flush_part().await?;
        }

        Ok(())
    }

    async fn flush_part(&mut self) -> EncoderResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let body = Bytes::from(std::mem::replace(
            &mut self.buffer,
            Vec::with_capacity(MIN_PART_SIZE),
        ));

        let part = self
            .storage
            .upload_part(&self.bucket, &self.key, &self.upload_id, self.part_number, body)
            .await?;

        self.parts.push(part);
        self.part_number += 1;

        Ok(())
    }

    pub async fn finish(mut self) -> EncoderResult<String> {
        // Upload remaining buffer as last part
        if !self.buffer.is_empty() {
            self.flush_part().await?;
        }

        self.storage
            .complete_multipart_upload(&self.bucket, &self.key, &self.upload_id, self.parts)
            .await
    }

    pub async fn abort(&self) -> EncoderResult<()> {
        self.storage
            .abort_multipart_upload(&self.bucket, &self.key, &self.upload_id)
            .await
            .inspect_err(|e| error!("Failed to abort upload of {}: {}", self.key, e))
    }
}
