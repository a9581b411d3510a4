use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use bytes::Bytes;
use tracing::{debug, info};

use super::ObjectStore;
use crate::common::upload::{MIN_PART_SIZE, MultipartUploader};
use crate::error::{EncoderError, EncoderResult};

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
}

impl StorageService {
    pub fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(config);

        info!("✅ Connected to S3 (MinIO)");

        Self { client }
    }

    pub async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> EncoderResult<String> {
        let result = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| transfer_error("initiate upload", key, e))?;

        result
            .upload_id
            .ok_or_else(|| EncoderError::transfer(format!("no upload id returned for {key}")))
    }

    pub async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> EncoderResult<CompletedPart> {
        let result = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| transfer_error("upload part of", key, e))?;

        Ok(CompletedPart::builder()
            .set_e_tag(result.e_tag)
            .part_number(part_number)
            .build())
    }

    pub async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> EncoderResult<String> {
        let completed_multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_multipart_upload)
            .send()
            .await
            .map_err(|e| transfer_error("complete upload of", key, e))?;

        Ok(format!("{}/{}", bucket, key))
    }

    pub async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> EncoderResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| transfer_error("abort upload of", key, e))?;

        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> EncoderResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type_for(key))
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| transfer_error("upload", key, e))?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn download(&self, bucket: &str, key: &str) -> EncoderResult<Bytes> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| transfer_error("download", key, e))?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| EncoderError::transfer(format!("failed to read {key}: {e}")))?
            .into_bytes();

        Ok(body)
    }

    async fn upload(&self, bucket: &str, key: &str, body: Bytes) -> EncoderResult<()> {
        if body.len() <= MIN_PART_SIZE {
            return self.put_object(bucket, key, body).await;
        }

        debug!("Uploading {} ({} bytes) in parts", key, body.len());
        let mut uploader =
            MultipartUploader::new(self, bucket, key.to_string(), content_type_for(key)).await?;

        let mut offset = 0;
        while offset < body.len() {
            let end = (offset + MIN_PART_SIZE).min(body.len());
            if let Err(e) = uploader.write_chunk(body.slice(offset..end)).await {
                // Abort failures are logged by the uploader.
                let _ = uploader.abort().await;
                return Err(e);
            }
            offset = end;
        }

        uploader.finish().await.map(|_| ())
    }
}

pub(crate) fn content_type_for(key: &str) -> &'static str {
    mime_guess::from_path(key)
        .first_raw()
        .unwrap_or("application/octet-stream")
}

fn transfer_error<E>(action: &str, key: &str, err: E) -> EncoderError
where
    E: std::error::Error,
{
    EncoderError::transfer(format!(
        "failed to {action} {key}: {}",
        DisplayErrorContext(&err)
    ))
}
