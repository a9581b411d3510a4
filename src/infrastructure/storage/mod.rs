pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::EncoderResult;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, bucket: &str, key: &str) -> EncoderResult<Bytes>;
    async fn upload(&self, bucket: &str, key: &str, body: Bytes) -> EncoderResult<()>;
}
