pub mod process;

use async_trait::async_trait;

use crate::error::EncoderResult;

/// Runs an external media tool to completion.
///
/// Returns the combined stdout/stderr. A non-zero exit is an error.
#[async_trait]
pub trait TranscodeTool: Send + Sync {
    async fn invoke(&self, name: &str, args: &[String]) -> EncoderResult<String>;
}
