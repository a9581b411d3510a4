use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::TranscodeTool;
use crate::error::{EncoderError, EncoderResult};

/// Spawns tools found on `PATH`.
#[derive(Debug, Default, Clone)]
pub struct ProcessTool;

#[async_trait]
impl TranscodeTool for ProcessTool {
    async fn invoke(&self, name: &str, args: &[String]) -> EncoderResult<String> {
        debug!("Running {} {}", name, args.join(" "));

        let output = Command::new(name)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EncoderError::tool(format!("failed to run {name}: {e}")))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(EncoderError::tool(format!(
                "{name} exited with {}: {}",
                output.status,
                combined.trim()
            )));
        }

        Ok(combined)
    }
}
