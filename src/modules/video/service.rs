use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::model::Video;
use crate::error::{EncoderError, EncoderResult};
use crate::infrastructure::storage::ObjectStore;
use crate::infrastructure::tools::TranscodeTool;

pub const FRAGMENT_TOOL: &str = "mp4fragment";
pub const DASH_TOOL: &str = "mp4dash";

/// Local side effects of one job: fetching the source, running the external
/// tools over it and removing whatever they left behind.
///
/// Everything lives under `storage_root`, keyed by the video id:
/// `<id>.mp4` is the source, `<id>.frag` the fragmented copy and `<id>/` the
/// encoded tree that gets uploaded.
pub struct VideoService {
    video: Video,
    storage_root: PathBuf,
    store: Arc<dyn ObjectStore>,
    tool: Arc<dyn TranscodeTool>,
}

impl VideoService {
    pub fn new(
        video: Video,
        storage_root: impl Into<PathBuf>,
        store: Arc<dyn ObjectStore>,
        tool: Arc<dyn TranscodeTool>,
    ) -> Self {
        Self {
            video,
            storage_root: storage_root.into(),
            store,
            tool,
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn source_path(&self) -> PathBuf {
        self.storage_root.join(format!("{}.mp4", self.video.id))
    }

    pub fn fragment_path(&self) -> PathBuf {
        self.storage_root.join(format!("{}.frag", self.video.id))
    }

    pub fn encoded_dir(&self) -> PathBuf {
        self.storage_root.join(self.video.id.to_string())
    }

    pub async fn download(&self, bucket: &str) -> EncoderResult<PathBuf> {
        info!("⬇️ Downloading {}/{}", bucket, self.video.file_path);
        let body = self.store.download(bucket, &self.video.file_path).await?;

        tokio::fs::create_dir_all(&self.storage_root)
            .await
            .map_err(|e| EncoderError::transfer(format!("failed to prepare storage dir: {e}")))?;

        let target = self.source_path();
        tokio::fs::write(&target, &body).await.map_err(|e| {
            EncoderError::transfer(format!("failed to write {}: {e}", target.display()))
        })?;

        info!("⬇️ Video {} downloaded ({} bytes)", self.video.id, body.len());
        Ok(target)
    }

    pub async fn fragment(&self) -> EncoderResult<PathBuf> {
        tokio::fs::create_dir_all(self.encoded_dir())
            .await
            .map_err(|e| EncoderError::tool(format!("failed to create encode dir: {e}")))?;

        let target = self.fragment_path();
        let args = vec![
            self.source_path().display().to_string(),
            target.display().to_string(),
        ];
        let output = self.tool.invoke(FRAGMENT_TOOL, &args).await?;
        log_output(FRAGMENT_TOOL, &output);

        Ok(target)
    }

    pub async fn encode(&self) -> EncoderResult<PathBuf> {
        let target = self.encoded_dir();
        let args = vec![
            self.fragment_path().display().to_string(),
            "--use-segment-timeline".to_string(),
            "-o".to_string(),
            target.display().to_string(),
            "-f".to_string(),
        ];
        let output = self.tool.invoke(DASH_TOOL, &args).await?;
        log_output(DASH_TOOL, &output);

        Ok(target)
    }

    /// Removes the source, the fragment and the encoded tree. Stops at the
    /// first path that can't be removed.
    pub async fn cleanup(&self) -> EncoderResult<()> {
        for file in [self.source_path(), self.fragment_path()] {
            tokio::fs::remove_file(&file).await.map_err(|e| {
                EncoderError::Cleanup(format!("error removing {}: {e}", file.display()))
            })?;
        }

        let dir = self.encoded_dir();
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| EncoderError::Cleanup(format!("error removing {}: {e}", dir.display())))?;

        info!("🧹 Video {} has been removed", self.video.id);
        Ok(())
    }
}

fn log_output(tool: &str, output: &str) {
    if !output.is_empty() {
        debug!(tool, "{}", output);
    }
}
