use std::sync::Arc;

use crate::config::settings::PipelineSettings;
use crate::infrastructure::storage::ObjectStore;
use crate::infrastructure::tools::TranscodeTool;
use crate::modules::job::repository::JobRepository;
use crate::modules::video::repository::VideoRepository;

/// Everything a worker needs, handed to it at construction.
#[derive(Clone)]
pub struct AppState {
    pub settings: PipelineSettings,
    pub videos: Arc<dyn VideoRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub storage: Arc<dyn ObjectStore>,
    pub tool: Arc<dyn TranscodeTool>,
}

impl AppState {
    pub fn new(
        settings: PipelineSettings,
        videos: Arc<dyn VideoRepository>,
        jobs: Arc<dyn JobRepository>,
        storage: Arc<dyn ObjectStore>,
        tool: Arc<dyn TranscodeTool>,
    ) -> Self {
        Self {
            settings,
            videos,
            jobs,
            storage,
            tool,
        }
    }
}
