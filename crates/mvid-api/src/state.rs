//! Application state.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use mvid_media::FfmpegEditor;
use mvid_models::SongRequest;
use mvid_worker::{Collaborators, PipelineController, PipelineResult, RunOutput, WorkerConfig};

use crate::config::ApiConfig;

/// Something that turns a song request into a finished run.
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    async fn run(&self, request: &SongRequest) -> PipelineResult<RunOutput>;
}

#[async_trait]
impl PipelineRunner for PipelineController {
    async fn run(&self, request: &SongRequest) -> PipelineResult<RunOutput> {
        PipelineController::run(self, request).await
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<dyn PipelineRunner>,
    /// Bounds concurrent pipeline runs
    pub runs: Arc<Semaphore>,
}

impl AppState {
    /// Create application state with the production pipeline.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let worker_config = WorkerConfig::from_env();
        let editor = Arc::new(FfmpegEditor::new().with_timeout(worker_config.ffmpeg_timeout_secs));
        let collaborators = Collaborators::from_env().await?;
        let controller = PipelineController::new(worker_config, collaborators, editor)?;
        Ok(Self::with_pipeline(config, Arc::new(controller)))
    }

    pub fn with_pipeline(config: ApiConfig, pipeline: Arc<dyn PipelineRunner>) -> Self {
        let runs = Arc::new(Semaphore::new(config.max_concurrent_runs.max(1)));
        Self {
            config,
            pipeline,
            runs,
        }
    }
}
