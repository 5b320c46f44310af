//! Pipeline error types.

use std::fmt;

use thiserror::Error;

use mvid_media::MediaError;

use crate::collaborators::CollaboratorError;

pub type PipelineResult<T> = Result<T, PipelineError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stage of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    FetchAudio,
    Transcribe,
    Storyboard,
    Render,
    Assemble,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::FetchAudio => "fetch_audio",
            PipelineStage::Transcribe => "transcribe",
            PipelineStage::Storyboard => "storyboard",
            PipelineStage::Render => "render",
            PipelineStage::Assemble => "assemble",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure that aborts the run.
#[derive(Debug, Error)]
#[error("{stage} failed: {reason}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    pub reason: String,
    #[source]
    pub source: Option<BoxError>,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
            source: None,
        }
    }

    pub fn with_source(
        stage: PipelineStage,
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            stage,
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Failure of a single scene. The run skips the scene unless the
/// underlying media error is fatal for every scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Image synthesis failed: {0}")]
    Image(#[source] CollaboratorError),

    #[error("Video synthesis failed: {0}")]
    Video(#[source] CollaboratorError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SceneError {
    /// Whether this failure would repeat for every remaining scene.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, SceneError::Media(e) if e.is_run_fatal())
    }
}

/// Failure while fetching the song audio.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Audio source returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Audio source returned an empty body")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
