//! Interfaces to the external services a pipeline run depends on.
//!
//! The controller only sees these traits. Production adapters live in
//! [`crate::adapters`]; tests substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use mvid_models::{Frame, GenerationRecord, ImageSpec, SongId, StillImage, TranscriptSegment, VideoSpec};

/// Error reported by any collaborator.
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("transcription: {0}")]
    Transcription(String),

    #[error("text generation: {0}")]
    TextGeneration(String),

    #[error("image synthesis: {0}")]
    ImageSynthesis(String),

    #[error("video synthesis: {0}")]
    VideoSynthesis(String),

    #[error("asset store: {0}")]
    AssetStore(String),

    #[error("metadata store: {0}")]
    MetadataStore(String),
}

impl CollaboratorError {
    pub fn transcription(msg: impl ToString) -> Self {
        Self::Transcription(msg.to_string())
    }

    pub fn text(msg: impl ToString) -> Self {
        Self::TextGeneration(msg.to_string())
    }

    pub fn image(msg: impl ToString) -> Self {
        Self::ImageSynthesis(msg.to_string())
    }

    pub fn video(msg: impl ToString) -> Self {
        Self::VideoSynthesis(msg.to_string())
    }

    pub fn asset(msg: impl ToString) -> Self {
        Self::AssetStore(msg.to_string())
    }

    pub fn metadata(msg: impl ToString) -> Self {
        Self::MetadataStore(msg.to_string())
    }
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Speech-to-text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> CollaboratorResult<Vec<TranscriptSegment>>;
}

/// Instruction-following text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> CollaboratorResult<String>;
}

#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    async fn synthesize_image(&self, prompt: &str, spec: ImageSpec) -> CollaboratorResult<StillImage>;
}

/// Image-conditioned video synthesis.
#[async_trait]
pub trait VideoSynthesizer: Send + Sync {
    async fn synthesize_video(
        &self,
        prompt: &str,
        image: &StillImage,
        spec: VideoSpec,
    ) -> CollaboratorResult<Vec<Frame>>;
}

/// Remote object storage. Returns the public URL of the upload.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        destination: &str,
        content_type: &str,
    ) -> CollaboratorResult<String>;
}

/// Generation metadata keyed by song id. Writes overwrite.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn upsert(&self, song_id: &SongId, record: &GenerationRecord) -> CollaboratorResult<()>;
}

/// The full set of collaborators a pipeline run uses.
#[derive(Clone)]
pub struct Collaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub text: Arc<dyn TextGenerator>,
    pub images: Arc<dyn ImageSynthesizer>,
    pub videos: Arc<dyn VideoSynthesizer>,
    pub assets: Arc<dyn AssetStore>,
    pub metadata: Arc<dyn MetadataStore>,
}
