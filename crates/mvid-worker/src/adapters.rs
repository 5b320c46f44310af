//! Production implementations of the collaborator traits.

use std::sync::Arc;

use async_trait::async_trait;

use mvid_firestore::{FirestoreClient, GenerationRepository};
use mvid_ml_client::MlClient;
use mvid_models::{Frame, GenerationRecord, ImageSpec, SongId, StillImage, TranscriptSegment, VideoSpec};
use mvid_storage::R2Client;

use crate::collaborators::{
    AssetStore, CollaboratorError, CollaboratorResult, Collaborators, ImageSynthesizer,
    MetadataStore, TextGenerator, Transcriber, VideoSynthesizer,
};

#[async_trait]
impl Transcriber for MlClient {
    async fn transcribe(&self, audio: &[u8]) -> CollaboratorResult<Vec<TranscriptSegment>> {
        MlClient::transcribe(self, audio)
            .await
            .map_err(CollaboratorError::transcription)
    }
}

#[async_trait]
impl TextGenerator for MlClient {
    async fn generate(&self, system: &str, user: &str) -> CollaboratorResult<String> {
        MlClient::generate(self, system, user)
            .await
            .map_err(CollaboratorError::text)
    }
}

#[async_trait]
impl ImageSynthesizer for MlClient {
    async fn synthesize_image(&self, prompt: &str, spec: ImageSpec) -> CollaboratorResult<StillImage> {
        MlClient::synthesize_image(self, prompt, spec)
            .await
            .map_err(CollaboratorError::image)
    }
}

#[async_trait]
impl VideoSynthesizer for MlClient {
    async fn synthesize_video(
        &self,
        prompt: &str,
        image: &StillImage,
        spec: VideoSpec,
    ) -> CollaboratorResult<Vec<Frame>> {
        MlClient::synthesize_video(self, prompt, image, spec)
            .await
            .map_err(CollaboratorError::video)
    }
}

#[async_trait]
impl AssetStore for R2Client {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        destination: &str,
        content_type: &str,
    ) -> CollaboratorResult<String> {
        self.upload_bytes(bytes, destination, content_type)
            .await
            .map_err(CollaboratorError::asset)
    }
}

#[async_trait]
impl MetadataStore for GenerationRepository {
    async fn upsert(&self, song_id: &SongId, record: &GenerationRecord) -> CollaboratorResult<()> {
        GenerationRepository::upsert(self, song_id, record)
            .await
            .map_err(CollaboratorError::metadata)
    }
}

impl Collaborators {
    /// Build the production collaborators from environment variables.
    pub async fn from_env() -> anyhow::Result<Self> {
        let ml = Arc::new(MlClient::from_env()?);
        let storage = Arc::new(R2Client::from_env().await?);
        let firestore = FirestoreClient::from_env().await?;
        let repo = Arc::new(GenerationRepository::new(firestore));

        Ok(Self {
            transcriber: ml.clone(),
            text: ml.clone(),
            images: ml.clone(),
            videos: ml,
            assets: storage,
            metadata: repo,
        })
    }
}
