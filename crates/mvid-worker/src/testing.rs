//! In-memory collaborators for controller and renderer tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mvid_models::{Frame, GenerationRecord, ImageSpec, SongId, StillImage, TranscriptSegment, VideoSpec};

use crate::collaborators::{
    AssetStore, CollaboratorError, CollaboratorResult, Collaborators, ImageSynthesizer,
    MetadataStore, TextGenerator, Transcriber, VideoSynthesizer,
};

pub struct FakeTranscriber {
    pub segments: Vec<TranscriptSegment>,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> CollaboratorResult<Vec<TranscriptSegment>> {
        if audio.is_empty() {
            return Err(CollaboratorError::transcription("no audio"));
        }
        Ok(self.segments.clone())
    }
}

pub struct FakeText {
    pub reply: String,
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn generate(&self, _system: &str, _user: &str) -> CollaboratorResult<String> {
        Ok(self.reply.clone())
    }
}

/// Records every prompt it is asked to draw.
#[derive(Default)]
pub struct FakeImages {
    pub prompts: Mutex<Vec<String>>,
}

impl FakeImages {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSynthesizer for FakeImages {
    async fn synthesize_image(&self, prompt: &str, spec: ImageSpec) -> CollaboratorResult<StillImage> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(StillImage {
            png: b"\x89PNG still".to_vec(),
            width: spec.width,
            height: spec.height,
        })
    }
}

/// Returns `spec.frame_count` frames, unless the motion prompt is listed
/// in `fail_on` or `frames_override` is set.
#[derive(Default)]
pub struct FakeVideos {
    pub fail_on: HashSet<String>,
    pub frames_override: Option<usize>,
}

#[async_trait]
impl VideoSynthesizer for FakeVideos {
    async fn synthesize_video(
        &self,
        prompt: &str,
        _image: &StillImage,
        spec: VideoSpec,
    ) -> CollaboratorResult<Vec<Frame>> {
        if self.fail_on.contains(prompt) {
            return Err(CollaboratorError::video("CUDA out of memory"));
        }
        let count = self.frames_override.unwrap_or(spec.frame_count as usize);
        Ok(vec![Frame(b"\x89PNG frame".to_vec()); count])
    }
}

#[derive(Default)]
pub struct FakeAssets {
    pub fail: bool,
    pub keys: Mutex<Vec<String>>,
}

impl FakeAssets {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for FakeAssets {
    async fn upload(
        &self,
        _bytes: Vec<u8>,
        destination: &str,
        _content_type: &str,
    ) -> CollaboratorResult<String> {
        self.keys.lock().unwrap().push(destination.to_string());
        if self.fail {
            return Err(CollaboratorError::asset("bucket unreachable"));
        }
        Ok(format!("https://cdn.test/{}", destination))
    }
}

#[derive(Default)]
pub struct FakeMetadata {
    pub fail: bool,
    pub records: Mutex<Vec<(SongId, GenerationRecord)>>,
}

impl FakeMetadata {
    pub fn records(&self) -> Vec<(SongId, GenerationRecord)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataStore for FakeMetadata {
    async fn upsert(&self, song_id: &SongId, record: &GenerationRecord) -> CollaboratorResult<()> {
        self.records
            .lock()
            .unwrap()
            .push((song_id.clone(), record.clone()));
        if self.fail {
            return Err(CollaboratorError::metadata("permission denied"));
        }
        Ok(())
    }
}

/// Handles to the fakes behind a [`Collaborators`] bundle.
pub struct FakeSet {
    pub images: Arc<FakeImages>,
    pub assets: Arc<FakeAssets>,
    pub metadata: Arc<FakeMetadata>,
}

pub fn collaborators(
    segments: Vec<TranscriptSegment>,
    storyboard_reply: &str,
    videos: FakeVideos,
    assets: FakeAssets,
    metadata: FakeMetadata,
) -> (Collaborators, FakeSet) {
    let images = Arc::new(FakeImages::default());
    let assets = Arc::new(assets);
    let metadata = Arc::new(metadata);
    let collaborators = Collaborators {
        transcriber: Arc::new(FakeTranscriber { segments }),
        text: Arc::new(FakeText {
            reply: storyboard_reply.to_string(),
        }),
        images: images.clone(),
        videos: Arc::new(videos),
        assets: assets.clone(),
        metadata: metadata.clone(),
    };
    (
        collaborators,
        FakeSet {
            images,
            assets,
            metadata,
        },
    )
}
