//! Per-scene rendering: still image, then image-to-video, then encode.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use mvid_media::{ClipEditor, RawClip};
use mvid_models::{ImageSpec, Scene, SceneProvenance, SongId, VideoSpec};

use crate::collaborators::{AssetStore, ImageSynthesizer, VideoSynthesizer};
use crate::error::SceneError;

/// A rendered scene and the URLs recorded along the way.
#[derive(Debug, Clone)]
pub struct RenderedScene {
    pub clip: RawClip,
    pub provenance: SceneProvenance,
}

/// Asset store key for a scene's still image.
pub fn still_key(song_id: &SongId, scene_index: usize) -> String {
    format!("songs/{}/scenes/{}/still.png", song_id.file_stem(), scene_index)
}

/// Asset store key for a scene's raw clip.
pub fn raw_clip_key(song_id: &SongId, scene_index: usize) -> String {
    format!("songs/{}/scenes/{}/raw.mp4", song_id.file_stem(), scene_index)
}

/// Renders one scene into a raw clip at the video model's native length.
#[derive(Clone)]
pub struct SceneRenderer {
    images: Arc<dyn ImageSynthesizer>,
    videos: Arc<dyn VideoSynthesizer>,
    assets: Arc<dyn AssetStore>,
    editor: Arc<dyn ClipEditor>,
    image_spec: ImageSpec,
    video_spec: VideoSpec,
}

impl SceneRenderer {
    pub fn new(
        images: Arc<dyn ImageSynthesizer>,
        videos: Arc<dyn VideoSynthesizer>,
        assets: Arc<dyn AssetStore>,
        editor: Arc<dyn ClipEditor>,
    ) -> Self {
        Self {
            images,
            videos,
            assets,
            editor,
            image_spec: ImageSpec::default(),
            video_spec: VideoSpec::default(),
        }
    }

    pub fn with_specs(mut self, image_spec: ImageSpec, video_spec: VideoSpec) -> Self {
        self.image_spec = image_spec;
        self.video_spec = video_spec;
        self
    }

    pub fn video_spec(&self) -> VideoSpec {
        self.video_spec
    }

    /// Render `scene`, writing the raw clip into `scene_dir`.
    ///
    /// Upload failures are logged and leave the matching provenance URL
    /// unset; they never fail the scene.
    pub async fn render(
        &self,
        song_id: &SongId,
        scene_index: usize,
        scene: &Scene,
        scene_dir: &Path,
    ) -> Result<RenderedScene, SceneError> {
        let mut provenance = SceneProvenance::default();

        debug!(scene_index, prompt = %scene.visual_prompt, "Synthesizing still");
        let still = self
            .images
            .synthesize_image(&scene.visual_prompt, self.image_spec)
            .await
            .map_err(SceneError::Image)?;

        provenance.image_url = self
            .upload_best_effort(still.png.clone(), &still_key(song_id, scene_index), "image/png")
            .await;

        debug!(scene_index, motion = %scene.motion_prompt, "Synthesizing video");
        let frames = self
            .videos
            .synthesize_video(&scene.motion_prompt, &still, self.video_spec)
            .await
            .map_err(SceneError::Video)?;

        tokio::fs::create_dir_all(scene_dir).await?;
        let raw_path = scene_dir.join("raw.mp4");
        let clip = self
            .editor
            .encode_frames(&frames, self.video_spec.frame_rate, &raw_path)
            .await?;

        match tokio::fs::read(&clip.path).await {
            Ok(bytes) => {
                provenance.video_url = self
                    .upload_best_effort(bytes, &raw_clip_key(song_id, scene_index), "video/mp4")
                    .await;
            }
            Err(e) => warn!(scene_index, error = %e, "Could not read raw clip for upload"),
        }

        info!(
            scene_index,
            frames = clip.frame_count,
            native_duration = clip.native_duration,
            "Rendered scene"
        );
        Ok(RenderedScene { clip, provenance })
    }

    async fn upload_best_effort(&self, bytes: Vec<u8>, key: &str, content_type: &str) -> Option<String> {
        match self.assets.upload(bytes, key, content_type).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(key, error = %e, "Asset upload failed, continuing");
                None
            }
        }
    }
}
