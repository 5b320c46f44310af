//! Storyboard scene models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Scenes shorter than this are dropped before rendering.
pub const MIN_SCENE_SECONDS: f64 = 2.0;

/// Camera motion used when the storyboard omits one.
pub const DEFAULT_MOTION_PROMPT: &str = "Slow pan right";

/// A timed unit of the storyboard.
///
/// Scenes are immutable once the storyboard is built. Render provenance
/// lives in a separate [`SceneProvenance`] keyed by scene index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Prompt for the still image
    pub visual_prompt: String,
    /// Camera-motion prompt for the video pass
    pub motion_prompt: String,
}

impl Scene {
    pub fn new(
        start: f64,
        end: f64,
        visual_prompt: impl Into<String>,
        motion_prompt: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            visual_prompt: visual_prompt.into(),
            motion_prompt: motion_prompt.into(),
        }
    }

    /// Screen time this scene must fill, in seconds.
    pub fn required_duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the scene is long enough to be rendered.
    ///
    /// NaN or inverted bounds are never renderable.
    pub fn is_renderable(&self) -> bool {
        let d = self.required_duration();
        d.is_finite() && d >= MIN_SCENE_SECONDS
    }
}

/// Public URLs recorded while rendering one scene.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SceneProvenance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl SceneProvenance {
    pub fn is_empty(&self) -> bool {
        self.image_url.is_none() && self.video_url.is_none()
    }
}

/// A scene joined with its provenance, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneRecord {
    #[serde(flatten)]
    pub scene: Scene,
    #[serde(flatten)]
    pub provenance: SceneProvenance,
}

impl SceneRecord {
    pub fn new(scene: Scene, provenance: SceneProvenance) -> Self {
        Self { scene, provenance }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_duration() {
        let scene = Scene::new(4.0, 9.0, "city", DEFAULT_MOTION_PROMPT);
        assert_eq!(scene.required_duration(), 5.0);
        assert!(scene.is_renderable());
    }

    #[test]
    fn test_short_scene_not_renderable() {
        assert!(!Scene::new(0.0, 1.99, "a", "b").is_renderable());
        assert!(Scene::new(0.0, 2.0, "a", "b").is_renderable());
        assert!(!Scene::new(5.0, 3.0, "a", "b").is_renderable());
        assert!(!Scene::new(0.0, f64::NAN, "a", "b").is_renderable());
    }

    #[test]
    fn test_record_flattens() {
        let record = SceneRecord::new(
            Scene::new(0.0, 3.0, "v", "m"),
            SceneProvenance {
                image_url: Some("https://cdn/x.png".into()),
                video_url: None,
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["visual_prompt"], "v");
        assert_eq!(json["image_url"], "https://cdn/x.png");
        assert!(json.get("video_url").is_none());
    }
}
