//! Clip types passed between rendering, reconciliation and assembly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Duration tolerance in seconds when comparing clip lengths.
pub const DURATION_EPSILON: f64 = 1e-3;

/// A freshly synthesized clip at its native length.
///
/// Native length is `frame_count / frame_rate` and is the same for every
/// scene of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawClip {
    pub path: PathBuf,
    pub frame_count: u32,
    pub frame_rate: u32,
    pub native_duration: f64,
}

impl RawClip {
    pub fn new(path: impl Into<PathBuf>, frame_count: u32, frame_rate: u32) -> Self {
        let native_duration = if frame_rate == 0 {
            0.0
        } else {
            frame_count as f64 / frame_rate as f64
        };
        Self {
            path: path.into(),
            frame_count,
            frame_rate,
            native_duration,
        }
    }
}

/// A clip whose duration matches its scene's required duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledClip {
    /// Index of the scene in the storyboard
    pub scene_index: usize,
    pub path: PathBuf,
    pub duration: f64,
}

/// The final muxed video with the original audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterArtifact {
    pub path: PathBuf,
    /// Sum of the assembled clip durations
    pub video_duration: f64,
    pub clip_count: usize,
}

impl MasterArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Output geometry for the master timeline.
///
/// Clips of other sizes are letterboxed into this frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineGeometry {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for TimelineGeometry {
    fn default() -> Self {
        Self {
            width: 1360,
            height: 768,
            fps: 24,
        }
    }
}

/// Encoder settings for the master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterEncoding {
    pub video_codec: String,
    pub preset: String,
    pub video_bitrate: String,
    pub audio_codec: String,
}

impl Default for MasterEncoding {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            video_bitrate: "8000k".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_duration() {
        let clip = RawClip::new("/tmp/a.mp4", 49, 8);
        assert!((clip.native_duration - 6.125).abs() < 1e-9);
        assert_eq!(RawClip::new("/tmp/a.mp4", 49, 0).native_duration, 0.0);
        assert_eq!(RawClip::new("/tmp/a.mp4", 0, 8).native_duration, 0.0);
    }
}
