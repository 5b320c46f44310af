//! Shared data models for the music video pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Songs and inbound generation requests
//! - Transcript segments produced by speech-to-text
//! - Storyboard scenes and their render provenance
//! - Generation records persisted to the metadata store

pub mod generation;
pub mod media;
pub mod scene;
pub mod song;
pub mod timestamp;
pub mod transcript;

// Re-export common types
pub use generation::{GenerationRecord, GenerationStatus};
pub use media::{Frame, ImageSpec, StillImage, VideoSpec};
pub use scene::{
    Scene, SceneProvenance, SceneRecord, DEFAULT_MOTION_PROMPT, MIN_SCENE_SECONDS,
};
pub use song::{SongId, SongRequest, DEFAULT_SONG_ID, DEFAULT_TAGS, DEFAULT_TITLE};
pub use transcript::{transcript_span, TranscriptSegment};
