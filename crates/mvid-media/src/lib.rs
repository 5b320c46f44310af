//! FFmpeg CLI wrapper for the music video pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - Frame-sequence encoding into raw clips
//! - Duration reconciliation (trim or loop-and-trim)
//! - Timeline assembly with the original audio track

pub mod clip;
pub mod command;
pub mod editor;
pub mod error;
pub mod probe;
pub mod progress;
pub mod reconcile;
pub mod timeline;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use clip::{
    MasterArtifact, MasterEncoding, RawClip, ReconciledClip, TimelineGeometry, DURATION_EPSILON,
};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use editor::{compose_concat_filter, ClipEditor, FfmpegEditor};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use reconcile::{plan_reconciliation, reconcile, ReconcilePlan, MAX_LOOP_REPEATS};
pub use timeline::assemble;
