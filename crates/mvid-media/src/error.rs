//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    /// The synthesized clip has no usable length.
    #[error("Clip has zero length: {0}")]
    ZeroLengthClip(String),

    #[error("Invalid target duration: {0}")]
    InvalidDuration(f64),

    /// Assembly was asked to build a master from no clips.
    #[error("Timeline has no clips to assemble")]
    EmptyTimeline,

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a zero-length clip error.
    pub fn zero_length(detail: impl Into<String>) -> Self {
        Self::ZeroLengthClip(detail.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error dooms every later clip in the same run too.
    ///
    /// Native clip length is fixed per run, so only a zero-length clip
    /// qualifies. Everything else skips the scene and leaves the surviving
    /// clip count to decide the run at assembly.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, MediaError::ZeroLengthClip(_))
    }
}
