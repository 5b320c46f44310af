//! Timed transcript segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One timed piece of recognized text.
///
/// Produced by the speech-to-text collaborator. `end > start` is usual but
/// not guaranteed, so consumers must tolerate inverted or NaN bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Recognized text
    #[serde(default)]
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Largest finite, positive segment end, if any.
///
/// This is the best available estimate of the song's duration.
pub fn transcript_span(segments: &[TranscriptSegment]) -> Option<f64> {
    segments
        .iter()
        .map(|s| s.end)
        .filter(|e| e.is_finite() && *e > 0.0)
        .fold(None, |acc: Option<f64>, e| Some(acc.map_or(e, |a| a.max(e))))
}
