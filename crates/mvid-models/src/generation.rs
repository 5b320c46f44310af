//! Persisted generation records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scene::SceneRecord;
use crate::transcript::TranscriptSegment;

/// Outcome of a pipeline run as stored in the metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Master video produced
    #[default]
    Completed,
    /// Run aborted on a fatal error
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata for one song, upserted by song id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationRecord {
    pub title: String,
    pub tags: String,
    pub audio_url: String,

    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,

    #[serde(default)]
    pub storyboard: Vec<SceneRecord>,

    /// Public URL of the master video, when the upload succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,

    pub status: GenerationStatus,

    /// Failure reason for failed runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub updated_at: DateTime<Utc>,
}

impl GenerationRecord {
    /// Start a completed record with no storyboard yet.
    pub fn new(title: impl Into<String>, tags: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tags: tags.into(),
            audio_url: audio_url.into(),
            segments: Vec::new(),
            storyboard: Vec::new(),
            final_url: None,
            status: GenerationStatus::Completed,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Mark the record failed with a reason.
    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        self.status = GenerationStatus::Failed;
        self.error = Some(reason.into());
        self
    }
}
