//! Song identity and inbound request models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use validator::Validate;

/// Song identifier used when the caller does not provide one.
pub const DEFAULT_SONG_ID: &str = "suno_video";

/// Title used when the caller does not provide one.
pub const DEFAULT_TITLE: &str = "Unknown Song";

/// Tags used when the caller does not provide any.
pub const DEFAULT_TAGS: &str = "Music";

/// Hex digits of the id digest appended to non-clean stems.
const STEM_HASH_LEN: usize = 16;

/// Caller-supplied unique identifier for a song.
///
/// Keys both the local audio cache and the persisted generation record,
/// so re-running the same song overwrites rather than duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SongId(pub String);

impl SongId {
    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem- and key-safe form of the identifier.
    ///
    /// Ids made only of `[A-Za-z0-9_-]` are used as-is. Anything else has
    /// the offending characters replaced by `_` and gains a `.{hash}`
    /// suffix from a SHA-256 of the raw id, so two distinct ids never share
    /// a cache path, run directory or asset key. Clean stems never contain
    /// `.`, which keeps the two forms apart.
    pub fn file_stem(&self) -> String {
        let is_clean = !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if is_clean {
            return self.0.clone();
        }

        let sanitized: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let digest = format!("{:x}", Sha256::digest(self.0.as_bytes()));
        format!("{}.{}", sanitized, &digest[..STEM_HASH_LEN])
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SongId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SongId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A request to turn one song into a music video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct SongRequest {
    /// Unique song identifier
    pub song_id: SongId,

    /// Song title, used in the storyboard prompt and fallback scene
    #[validate(length(min = 1))]
    pub title: String,

    /// Genre/style tags
    #[serde(default)]
    pub tags: String,

    /// Where to fetch the audio from
    #[validate(url)]
    pub audio_url: String,
}

impl SongRequest {
    /// Create a request, normalizing blank fields to their defaults.
    pub fn new(
        song_id: impl Into<String>,
        title: impl Into<String>,
        tags: impl Into<String>,
        audio_url: impl Into<String>,
    ) -> Self {
        let song_id = non_blank(song_id.into(), DEFAULT_SONG_ID);
        Self {
            song_id: SongId(song_id),
            title: non_blank(title.into(), DEFAULT_TITLE),
            tags: non_blank(tags.into(), DEFAULT_TAGS),
            audio_url: audio_url.into().trim().to_string(),
        }
    }
}

fn non_blank(value: String, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}
