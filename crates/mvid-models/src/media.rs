//! In-memory media payloads exchanged with the synthesis services.

use serde::{Deserialize, Serialize};

/// A single generated still image, PNG encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StillImage {
    #[serde(with = "base64_bytes")]
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// One video frame, PNG encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame(#[serde(with = "base64_bytes")] pub Vec<u8>);

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Image synthesis settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance: f32,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            width: 1360,
            height: 768,
            steps: 25,
            guidance: 3.5,
        }
    }
}

/// Image-to-video synthesis settings.
///
/// Every clip produced with one spec has the same native length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoSpec {
    pub frame_count: u32,
    pub frame_rate: u32,
    pub steps: u32,
    pub guidance: f32,
}

impl VideoSpec {
    /// Native clip length in seconds, `0.0` when the frame rate is zero.
    pub fn native_duration(&self) -> f64 {
        if self.frame_rate == 0 {
            0.0
        } else {
            self.frame_count as f64 / self.frame_rate as f64
        }
    }
}

impl Default for VideoSpec {
    fn default() -> Self {
        Self {
            frame_count: 49,
            frame_rate: 8,
            steps: 50,
            guidance: 6.0,
        }
    }
}

/// Serde adapter for standard base64 byte payloads.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }
}
