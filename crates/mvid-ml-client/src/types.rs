//! Model service request/response types.

use serde::{Deserialize, Serialize};

use mvid_models::TranscriptSegment;

/// Response from `/transcribe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeResponse {
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

/// Request for `/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub system: String,
    pub prompt: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
}

/// Response from `/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
}

/// Request for `/image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
}

/// Response from `/image`, PNG as base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    pub image: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Request for `/video`, conditioning image as base64 PNG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRequest {
    pub prompt: String,
    pub image: String,
    pub num_frames: u32,
    pub fps: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
}

/// Response from `/video`, one base64 PNG per frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoResponse {
    #[serde(default)]
    pub frames: Vec<String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}
