//! Model service HTTP client.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use mvid_models::{Frame, ImageSpec, StillImage, TranscriptSegment, VideoSpec};

use crate::config::MlServicesConfig;
use crate::error::{MlError, MlResult};
use crate::types::{
    GenerateRequest, GenerateResponse, HealthResponse, ImageRequest, ImageResponse,
    TranscribeResponse, VideoRequest, VideoResponse,
};

/// Client for the model services.
#[derive(Clone)]
pub struct MlClient {
    http: Client,
    config: MlServicesConfig,
}

impl MlClient {
    /// Create a new ML client.
    pub fn new(config: MlServicesConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(MlServicesConfig::from_env())
    }

    pub fn config(&self) -> &MlServicesConfig {
        &self.config
    }

    /// Check if a service is healthy.
    pub async fn health_check(&self, base_url: &str) -> MlResult<bool> {
        let url = format!("{}/health", base_url);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("ML service health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("ML service health check error: {}", e);
                Ok(false)
            }
        }
    }

    /// Transcribe audio into timed segments.
    pub async fn transcribe(&self, audio: &[u8]) -> MlResult<Vec<TranscriptSegment>> {
        let url = format!("{}/transcribe", self.config.transcribe_url);
        debug!(bytes = audio.len(), "Sending transcription request to {}", url);

        let http = &self.http;
        let url = url.as_str();
        let response = self
            .with_retry(move || async move {
                let part = Part::bytes(audio.to_vec())
                    .file_name("audio.mp3")
                    .mime_str("audio/mpeg")
                    .map_err(MlError::Network)?;
                let form = Form::new().part("audio", part);
                let response = http.post(url).multipart(form).send().await?;
                Self::decode::<TranscribeResponse>(response).await
            })
            .await?;

        info!(segments = response.segments.len(), "Transcription finished");
        Ok(response.segments)
    }

    /// Generate text from a system and user instruction.
    pub async fn generate(&self, system: &str, prompt: &str) -> MlResult<String> {
        let url = format!("{}/generate", self.config.text_url);
        let request = GenerateRequest {
            system: system.to_string(),
            prompt: prompt.to_string(),
            max_new_tokens: self.config.text.max_new_tokens,
            temperature: self.config.text.temperature,
        };

        let response: GenerateResponse = self.post_json(&url, &request).await?;
        Ok(response.text)
    }

    /// Synthesize a still image from a prompt.
    pub async fn synthesize_image(&self, prompt: &str, spec: ImageSpec) -> MlResult<StillImage> {
        let url = format!("{}/image", self.config.image_url);
        let request = ImageRequest {
            prompt: prompt.to_string(),
            width: spec.width,
            height: spec.height,
            num_inference_steps: spec.steps,
            guidance_scale: spec.guidance,
        };

        let response: ImageResponse = self.post_json(&url, &request).await?;
        let png = decode_base64(&response.image, "image")?;
        if png.is_empty() {
            return Err(MlError::invalid_response("image service returned an empty image"));
        }

        Ok(StillImage {
            png,
            width: response.width.unwrap_or(spec.width),
            height: response.height.unwrap_or(spec.height),
        })
    }

    /// Synthesize video frames from a prompt and conditioning image.
    pub async fn synthesize_video(
        &self,
        prompt: &str,
        image: &StillImage,
        spec: VideoSpec,
    ) -> MlResult<Vec<Frame>> {
        let url = format!("{}/video", self.config.video_url);
        let request = VideoRequest {
            prompt: prompt.to_string(),
            image: STANDARD.encode(&image.png),
            num_frames: spec.frame_count,
            fps: spec.frame_rate,
            num_inference_steps: spec.steps,
            guidance_scale: spec.guidance,
        };

        let response: VideoResponse = self.post_json(&url, &request).await?;
        let frames = response
            .frames
            .iter()
            .enumerate()
            .map(|(i, f)| decode_base64(f, &format!("frame {}", i)).map(Frame))
            .collect::<MlResult<Vec<_>>>()?;

        if frames.len() as u32 != spec.frame_count {
            warn!(
                expected = spec.frame_count,
                received = frames.len(),
                "Video service returned an unexpected frame count"
            );
        }
        Ok(frames)
    }

    async fn post_json<Req, Resp>(&self, url: &str, request: &Req) -> MlResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        debug!("Sending model request to {}", url);
        let http = &self.http;
        self.with_retry(move || async move {
            let response = http.post(url).json(request).send().await?;
            Self::decode(response).await
        })
        .await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> MlResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MlError::from_status(status.as_u16(), &body));
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(MlError::Json)
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> MlResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = MlResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "ML request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(MlError::RequestFailed("Unknown error".to_string())))
    }
}

fn decode_base64(data: &str, what: &str) -> MlResult<Vec<u8>> {
    // Some servers send data URLs
    let payload = data
        .split_once("base64,")
        .map(|(_, rest)| rest)
        .unwrap_or(data);
    STANDARD
        .decode(payload.trim())
        .map_err(|e| MlError::invalid_response(format!("{} is not valid base64: {}", what, e)))
}
