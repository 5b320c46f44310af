//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use mvid_worker::PipelineError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) | ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<String>,
}

/// The chain of underlying errors below `err`, outermost first.
fn cause_chain(err: &dyn std::error::Error) -> Option<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    if causes.is_empty() {
        None
    } else {
        Some(causes.join(": "))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let cause = cause_chain(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, cause = ?cause, "Request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            cause,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use mvid_worker::PipelineStage;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_pipeline_error_carries_cause() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "dns lookup failed for cdn.test");
        let err = ApiError::from(PipelineError::with_source(
            PipelineStage::FetchAudio,
            "could not fetch audio",
            source,
        ));

        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "fetch_audio failed: could not fetch audio");
        assert_eq!(body["cause"], "dns lookup failed for cdn.test");
    }

    #[tokio::test]
    async fn test_bad_request_has_no_cause() {
        let (status, body) = body_json(ApiError::bad_request("audio_url is required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("cause").is_none());
    }
}
