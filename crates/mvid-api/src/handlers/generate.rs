//! Webhook that runs the pipeline and returns the video.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use tracing::info;
use validator::Validate;

use mvid_models::{SongRequest, DEFAULT_SONG_ID, DEFAULT_TAGS, DEFAULT_TITLE};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Peel up to two levels of `{"data": {...}}` wrapping.
pub fn unwrap_payload(payload: &Value) -> &Value {
    let mut current = payload;
    for _ in 0..2 {
        match current.get("data") {
            Some(inner) if inner.is_object() => current = inner,
            _ => break,
        }
    }
    current
}

/// Read the song request out of a webhook body.
pub fn song_request_from_payload(payload: &Value) -> ApiResult<SongRequest> {
    let fields = match unwrap_payload(payload) {
        Value::Object(map) => map,
        _ => return Err(ApiError::bad_request("request body must be a JSON object")),
    };

    let audio_url = text_field(fields, &["audio_url"])
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("audio_url is required"))?;

    let request = SongRequest::new(
        text_field(fields, &["song_id", "id"]).unwrap_or_else(|| DEFAULT_SONG_ID.to_string()),
        text_field(fields, &["title"]).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        text_field(fields, &["tags"]).unwrap_or_else(|| DEFAULT_TAGS.to_string()),
        audio_url,
    );
    request
        .validate()
        .map_err(|e| ApiError::bad_request(format!("invalid request: {}", e)))?;
    Ok(request)
}

/// First of `keys` present as a string or number.
fn text_field(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match fields.get(*key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `POST /generate`: run the pipeline and stream back the master mp4.
pub async fn generate(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let payload: Value = if body.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid JSON body: {}", e)))?
    };
    let request = song_request_from_payload(&payload)?;

    info!(
        song_id = %request.song_id,
        title = %request.title,
        "Received generation request"
    );

    let _permit = state
        .runs
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| ApiError::internal("pipeline is shutting down"))?;

    let output = state.pipeline.run(&request).await?;

    let disposition = format!("attachment; filename=\"{}.mp4\"", request.song_id.file_stem());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.bytes,
    )
        .into_response())
}
