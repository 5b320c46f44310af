//! Repository for generation records, keyed by song id.

use std::collections::HashMap;

use chrono::Utc;
use metrics::counter;
use tracing::info;

use mvid_models::{
    GenerationRecord, GenerationStatus, Scene, SceneProvenance, SceneRecord, SongId,
    TranscriptSegment,
};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, FromFirestoreValue, ToFirestoreValue, Value};

/// Default collection for generation records.
pub const GENERATIONS_COLLECTION: &str = "generations";

/// Repository for generation documents.
#[derive(Clone)]
pub struct GenerationRepository {
    client: FirestoreClient,
    collection: String,
}

impl GenerationRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self::with_collection(client, GENERATIONS_COLLECTION)
    }

    pub fn with_collection(client: FirestoreClient, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }

    /// Write the record for `song_id`, replacing any earlier one.
    pub async fn upsert(&self, song_id: &SongId, record: &GenerationRecord) -> FirestoreResult<()> {
        let fields = record_to_fields(record);
        self.client
            .upsert_document(&self.collection, song_id.as_str(), fields)
            .await?;

        counter!("mvid_generation_records_written_total", "status" => record.status.as_str())
            .increment(1);
        info!(song_id = %song_id, status = %record.status, "Upserted generation record");
        Ok(())
    }

    /// Fetch the record for `song_id`.
    pub async fn get(&self, song_id: &SongId) -> FirestoreResult<Option<GenerationRecord>> {
        match self.client.get_document(&self.collection, song_id.as_str()).await? {
            Some(doc) => document_to_record(&doc).map(Some),
            None => Ok(None),
        }
    }
}

impl ToFirestoreValue for TranscriptSegment {
    fn to_firestore_value(&self) -> Value {
        let mut fields = HashMap::new();
        fields.insert("start".to_string(), self.start.to_firestore_value());
        fields.insert("end".to_string(), self.end.to_firestore_value());
        fields.insert("text".to_string(), self.text.to_firestore_value());
        Value::map(fields)
    }
}

impl FromFirestoreValue for TranscriptSegment {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        let fields = value.as_map()?;
        Some(TranscriptSegment {
            start: fields.get("start").and_then(f64::from_firestore_value)?,
            end: fields.get("end").and_then(f64::from_firestore_value)?,
            text: fields
                .get("text")
                .and_then(String::from_firestore_value)
                .unwrap_or_default(),
        })
    }
}

impl ToFirestoreValue for SceneRecord {
    fn to_firestore_value(&self) -> Value {
        let mut fields = HashMap::new();
        fields.insert("start".to_string(), self.scene.start.to_firestore_value());
        fields.insert("end".to_string(), self.scene.end.to_firestore_value());
        fields.insert(
            "visual_prompt".to_string(),
            self.scene.visual_prompt.to_firestore_value(),
        );
        fields.insert(
            "motion_prompt".to_string(),
            self.scene.motion_prompt.to_firestore_value(),
        );
        fields.insert(
            "image_url".to_string(),
            self.provenance.image_url.to_firestore_value(),
        );
        fields.insert(
            "video_url".to_string(),
            self.provenance.video_url.to_firestore_value(),
        );
        Value::map(fields)
    }
}

impl FromFirestoreValue for SceneRecord {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        let fields = value.as_map()?;
        let text = |key: &str| fields.get(key).and_then(String::from_firestore_value);
        Some(SceneRecord {
            scene: Scene {
                start: fields.get("start").and_then(f64::from_firestore_value)?,
                end: fields.get("end").and_then(f64::from_firestore_value)?,
                visual_prompt: text("visual_prompt")?,
                motion_prompt: text("motion_prompt").unwrap_or_default(),
            },
            provenance: SceneProvenance {
                image_url: text("image_url"),
                video_url: text("video_url"),
            },
        })
    }
}

fn record_to_fields(record: &GenerationRecord) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("title".to_string(), record.title.to_firestore_value());
    fields.insert("tags".to_string(), record.tags.to_firestore_value());
    fields.insert("audio_url".to_string(), record.audio_url.to_firestore_value());
    fields.insert("segments".to_string(), record.segments.to_firestore_value());
    fields.insert("storyboard".to_string(), record.storyboard.to_firestore_value());
    fields.insert("final_url".to_string(), record.final_url.to_firestore_value());
    fields.insert("status".to_string(), record.status.as_str().to_firestore_value());
    fields.insert("error".to_string(), record.error.to_firestore_value());
    fields.insert("updated_at".to_string(), record.updated_at.to_firestore_value());
    fields
}

fn document_to_record(doc: &Document) -> FirestoreResult<GenerationRecord> {
    let status = match doc.get::<String>("status").as_deref() {
        Some("completed") => GenerationStatus::Completed,
        Some("failed") => GenerationStatus::Failed,
        other => {
            return Err(FirestoreError::invalid_response(format!(
                "unknown generation status {:?}",
                other
            )))
        }
    };

    Ok(GenerationRecord {
        title: doc.get("title").unwrap_or_default(),
        tags: doc.get("tags").unwrap_or_default(),
        audio_url: doc.get("audio_url").unwrap_or_default(),
        segments: doc.get("segments").unwrap_or_default(),
        storyboard: doc.get("storyboard").unwrap_or_default(),
        final_url: doc.get("final_url"),
        status,
        error: doc.get("error"),
        updated_at: doc.get("updated_at").unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FirestoreConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

    /// Matches requests without any query string.
    struct NoUpdateMask;

    impl Match for NoUpdateMask {
        fn matches(&self, request: &Request) -> bool {
            request.url.query().is_none()
        }
    }

    const DOC_PATH: &str = "/v1/projects/test-project/databases/(default)/documents/generations/song-1";

    fn sample_record() -> GenerationRecord {
        let mut record = GenerationRecord::new("Neon Rain", "synthwave", "https://cdn.example.com/a.mp3");
        record.segments = vec![TranscriptSegment::new(0.0, 4.0, "hello")];
        record.storyboard = vec![SceneRecord::new(
            Scene::new(0.0, 4.0, "rain on neon", "Slow dolly in"),
            SceneProvenance {
                image_url: Some("https://cdn.example.com/s0.png".into()),
                video_url: None,
            },
        )];
        record.final_url = Some("https://cdn.example.com/master.mp4".into());
        record
    }

    async fn repo(server: &MockServer) -> GenerationRepository {
        let mut config = FirestoreConfig::emulator("test-project", format!("{}/v1", server.uri()));
        config.retry.base_delay_ms = 1;
        config.retry.max_delay_ms = 2;
        GenerationRepository::new(FirestoreClient::new(config).await.unwrap())
    }

    #[tokio::test]
    async fn test_upsert_patches_without_mask() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(DOC_PATH))
            .and(NoUpdateMask)
            .and(body_partial_json(serde_json::json!({
                "fields": {
                    "title": {"stringValue": "Neon Rain"},
                    "status": {"stringValue": "completed"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "projects/test-project/databases/(default)/documents/generations/song-1",
                "fields": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        repo(&server)
            .await
            .upsert(&SongId::from("song-1"), &sample_record())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_retries_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(DOC_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(DOC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"fields": {}})))
            .mount(&server)
            .await;

        let result = repo(&server)
            .await
            .upsert(&SongId::from("song-1"), &sample_record())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_upsert_surfaces_permission_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(DOC_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .expect(1)
            .mount(&server)
            .await;

        let err = repo(&server)
            .await
            .upsert(&SongId::from("song-1"), &sample_record())
            .await
            .unwrap_err();
        assert!(matches!(err, FirestoreError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DOC_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let found = repo(&server).await.get(&SongId::from("song-1")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_get_decodes_written_fields() {
        let record = sample_record();
        let doc = Document::new(record_to_fields(&record));

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DOC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(&doc))
            .mount(&server)
            .await;

        let found = repo(&server)
            .await
            .get(&SongId::from("song-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Neon Rain");
        assert_eq!(found.segments, record.segments);
        assert_eq!(found.storyboard, record.storyboard);
        assert_eq!(found.final_url, record.final_url);
        assert_eq!(found.status, GenerationStatus::Completed);
        assert_eq!(found.error, None);
    }
}
