//! Fetch-once audio cache keyed by song id.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};

use mvid_models::SongId;

use crate::error::AudioError;

/// Local path of the cached audio for `song_id`.
pub fn audio_path(work_dir: &Path, song_id: &SongId) -> PathBuf {
    work_dir.join(format!("{}.mp3", song_id.file_stem()))
}

/// Downloads song audio into the work directory, reusing earlier downloads.
#[derive(Debug, Clone)]
pub struct AudioFetcher {
    http: Client,
}

impl AudioFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AudioError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Make sure the audio exists at `dest` and return its bytes.
    ///
    /// A non-empty file already at `dest` is reused as-is. Otherwise the
    /// download goes to a sibling `.part` file that is renamed into place.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<Vec<u8>, AudioError> {
        if let Ok(meta) = tokio::fs::metadata(dest).await {
            if meta.is_file() && meta.len() > 0 {
                info!(path = %dest.display(), bytes = meta.len(), "Reusing cached audio");
                return Ok(tokio::fs::read(dest).await?);
            }
        }

        debug!(url, "Downloading audio");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AudioError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(AudioError::Empty);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = dest.with_extension("mp3.part");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, dest).await?;

        info!(path = %dest.display(), bytes = bytes.len(), "Downloaded audio");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> AudioFetcher {
        AudioFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_audio_path_is_sanitized() {
        let clean = audio_path(Path::new("/tmp/assets"), &SongId::from("track-7"));
        assert_eq!(clean, PathBuf::from("/tmp/assets/track-7.mp3"));

        let hostile = audio_path(Path::new("/tmp/assets"), &SongId::from("../evil id"));
        assert_eq!(hostile.parent(), Some(Path::new("/tmp/assets")));
        assert!(hostile
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("___evil_id.")));
    }

    #[tokio::test]
    async fn test_similar_song_ids_get_their_own_audio() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/one.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"SONG-ONE".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/two.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"SONG-TWO".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let spaced = audio_path(dir.path(), &SongId::from("my song"));
        let underscored = audio_path(dir.path(), &SongId::from("my_song"));
        assert_ne!(spaced, underscored);

        let first = fetcher()
            .fetch(&format!("{}/one.mp3", server.uri()), &spaced)
            .await
            .unwrap();
        let second = fetcher()
            .fetch(&format!("{}/two.mp3", server.uri()), &underscored)
            .await
            .unwrap();

        assert_eq!(first, b"SONG-ONE");
        assert_eq!(second, b"SONG-TWO");
    }

    #[tokio::test]
    async fn test_fetch_downloads_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/song.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("track.mp3");
        let url = format!("{}/song.mp3", server.uri());

        let first = fetcher().fetch(&url, &dest).await.unwrap();
        let second = fetcher().fetch(&url, &dest).await.unwrap();

        assert_eq!(first, b"ID3audio");
        assert_eq!(second, first);
        assert!(!dest.with_extension("mp3.part").exists());
    }

    #[tokio::test]
    async fn test_fetch_refetches_empty_cache_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("track.mp3");
        std::fs::write(&dest, b"").unwrap();

        let bytes = fetcher().fetch(&server.uri(), &dest).await.unwrap();
        assert_eq!(bytes, b"fresh");
    }

    #[tokio::test]
    async fn test_fetch_error_status_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("track.mp3");
        let err = fetcher().fetch(&server.uri(), &dest).await.unwrap_err();

        assert!(matches!(err, AudioError::Status { status: 404, .. }));
        assert!(!dest.exists());
    }
}
