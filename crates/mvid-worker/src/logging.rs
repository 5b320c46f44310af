//! Structured run logging.

use tracing::{error, info, warn, Span};

use mvid_models::SongId;

/// Logs pipeline lifecycle events with the song id and current stage.
#[derive(Debug, Clone)]
pub struct RunLogger {
    song_id: String,
    stage: String,
}

impl RunLogger {
    pub fn new(song_id: &SongId, stage: &str) -> Self {
        Self {
            song_id: song_id.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Same song, different stage.
    pub fn for_stage(&self, stage: &str) -> Self {
        Self {
            song_id: self.song_id.clone(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(song_id = %self.song_id, stage = %self.stage, "Stage started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(song_id = %self.song_id, stage = %self.stage, "Stage progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(song_id = %self.song_id, stage = %self.stage, "Stage warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(song_id = %self.song_id, stage = %self.stage, "Stage error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(song_id = %self.song_id, stage = %self.stage, "Stage completed: {}", message);
    }

    pub fn song_id(&self) -> &str {
        &self.song_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Span covering a whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("pipeline_run", song_id = %self.song_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_stage_keeps_song() {
        let logger = RunLogger::new(&SongId::from("track-7"), "fetch_audio");
        let next = logger.for_stage("transcribe");

        assert_eq!(next.song_id(), "track-7");
        assert_eq!(next.stage(), "transcribe");
        assert_eq!(logger.stage(), "fetch_audio");
    }
}
