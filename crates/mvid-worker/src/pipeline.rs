//! Pipeline controller.
//!
//! One run walks `FETCH_AUDIO → TRANSCRIBE → SYNTHESIZE_STORYBOARD →
//! RENDER_SCENE* → ASSEMBLE → PERSIST` strictly in order. Scene failures
//! are skipped and counted in a [`SceneTally`]; the run aborts only when
//! fewer than [`MIN_SURVIVING_CLIPS`] scenes survive. Persistence is best
//! effort and never changes the returned media.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::Instrument;

use mvid_media::{assemble, reconcile, ClipEditor, MasterArtifact, ReconciledClip};
use mvid_models::{
    timestamp, GenerationRecord, Scene, SceneProvenance, SceneRecord, SongId, SongRequest, TranscriptSegment,
};

use crate::audio::{audio_path, AudioFetcher};
use crate::collaborators::{AssetStore, Collaborators, MetadataStore, Transcriber};
use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult, PipelineStage, SceneError};
use crate::logging::RunLogger;
use crate::renderer::SceneRenderer;
use crate::storyboard::{StoryboardOutcome, StoryboardSynthesizer};

/// Minimum reconciled clips required to assemble a master.
pub const MIN_SURVIVING_CLIPS: usize = 1;

/// Per-run scene accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneTally {
    /// Scenes in the storyboard
    pub planned: usize,
    /// Dropped for being shorter than the minimum scene length
    pub filtered: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl SceneTally {
    pub fn can_assemble(&self) -> bool {
        self.succeeded >= MIN_SURVIVING_CLIPS
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub master: MasterArtifact,
    /// Master file contents
    pub bytes: Vec<u8>,
    pub tally: SceneTally,
    /// Upload URLs by scene index
    pub provenance: BTreeMap<usize, SceneProvenance>,
    pub final_url: Option<String>,
    pub used_fallback_storyboard: bool,
}

/// Asset store key for the master video.
pub fn master_key(song_id: &SongId) -> String {
    format!("songs/{}/master.mp4", song_id.file_stem())
}

/// State accumulated during a run, kept for the failure record.
#[derive(Default)]
struct RunState {
    segments: Vec<TranscriptSegment>,
    scenes: Vec<Scene>,
    provenance: BTreeMap<usize, SceneProvenance>,
}

impl RunState {
    fn storyboard_records(&self) -> Vec<SceneRecord> {
        self.scenes
            .iter()
            .enumerate()
            .map(|(i, scene)| {
                SceneRecord::new(
                    scene.clone(),
                    self.provenance.get(&i).cloned().unwrap_or_default(),
                )
            })
            .collect()
    }
}

/// Drives one song through the whole pipeline.
pub struct PipelineController {
    config: WorkerConfig,
    audio: AudioFetcher,
    transcriber: Arc<dyn Transcriber>,
    storyboard: StoryboardSynthesizer,
    renderer: SceneRenderer,
    editor: Arc<dyn ClipEditor>,
    assets: Arc<dyn AssetStore>,
    metadata: Arc<dyn MetadataStore>,
}

impl PipelineController {
    pub fn new(
        config: WorkerConfig,
        collaborators: Collaborators,
        editor: Arc<dyn ClipEditor>,
    ) -> PipelineResult<Self> {
        let audio = AudioFetcher::new(config.audio_fetch_timeout).map_err(|e| {
            PipelineError::with_source(PipelineStage::FetchAudio, "could not build HTTP client", e)
        })?;
        let renderer = SceneRenderer::new(
            collaborators.images,
            collaborators.videos,
            collaborators.assets.clone(),
            editor.clone(),
        )
        .with_specs(config.image, config.video);

        Ok(Self {
            config,
            audio,
            transcriber: collaborators.transcriber,
            storyboard: StoryboardSynthesizer::new(collaborators.text),
            renderer,
            editor,
            assets: collaborators.assets,
            metadata: collaborators.metadata,
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run the pipeline for one song.
    pub async fn run(&self, request: &SongRequest) -> PipelineResult<RunOutput> {
        let logger = RunLogger::new(&request.song_id, "run");
        let span = logger.create_span();
        let started = Instant::now();

        let mut state = RunState::default();
        let result = self
            .run_stages(request, &logger, &mut state)
            .instrument(span.clone())
            .await;

        histogram!("mvid_pipeline_duration_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(output) => {
                counter!("mvid_pipeline_runs_total", "status" => "completed").increment(1);
                logger.log_completion(&format!(
                    "{} of {} scenes in master ({})",
                    output.tally.succeeded,
                    output.tally.planned,
                    timestamp::format_clock(output.master.video_duration)
                ));
            }
            Err(e) => {
                counter!("mvid_pipeline_runs_total", "status" => "failed").increment(1);
                logger.log_error(&e.to_string());
                if e.stage != PipelineStage::FetchAudio && e.stage != PipelineStage::Transcribe {
                    self.persist_failure(request, &state, e).instrument(span).await;
                }
            }
        }

        result
    }

    async fn run_stages(
        &self,
        request: &SongRequest,
        logger: &RunLogger,
        state: &mut RunState,
    ) -> PipelineResult<RunOutput> {
        let song_id = &request.song_id;
        let run_dir = self.config.work_dir.join(song_id.file_stem());
        tokio::fs::create_dir_all(&run_dir).await.map_err(|e| {
            PipelineError::with_source(PipelineStage::FetchAudio, "could not create work directory", e)
        })?;

        // FETCH_AUDIO
        let log = logger.for_stage(PipelineStage::FetchAudio.as_str());
        log.log_start(&request.audio_url);
        let audio_file = audio_path(&self.config.work_dir, song_id);
        let audio = self
            .audio
            .fetch(&request.audio_url, &audio_file)
            .await
            .map_err(|e| PipelineError::with_source(PipelineStage::FetchAudio, "could not fetch audio", e))?;

        // TRANSCRIBE
        let log = logger.for_stage(PipelineStage::Transcribe.as_str());
        log.log_start(&format!("{} bytes of audio", audio.len()));
        let segments = self
            .transcriber
            .transcribe(&audio)
            .await
            .map_err(|e| PipelineError::with_source(PipelineStage::Transcribe, "transcription failed", e))?;
        if segments.is_empty() {
            return Err(PipelineError::new(
                PipelineStage::Transcribe,
                "transcript is empty; cannot time scenes",
            ));
        }
        log.log_completion(&format!("{} segments", segments.len()));
        state.segments = segments;

        // SYNTHESIZE_STORYBOARD
        let log = logger.for_stage(PipelineStage::Storyboard.as_str());
        let outcome = self
            .storyboard
            .synthesize(&state.segments, &request.title, &request.tags)
            .await;
        let used_fallback = outcome.is_fallback();
        if let StoryboardOutcome::Fallback { reason, .. } = &outcome {
            counter!("mvid_storyboard_fallbacks_total", "reason" => reason.as_str()).increment(1);
            log.log_warning(&format!("using fallback storyboard ({})", reason));
        }
        state.scenes = outcome.into_scenes();
        if state.scenes.is_empty() {
            return Err(PipelineError::new(PipelineStage::Storyboard, "storyboard is empty"));
        }
        log.log_completion(&format!("{} scenes", state.scenes.len()));

        // RENDER_SCENE*
        let (clips, tally) = self.render_scenes(song_id, &run_dir, state, logger).await?;

        // ASSEMBLE
        let log = logger.for_stage(PipelineStage::Assemble.as_str());
        if !tally.can_assemble() {
            return Err(PipelineError::new(
                PipelineStage::Assemble,
                format!(
                    "no scene survived rendering ({} attempted, {} failed)",
                    tally.attempted, tally.failed
                ),
            ));
        }
        log.log_start(&format!("{} clips", clips.len()));
        let master_path = run_dir.join("master.mp4");
        let master = assemble(self.editor.as_ref(), &clips, &audio_file, &master_path)
            .await
            .map_err(|e| PipelineError::with_source(PipelineStage::Assemble, "timeline assembly failed", e))?;
        let bytes = tokio::fs::read(master.path())
            .await
            .map_err(|e| PipelineError::with_source(PipelineStage::Assemble, "could not read master", e))?;

        // PERSIST
        let final_url = self.persist_success(request, state, bytes.clone()).await;

        Ok(RunOutput {
            master,
            bytes,
            tally,
            provenance: std::mem::take(&mut state.provenance),
            final_url,
            used_fallback_storyboard: used_fallback,
        })
    }

    async fn render_scenes(
        &self,
        song_id: &SongId,
        run_dir: &Path,
        state: &mut RunState,
        logger: &RunLogger,
    ) -> PipelineResult<(Vec<ReconciledClip>, SceneTally)> {
        let log = logger.for_stage(PipelineStage::Render.as_str());
        let mut tally = SceneTally {
            planned: state.scenes.len(),
            ..Default::default()
        };
        let mut clips = Vec::new();

        for (index, scene) in state.scenes.iter().enumerate() {
            if !scene.is_renderable() {
                tally.filtered += 1;
                counter!("mvid_scenes_total", "outcome" => "filtered").increment(1);
                tracing::debug!(
                    scene_index = index,
                    duration = scene.required_duration(),
                    "Skipping scene below minimum length"
                );
                continue;
            }

            tally.attempted += 1;
            let scene_dir = scene_dir(run_dir, index);
            match self.render_one(song_id, index, scene, &scene_dir).await {
                Ok((clip, provenance)) => {
                    tally.succeeded += 1;
                    counter!("mvid_scenes_total", "outcome" => "succeeded").increment(1);
                    log.log_progress(&format!(
                        "scene {} of {} reconciled to {:.2}s",
                        index + 1,
                        tally.planned,
                        clip.duration
                    ));
                    if !provenance.is_empty() {
                        state.provenance.insert(index, provenance);
                    }
                    clips.push(clip);
                }
                Err(e) if e.is_run_fatal() => {
                    tally.failed += 1;
                    counter!("mvid_scenes_total", "outcome" => "failed").increment(1);
                    return Err(PipelineError::with_source(
                        PipelineStage::Render,
                        format!("scene {} produced an unusable clip", index),
                        e,
                    ));
                }
                Err(e) => {
                    tally.failed += 1;
                    counter!("mvid_scenes_total", "outcome" => "failed").increment(1);
                    log.log_warning(&format!("scene {} skipped: {}", index, e));
                }
            }
        }

        log.log_completion(&format!(
            "{} succeeded, {} failed, {} filtered",
            tally.succeeded, tally.failed, tally.filtered
        ));
        Ok((clips, tally))
    }

    async fn render_one(
        &self,
        song_id: &SongId,
        index: usize,
        scene: &Scene,
        scene_dir: &Path,
    ) -> Result<(ReconciledClip, SceneProvenance), SceneError> {
        let rendered = self.renderer.render(song_id, index, scene, scene_dir).await?;
        let clip = reconcile(
            self.editor.as_ref(),
            &rendered.clip,
            index,
            scene.required_duration(),
            &scene_dir.join("reconciled.mp4"),
        )
        .await?;
        Ok((clip, rendered.provenance))
    }

    async fn persist_success(
        &self,
        request: &SongRequest,
        state: &RunState,
        bytes: Vec<u8>,
    ) -> Option<String> {
        let final_url = match self
            .assets
            .upload(bytes, &master_key(&request.song_id), "video/mp4")
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(song_id = %request.song_id, error = %e, "Master upload failed");
                None
            }
        };

        let mut record = self.base_record(request, state);
        record.final_url = final_url.clone();
        self.write_record(&request.song_id, &record).await;
        final_url
    }

    async fn persist_failure(&self, request: &SongRequest, state: &RunState, error: &PipelineError) {
        let record = self.base_record(request, state).failed(error.to_string());
        self.write_record(&request.song_id, &record).await;
    }

    fn base_record(&self, request: &SongRequest, state: &RunState) -> GenerationRecord {
        let mut record =
            GenerationRecord::new(&request.title, &request.tags, &request.audio_url);
        record.segments = state.segments.clone();
        record.storyboard = state.storyboard_records();
        record
    }

    async fn write_record(&self, song_id: &SongId, record: &GenerationRecord) {
        match self.metadata.upsert(song_id, record).await {
            Ok(()) => tracing::info!(song_id = %song_id, status = %record.status, "Saved generation record"),
            Err(e) => tracing::warn!(song_id = %song_id, error = %e, "Failed to save generation record"),
        }
    }
}

fn scene_dir(run_dir: &Path, index: usize) -> PathBuf {
    run_dir.join(format!("scene_{:03}", index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{collaborators, FakeAssets, FakeMetadata, FakeSet, FakeVideos};
    use mvid_media::testing::{EditorCall, RecordingEditor};
    use mvid_models::{GenerationStatus, VideoSpec};
    use tempfile::TempDir;

    const SONG: &str = "night-drive";

    const THREE_SCENES: &str = r#"Sure! [
        {"start": 0, "end": 4, "visual_prompt": "rooftop", "motion_prompt": "pan one"},
        {"start": 4, "end": 9, "visual_prompt": "alley", "motion_prompt": "pan two"},
        {"start": 9, "end": 15, "visual_prompt": "highway", "motion_prompt": "pan three"}
    ] Enjoy."#;

    fn segments() -> Vec<TranscriptSegment> {
        vec![
            TranscriptSegment::new(0.0, 4.0, "neon rain"),
            TranscriptSegment::new(4.0, 9.0, "empty streets"),
            TranscriptSegment::new(9.0, 15.0, "we run"),
        ]
    }

    struct Harness {
        controller: PipelineController,
        editor: Arc<RecordingEditor>,
        fakes: FakeSet,
        request: SongRequest,
        _dir: TempDir,
    }

    /// Six-second native clips (48 frames at 8 fps) and a 15 s song whose
    /// audio is already cached.
    fn harness(
        segments: Vec<TranscriptSegment>,
        reply: &str,
        videos: FakeVideos,
        assets: FakeAssets,
        metadata: FakeMetadata,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkerConfig {
            work_dir: dir.path().to_path_buf(),
            video: VideoSpec {
                frame_count: 48,
                frame_rate: 8,
                ..Default::default()
            },
            ..Default::default()
        };
        let request = SongRequest::new(SONG, "Night Drive", "synthwave", "http://audio.invalid/song.mp3");

        let editor = Arc::new(RecordingEditor::new());
        editor.seed_audio(audio_path(dir.path(), &request.song_id), 15.0);

        let (collaborators, fakes) = collaborators(segments, reply, videos, assets, metadata);
        let controller = PipelineController::new(config, collaborators, editor.clone()).unwrap();

        Harness {
            controller,
            editor,
            fakes,
            request,
            _dir: dir,
        }
    }

    fn default_harness(reply: &str) -> Harness {
        harness(
            segments(),
            reply,
            FakeVideos::default(),
            FakeAssets::default(),
            FakeMetadata::default(),
        )
    }

    fn reconcile_calls(editor: &RecordingEditor) -> Vec<EditorCall> {
        editor
            .calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    EditorCall::Trim { .. } | EditorCall::LoopAndTrim { .. } | EditorCall::Copy { .. }
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_three_scenes_trim_trim_exact() {
        let h = default_harness(THREE_SCENES);
        let output = h.controller.run(&h.request).await.unwrap();

        let calls = reconcile_calls(&h.editor);
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], EditorCall::Trim { duration, .. } if duration == 4.0));
        assert!(matches!(calls[1], EditorCall::Trim { duration, .. } if duration == 5.0));
        assert!(matches!(calls[2], EditorCall::Copy { .. }));

        assert_eq!(output.master.clip_count, 3);
        assert!((output.master.video_duration - 15.0).abs() < 1e-9);
        assert_eq!(
            output.tally,
            SceneTally {
                planned: 3,
                filtered: 0,
                attempted: 3,
                succeeded: 3,
                failed: 0
            }
        );
        assert!(!output.bytes.is_empty());
        assert!(!output.used_fallback_storyboard);

        let concat = h
            .editor
            .calls()
            .into_iter()
            .find_map(|c| match c {
                EditorCall::Concat { audio, .. } => Some(audio),
                _ => None,
            })
            .unwrap();
        assert_eq!(concat, audio_path(&h.controller.config().work_dir, &h.request.song_id));
    }

    #[tokio::test]
    async fn test_long_scene_loops_and_trims() {
        let reply = r#"[{"start": 0, "end": 14, "visual_prompt": "desert", "motion_prompt": "drift"}]"#;
        let h = default_harness(reply);
        let output = h.controller.run(&h.request).await.unwrap();

        let calls = reconcile_calls(&h.editor);
        assert!(matches!(
            calls[0],
            EditorCall::LoopAndTrim { repeats: 3, duration, .. } if duration == 14.0
        ));
        assert!((output.master.video_duration - 14.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_scene_is_skipped_in_order() {
        let videos = FakeVideos {
            fail_on: ["pan two".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let h = harness(
            segments(),
            THREE_SCENES,
            videos,
            FakeAssets::default(),
            FakeMetadata::default(),
        );
        let output = h.controller.run(&h.request).await.unwrap();

        assert_eq!(output.master.clip_count, 2);
        assert_eq!(output.tally.failed, 1);
        assert_eq!(output.tally.succeeded, 2);
        assert!((output.master.video_duration - 10.0).abs() < 1e-9);

        let clips = h
            .editor
            .calls()
            .into_iter()
            .find_map(|c| match c {
                EditorCall::Concat { clips, .. } => Some(clips),
                _ => None,
            })
            .unwrap();
        assert_eq!(clips.len(), 2);
        assert!(clips[0].to_string_lossy().contains("scene_000"));
        assert!(clips[1].to_string_lossy().contains("scene_002"));
    }

    #[tokio::test]
    async fn test_short_scenes_never_reach_renderer() {
        let reply = r#"[
            {"start": 0, "end": 1.5, "visual_prompt": "flash"},
            {"start": 1.5, "end": 8, "visual_prompt": "city"},
            {"start": 8, "end": 7, "visual_prompt": "inverted"}
        ]"#;
        let h = default_harness(reply);
        let output = h.controller.run(&h.request).await.unwrap();

        assert_eq!(h.fakes.images.prompts(), vec!["city".to_string()]);
        assert_eq!(output.tally.filtered, 2);
        assert_eq!(output.tally.attempted, 1);
    }

    #[tokio::test]
    async fn test_fallback_storyboard_spans_song() {
        let h = default_harness("I cannot do that.");
        let output = h.controller.run(&h.request).await.unwrap();

        assert!(output.used_fallback_storyboard);
        assert_eq!(
            h.fakes.images.prompts(),
            vec!["Abstract art representing Night Drive".to_string()]
        );
        assert!((output.master.video_duration - 15.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_transcript_is_fatal() {
        let h = harness(
            Vec::new(),
            THREE_SCENES,
            FakeVideos::default(),
            FakeAssets::default(),
            FakeMetadata::default(),
        );
        let err = h.controller.run(&h.request).await.unwrap_err();

        assert_eq!(err.stage, PipelineStage::Transcribe);
        assert!(h.fakes.images.prompts().is_empty());
        assert!(h.fakes.metadata.records().is_empty());
    }

    #[tokio::test]
    async fn test_empty_storyboard_is_fatal_and_recorded() {
        let h = default_harness("Here: []");
        let err = h.controller.run(&h.request).await.unwrap_err();

        assert_eq!(err.stage, PipelineStage::Storyboard);
        let records = h.fakes.metadata.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0.as_str(), SONG);
        assert_eq!(records[0].1.status, GenerationStatus::Failed);
        assert_eq!(records[0].1.segments.len(), 3);
    }

    #[tokio::test]
    async fn test_all_scenes_failing_aborts_at_assemble() {
        let videos = FakeVideos {
            fail_on: ["pan one", "pan two", "pan three"]
                .into_iter()
                .map(String::from)
                .collect(),
            ..Default::default()
        };
        let h = harness(
            segments(),
            THREE_SCENES,
            videos,
            FakeAssets::default(),
            FakeMetadata::default(),
        );
        let err = h.controller.run(&h.request).await.unwrap_err();

        assert_eq!(err.stage, PipelineStage::Assemble);
        assert!(!h
            .editor
            .calls()
            .iter()
            .any(|c| matches!(c, EditorCall::Concat { .. })));
        assert_eq!(h.fakes.metadata.records()[0].1.status, GenerationStatus::Failed);
    }

    #[tokio::test]
    async fn test_zero_length_clip_aborts_run() {
        let videos = FakeVideos {
            frames_override: Some(0),
            ..Default::default()
        };
        let h = harness(
            segments(),
            THREE_SCENES,
            videos,
            FakeAssets::default(),
            FakeMetadata::default(),
        );
        let err = h.controller.run(&h.request).await.unwrap_err();

        assert_eq!(err.stage, PipelineStage::Render);
        assert_eq!(h.fakes.images.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failures_do_not_change_output() {
        let h = harness(
            segments(),
            THREE_SCENES,
            FakeVideos::default(),
            FakeAssets::failing(),
            FakeMetadata {
                fail: true,
                ..Default::default()
            },
        );
        let output = h.controller.run(&h.request).await.unwrap();

        assert_eq!(output.master.clip_count, 3);
        assert!(output.final_url.is_none());
        assert!(output.provenance.is_empty());
        assert_eq!(h.fakes.metadata.records().len(), 1);
    }

    #[tokio::test]
    async fn test_success_record_carries_provenance() {
        let h = default_harness(THREE_SCENES);
        let output = h.controller.run(&h.request).await.unwrap();

        assert_eq!(
            output.final_url.as_deref(),
            Some("https://cdn.test/songs/night-drive/master.mp4")
        );
        assert_eq!(
            output.provenance[&1].image_url.as_deref(),
            Some("https://cdn.test/songs/night-drive/scenes/1/still.png")
        );

        let keys = h.fakes.assets.keys();
        assert!(keys.contains(&"songs/night-drive/scenes/2/raw.mp4".to_string()));

        let records = h.fakes.metadata.records();
        assert_eq!(records.len(), 1);
        let record = &records[0].1;
        assert_eq!(record.status, GenerationStatus::Completed);
        assert_eq!(record.storyboard.len(), 3);
        assert_eq!(record.storyboard[0].scene.visual_prompt, "rooftop");
        assert!(record.storyboard[2].provenance.video_url.is_some());
        assert_eq!(record.final_url, output.final_url);
    }

    #[test]
    fn test_master_key_per_song() {
        assert_eq!(master_key(&SongId::from("night-drive")), "songs/night-drive/master.mp4");
        assert_ne!(
            master_key(&SongId::from("my song")),
            master_key(&SongId::from("my_song"))
        );
    }
}
