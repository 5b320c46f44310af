//! In-memory [`ClipEditor`] for tests.
//!
//! Tracks the duration of every file it "produces" and records each call,
//! without invoking ffmpeg. Files are still written to disk with a small
//! placeholder payload so callers can read them back.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mvid_models::Frame;

use crate::clip::RawClip;
use crate::editor::ClipEditor;
use crate::error::{MediaError, MediaResult};

/// One recorded editor invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCall {
    Encode { output: PathBuf, frames: usize, frame_rate: u32 },
    Trim { input: PathBuf, duration: f64, output: PathBuf },
    LoopAndTrim { input: PathBuf, repeats: u32, duration: f64, output: PathBuf },
    Copy { input: PathBuf, output: PathBuf },
    Concat { clips: Vec<PathBuf>, audio: PathBuf, output: PathBuf },
}

#[derive(Debug, Default)]
pub struct RecordingEditor {
    durations: Mutex<HashMap<PathBuf, f64>>,
    calls: Mutex<Vec<EditorCall>>,
}

impl RecordingEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<EditorCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Known duration of a file.
    pub fn duration_of(&self, path: &Path) -> Option<f64> {
        self.durations.lock().ok()?.get(path).copied()
    }

    /// Register an existing file with a duration.
    pub fn seed_file(&self, path: impl Into<PathBuf>, duration: f64) -> PathBuf {
        let path = path.into();
        let _ = std::fs::write(&path, format!("media:{duration:.3}"));
        self.set_duration(&path, duration);
        path
    }

    /// Register an audio track.
    pub fn seed_audio(&self, path: impl Into<PathBuf>, duration: f64) -> PathBuf {
        self.seed_file(path, duration)
    }

    /// Register a raw clip of `frame_count` frames.
    pub fn seed_clip(&self, path: impl Into<PathBuf>, frame_count: u32, frame_rate: u32) -> RawClip {
        let clip = RawClip::new(path.into(), frame_count, frame_rate);
        self.seed_file(clip.path.clone(), clip.native_duration);
        clip
    }

    fn set_duration(&self, path: &Path, duration: f64) {
        if let Ok(mut durations) = self.durations.lock() {
            durations.insert(path.to_path_buf(), duration);
        }
    }

    fn record(&self, call: EditorCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn known(&self, path: &Path) -> MediaResult<f64> {
        self.duration_of(path)
            .ok_or_else(|| MediaError::FileNotFound(path.to_path_buf()))
    }
}

#[async_trait]
impl ClipEditor for RecordingEditor {
    async fn encode_frames(
        &self,
        frames: &[Frame],
        frame_rate: u32,
        output: &Path,
    ) -> MediaResult<RawClip> {
        self.record(EditorCall::Encode {
            output: output.to_path_buf(),
            frames: frames.len(),
            frame_rate,
        });
        if frames.is_empty() || frame_rate == 0 {
            return Err(MediaError::zero_length("no frames"));
        }
        Ok(self.seed_clip(output, frames.len() as u32, frame_rate))
    }

    async fn trim(&self, input: &Path, duration: f64, output: &Path) -> MediaResult<()> {
        self.record(EditorCall::Trim {
            input: input.to_path_buf(),
            duration,
            output: output.to_path_buf(),
        });
        let source = self.known(input)?;
        self.seed_file(output, source.min(duration));
        Ok(())
    }

    async fn loop_and_trim(
        &self,
        input: &Path,
        repeats: u32,
        duration: f64,
        output: &Path,
    ) -> MediaResult<()> {
        self.record(EditorCall::LoopAndTrim {
            input: input.to_path_buf(),
            repeats,
            duration,
            output: output.to_path_buf(),
        });
        let source = self.known(input)?;
        self.seed_file(output, (source * repeats as f64).min(duration));
        Ok(())
    }

    async fn copy(&self, input: &Path, output: &Path) -> MediaResult<()> {
        self.record(EditorCall::Copy {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        });
        let source = self.known(input)?;
        self.seed_file(output, source);
        Ok(())
    }

    async fn concat_with_audio(
        &self,
        clips: &[PathBuf],
        audio: &Path,
        output: &Path,
    ) -> MediaResult<()> {
        self.record(EditorCall::Concat {
            clips: clips.to_vec(),
            audio: audio.to_path_buf(),
            output: output.to_path_buf(),
        });
        if clips.is_empty() {
            return Err(MediaError::EmptyTimeline);
        }
        self.known(audio)?;
        let mut total = 0.0;
        for clip in clips {
            total += self.known(clip)?;
        }
        self.seed_file(output, total);
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        self.known(path)
    }
}
