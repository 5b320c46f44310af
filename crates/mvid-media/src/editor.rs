//! Clip editing operations behind a trait seam.
//!
//! [`ClipEditor`] is what the reconciler and the timeline assembler call.
//! [`FfmpegEditor`] implements it with the ffmpeg CLI.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace};

use mvid_models::Frame;

use crate::clip::{MasterEncoding, RawClip, TimelineGeometry};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;

/// Editing primitives over clip files.
#[async_trait]
pub trait ClipEditor: Send + Sync {
    /// Encode PNG frames into a silent clip at `frame_rate`.
    async fn encode_frames(
        &self,
        frames: &[Frame],
        frame_rate: u32,
        output: &Path,
    ) -> MediaResult<RawClip>;

    /// Keep the first `duration` seconds of `input`.
    async fn trim(&self, input: &Path, duration: f64, output: &Path) -> MediaResult<()>;

    /// Play `input` `repeats` times back to back, cut at `duration`.
    async fn loop_and_trim(
        &self,
        input: &Path,
        repeats: u32,
        duration: f64,
        output: &Path,
    ) -> MediaResult<()>;

    /// Copy `input` unchanged.
    async fn copy(&self, input: &Path, output: &Path) -> MediaResult<()>;

    /// Concatenate `clips` in order and lay `audio` under them from t=0.
    async fn concat_with_audio(
        &self,
        clips: &[PathBuf],
        audio: &Path,
        output: &Path,
    ) -> MediaResult<()>;

    /// Duration of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64>;
}

/// [`ClipEditor`] backed by the ffmpeg and ffprobe binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEditor {
    runner: FfmpegRunner,
    geometry: TimelineGeometry,
    encoding: MasterEncoding,
}

impl FfmpegEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill any single ffmpeg invocation after `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    async fn run(&self, operation: &'static str, cmd: FfmpegCommand) -> MediaResult<()> {
        let start = Instant::now();
        let result = self
            .runner
            .run_with_progress(&cmd, move |p| {
                trace!(operation, out_time_ms = p.out_time_ms, speed = p.speed, "FFmpeg progress");
            })
            .await;
        let status = if result.is_ok() { "success" } else { "error" };

        metrics::counter!(
            "mvid_ffmpeg_operations_total",
            "operation" => operation,
            "status" => status
        )
        .increment(1);
        metrics::histogram!("mvid_ffmpeg_duration_seconds", "operation" => operation)
            .record(start.elapsed().as_secs_f64());

        debug!(
            operation,
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            "FFmpeg operation finished"
        );
        result
    }
}

/// Filter graph that letterboxes each input, then concatenates them.
pub fn compose_concat_filter(clip_count: usize, geometry: &TimelineGeometry) -> String {
    let TimelineGeometry { width, height, fps } = *geometry;
    let mut graph = String::new();

    for i in 0..clip_count {
        graph.push_str(&format!(
            "[{i}:v]scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps}[v{i}];"
        ));
    }
    for i in 0..clip_count {
        graph.push_str(&format!("[v{i}]"));
    }
    graph.push_str(&format!("concat=n={clip_count}:v=1:a=0[vout]"));
    graph
}

#[async_trait]
impl ClipEditor for FfmpegEditor {
    async fn encode_frames(
        &self,
        frames: &[Frame],
        frame_rate: u32,
        output: &Path,
    ) -> MediaResult<RawClip> {
        if frames.is_empty() {
            return Err(MediaError::zero_length("video synthesis returned no frames"));
        }
        if frame_rate == 0 {
            return Err(MediaError::zero_length("frame rate is zero"));
        }

        let frame_dir = tempfile::tempdir()?;
        for (i, frame) in frames.iter().enumerate() {
            let path = frame_dir.path().join(format!("frame_{:04}.png", i));
            tokio::fs::write(&path, frame.as_bytes()).await?;
        }

        let cmd = FfmpegCommand::new(output)
            .image_sequence_input(frame_dir.path().join("frame_%04d.png"), frame_rate)
            // libx264 with yuv420p needs even dimensions
            .video_filter("scale=trunc(iw/2)*2:trunc(ih/2)*2")
            .video_codec("libx264")
            .pixel_format("yuv420p")
            .no_audio();
        self.run("encode_frames", cmd).await?;

        let clip = RawClip::new(output, frames.len() as u32, frame_rate);
        info!(
            frames = clip.frame_count,
            frame_rate,
            native_duration = clip.native_duration,
            output = %output.display(),
            "Encoded raw clip"
        );
        Ok(clip)
    }

    async fn trim(&self, input: &Path, duration: f64, output: &Path) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(output)
            .input(input)
            .output_duration(duration)
            .video_codec("libx264")
            .pixel_format("yuv420p")
            .no_audio();
        self.run("trim", cmd).await
    }

    async fn loop_and_trim(
        &self,
        input: &Path,
        repeats: u32,
        duration: f64,
        output: &Path,
    ) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(output)
            .looped_input(input, repeats.saturating_sub(1))
            .output_duration(duration)
            .video_codec("libx264")
            .pixel_format("yuv420p")
            .no_audio();
        self.run("loop_and_trim", cmd).await
    }

    async fn copy(&self, input: &Path, output: &Path) -> MediaResult<()> {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn concat_with_audio(
        &self,
        clips: &[PathBuf],
        audio: &Path,
        output: &Path,
    ) -> MediaResult<()> {
        if clips.is_empty() {
            return Err(MediaError::EmptyTimeline);
        }
        if !audio.exists() {
            return Err(MediaError::FileNotFound(audio.to_path_buf()));
        }

        let mut cmd = FfmpegCommand::new(output);
        for clip in clips {
            cmd = cmd.input(clip);
        }
        let audio_index = clips.len();
        let cmd = cmd
            .input(audio)
            .filter_complex(compose_concat_filter(clips.len(), &self.geometry))
            .map("[vout]")
            .map(format!("{}:a:0", audio_index))
            .video_codec(self.encoding.video_codec.clone())
            .preset(self.encoding.preset.clone())
            .video_bitrate(self.encoding.video_bitrate.clone())
            .pixel_format("yuv420p")
            .audio_codec(self.encoding.audio_codec.clone());

        self.run("concat_with_audio", cmd).await
    }

    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        Ok(probe_media(path).await?.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_concat_filter() {
        let graph = compose_concat_filter(2, &TimelineGeometry::default());
        assert!(graph.starts_with("[0:v]scale=1360:768:force_original_aspect_ratio=decrease,"));
        assert!(graph.contains("pad=1360:768:(ow-iw)/2:(oh-ih)/2,setsar=1,fps=24[v0];"));
        assert!(graph.contains("[1:v]scale="));
        assert!(graph.ends_with("[v0][v1]concat=n=2:v=1:a=0[vout]"));
    }

    #[tokio::test]
    async fn test_encode_frames_rejects_empty() {
        let editor = FfmpegEditor::new();
        let dir = tempfile::tempdir().unwrap();
        let err = editor
            .encode_frames(&[], 8, &dir.path().join("raw.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::ZeroLengthClip(_)));
    }

    #[tokio::test]
    async fn test_concat_rejects_empty_clip_list() {
        let editor = FfmpegEditor::new();
        let dir = tempfile::tempdir().unwrap();
        let err = editor
            .concat_with_audio(&[], &dir.path().join("song.mp3"), &dir.path().join("m.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::EmptyTimeline));
    }
}
