//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress snapshot emitted on each `progress=` line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Frames written so far
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime
    pub speed: f64,
    /// Whether ffmpeg reported `progress=end`
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Fraction of `target_secs` written so far, clamped to `[0, 1]`.
    pub fn fraction_of(&self, target_secs: f64) -> f64 {
        if !(target_secs.is_finite() && target_secs > 0.0) {
            return 0.0;
        }
        ((self.out_time_ms as f64 / 1000.0) / target_secs).clamp(0.0, 1.0)
    }

    /// Fold one `key=value` line into this snapshot.
    ///
    /// Returns a copy when the line closes a progress block.
    pub fn apply_line(&mut self, line: &str) -> Option<FfmpegProgress> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            // ffmpeg reports microseconds under both keys
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_ms = us / 1000;
                }
            }
            "frame" => {
                if let Ok(frame) = value.trim().parse() {
                    self.frame = frame;
                }
            }
            "speed" => {
                if let Some(speed) = value.trim().strip_suffix('x').and_then(|s| s.parse().ok()) {
                    self.speed = speed;
                }
            }
            "progress" => {
                self.is_complete = value == "end";
                return Some(self.clone());
            }
            _ => {}
        }
        None
    }

    /// Whether a stderr line belongs to the `-progress` stream.
    pub fn is_progress_line(line: &str) -> bool {
        const KEYS: &[&str] = &[
            "frame", "fps", "stream_0_0_q", "bitrate", "total_size", "out_time_us",
            "out_time_ms", "out_time", "dup_frames", "drop_frames", "speed", "progress",
        ];
        line.split_once('=')
            .map(|(k, _)| KEYS.contains(&k.trim()))
            .unwrap_or(false)
    }
}
