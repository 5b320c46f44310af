//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use mvid_models::{ImageSpec, VideoSpec};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory for downloaded audio and per-run scratch files
    pub work_dir: PathBuf,
    /// Timeout for a single ffmpeg invocation, in seconds
    pub ffmpeg_timeout_secs: u64,
    /// Timeout for the audio download
    pub audio_fetch_timeout: Duration,
    pub image: ImageSpec,
    pub video: VideoSpec,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/assets"),
            ffmpeg_timeout_secs: 600,
            audio_fetch_timeout: Duration::from_secs(120),
            image: ImageSpec::default(),
            video: VideoSpec::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("MVID_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            ffmpeg_timeout_secs: env_parse("MVID_FFMPEG_TIMEOUT_SECS")
                .unwrap_or(defaults.ffmpeg_timeout_secs),
            audio_fetch_timeout: Duration::from_secs(
                env_parse("MVID_AUDIO_FETCH_TIMEOUT_SECS").unwrap_or(120),
            ),
            image: ImageSpec {
                width: env_parse("MVID_IMAGE_WIDTH").unwrap_or(defaults.image.width),
                height: env_parse("MVID_IMAGE_HEIGHT").unwrap_or(defaults.image.height),
                ..defaults.image
            },
            video: VideoSpec {
                frame_count: env_parse("MVID_VIDEO_FRAMES").unwrap_or(defaults.video.frame_count),
                frame_rate: env_parse("MVID_VIDEO_FPS")
                    .filter(|fps: &u32| *fps > 0)
                    .unwrap_or(defaults.video.frame_rate),
                ..defaults.video
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 7] = [
        "MVID_WORK_DIR",
        "MVID_FFMPEG_TIMEOUT_SECS",
        "MVID_AUDIO_FETCH_TIMEOUT_SECS",
        "MVID_IMAGE_WIDTH",
        "MVID_IMAGE_HEIGHT",
        "MVID_VIDEO_FRAMES",
        "MVID_VIDEO_FPS",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_from_empty_env() {
        clear_env();
        let config = WorkerConfig::from_env();
        assert_eq!(config.work_dir, PathBuf::from("/tmp/assets"));
        assert_eq!(config.image.width, 1360);
        assert_eq!(config.video.frame_count, 49);
        assert_eq!(config.video.frame_rate, 8);
    }

    #[test]
    #[serial]
    fn test_overrides_and_bad_values() {
        clear_env();
        std::env::set_var("MVID_WORK_DIR", "/data/runs");
        std::env::set_var("MVID_VIDEO_FRAMES", "48");
        std::env::set_var("MVID_VIDEO_FPS", "0");
        std::env::set_var("MVID_IMAGE_WIDTH", "wide");

        let config = WorkerConfig::from_env();
        assert_eq!(config.work_dir, PathBuf::from("/data/runs"));
        assert_eq!(config.video.frame_count, 48);
        assert_eq!(config.video.frame_rate, 8);
        assert_eq!(config.image.width, 1360);
        assert_eq!(config.video.steps, 50);
        clear_env();
    }
}
