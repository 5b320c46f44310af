//! Timeline assembly: concatenate reconciled clips under the song audio.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::clip::{MasterArtifact, ReconciledClip};
use crate::editor::ClipEditor;
use crate::error::{MediaError, MediaResult};

/// Build the master from `clips` in scene order with `audio` from t=0.
///
/// The audio is neither trimmed nor resampled. If it is longer or shorter
/// than the video, the mismatch is left in the output.
pub async fn assemble(
    editor: &dyn ClipEditor,
    clips: &[ReconciledClip],
    audio: &Path,
    output: &Path,
) -> MediaResult<MasterArtifact> {
    if clips.is_empty() {
        return Err(MediaError::EmptyTimeline);
    }

    let mut ordered: Vec<&ReconciledClip> = clips.iter().collect();
    ordered.sort_by_key(|c| c.scene_index);

    let paths: Vec<PathBuf> = ordered.iter().map(|c| c.path.clone()).collect();
    let video_duration: f64 = ordered.iter().map(|c| c.duration).sum();

    editor.concat_with_audio(&paths, audio, output).await?;

    match editor.probe_duration(audio).await {
        Ok(audio_duration) if (audio_duration - video_duration).abs() > 0.5 => {
            warn!(
                audio_duration,
                video_duration,
                "Audio and video lengths differ; keeping both as-is"
            );
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Could not probe audio duration"),
    }

    info!(
        clips = paths.len(),
        video_duration,
        output = %output.display(),
        "Assembled master"
    );

    Ok(MasterArtifact {
        path: output.to_path_buf(),
        video_duration,
        clip_count: paths.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EditorCall, RecordingEditor};

    #[tokio::test]
    async fn test_empty_timeline_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let editor = RecordingEditor::new();
        let err = assemble(&editor, &[], &dir.path().join("a.mp3"), &dir.path().join("m.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::EmptyTimeline));
        assert!(editor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_assemble_in_scene_order() {
        let dir = tempfile::tempdir().unwrap();
        let editor = RecordingEditor::new();
        let audio = editor.seed_audio(dir.path().join("song.mp3"), 15.0);

        let clip = |i: usize, d: f64| ReconciledClip {
            scene_index: i,
            path: dir.path().join(format!("c{i}.mp4")),
            duration: d,
        };
        for (i, d) in [(0, 4.0), (2, 6.0), (1, 5.0)] {
            editor.seed_file(dir.path().join(format!("c{i}.mp4")), d);
        }

        let master = assemble(
            &editor,
            &[clip(0, 4.0), clip(2, 6.0), clip(1, 5.0)],
            &audio,
            &dir.path().join("master.mp4"),
        )
        .await
        .unwrap();

        assert_eq!(master.clip_count, 3);
        assert!((master.video_duration - 15.0).abs() < 1e-9);

        let calls = editor.calls();
        let EditorCall::Concat { clips, audio: used_audio, .. } = &calls[0] else {
            panic!("expected concat, got {:?}", calls[0]);
        };
        let names: Vec<_> = clips
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["c0.mp4", "c1.mp4", "c2.mp4"]);
        assert_eq!(used_audio, &audio);
    }

    #[tokio::test]
    async fn test_mismatched_audio_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let editor = RecordingEditor::new();
        let audio = editor.seed_audio(dir.path().join("song.mp3"), 180.0);
        editor.seed_file(dir.path().join("c0.mp4"), 4.0);

        let master = assemble(
            &editor,
            &[ReconciledClip {
                scene_index: 0,
                path: dir.path().join("c0.mp4"),
                duration: 4.0,
            }],
            &audio,
            &dir.path().join("master.mp4"),
        )
        .await
        .unwrap();
        assert_eq!(master.clip_count, 1);
    }
}
