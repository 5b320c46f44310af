//! Duration reconciliation: force a raw clip to its scene's length.
//!
//! Longer clips are trimmed. Shorter clips are looped end to end and then
//! trimmed, so motion repeats instead of slowing down. The loop always
//! restarts from the first frame with no crossfade.

use std::path::Path;
use tracing::{debug, warn};

use crate::clip::{RawClip, ReconciledClip, DURATION_EPSILON};
use crate::editor::ClipEditor;
use crate::error::{MediaError, MediaResult};

/// Upper bound on loop repeats for a single scene.
pub const MAX_LOOP_REPEATS: u32 = 10_000;

/// How a raw clip will be brought to its required duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePlan {
    /// Native length already matches.
    Exact,
    /// Keep a prefix of the clip.
    Trim,
    /// Repeat the clip `repeats` times, then trim.
    LoopAndTrim { repeats: u32 },
}

impl ReconcilePlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcilePlan::Exact => "exact",
            ReconcilePlan::Trim => "trim",
            ReconcilePlan::LoopAndTrim { .. } => "loop_and_trim",
        }
    }
}

/// Decide how to reconcile `native` seconds of footage to `required`.
///
/// A non-positive or non-finite native length is a [`MediaError::ZeroLengthClip`];
/// this never divides by zero.
pub fn plan_reconciliation(native: f64, required: f64) -> MediaResult<ReconcilePlan> {
    if !(native.is_finite() && native > 0.0) {
        return Err(MediaError::zero_length(format!(
            "native duration {native} is not positive"
        )));
    }
    if !(required.is_finite() && required > 0.0) {
        return Err(MediaError::InvalidDuration(required));
    }

    if (native - required).abs() <= DURATION_EPSILON {
        return Ok(ReconcilePlan::Exact);
    }
    if native > required {
        return Ok(ReconcilePlan::Trim);
    }

    let repeats = (required / native).ceil();
    if repeats > MAX_LOOP_REPEATS as f64 {
        return Err(MediaError::InvalidDuration(required));
    }
    Ok(ReconcilePlan::LoopAndTrim {
        repeats: repeats as u32,
    })
}

/// Reconcile `clip` to exactly `required` seconds, writing to `output`.
pub async fn reconcile(
    editor: &dyn ClipEditor,
    clip: &RawClip,
    scene_index: usize,
    required: f64,
    output: &Path,
) -> MediaResult<ReconciledClip> {
    let plan = plan_reconciliation(clip.native_duration, required)?;
    debug!(
        scene_index,
        native = clip.native_duration,
        required,
        plan = plan.as_str(),
        "Reconciling clip"
    );

    match plan {
        ReconcilePlan::Exact => editor.copy(&clip.path, output).await?,
        ReconcilePlan::Trim => editor.trim(&clip.path, required, output).await?,
        ReconcilePlan::LoopAndTrim { repeats } => {
            editor
                .loop_and_trim(&clip.path, repeats, required, output)
                .await?
        }
    }

    // Encoders land on frame boundaries, so allow one frame of drift
    let measured = editor.probe_duration(output).await?;
    let frame_tolerance = if clip.frame_rate > 0 {
        1.0 / clip.frame_rate as f64
    } else {
        DURATION_EPSILON
    };
    if (measured - required).abs() > frame_tolerance.max(DURATION_EPSILON) {
        warn!(
            scene_index,
            measured,
            required,
            "Reconciled clip length drifted from target"
        );
    }

    Ok(ReconciledClip {
        scene_index,
        path: output.to_path_buf(),
        duration: required,
    })
}
