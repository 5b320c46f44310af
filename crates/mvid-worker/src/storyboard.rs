//! Storyboard synthesis from timed lyrics.
//!
//! The text generator is asked for a JSON array of scenes. Its output is
//! untrusted: the first `[` through the last `]` is parsed and coerced
//! element by element. Anything unrecoverable yields a single fallback
//! scene, so synthesis itself never fails.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use mvid_models::{timestamp, transcript_span, Scene, TranscriptSegment, DEFAULT_MOTION_PROMPT};

use crate::collaborators::TextGenerator;

/// Character budget for the lyrics block of the instruction.
pub const LYRICS_CHAR_BUDGET: usize = 3000;

/// Length of the fallback scene when the song length is unknown.
pub const FALLBACK_SPAN_SECONDS: f64 = 5.0;

const SYSTEM_PROMPT: &str = r#"You are a music video director and storyboard artist.

Given a song's title, genre tags and timed lyrics, produce a storyboard.

Rules:
1. Invent ONE consistent visual style and ONE protagonist description, then repeat them verbatim in every visual_prompt so all scenes look like the same film.
2. Write visual prompts in professional cinematography vocabulary: shot size, lens, lighting, color palette, composition.
3. Give every scene an explicit camera motion in motion_prompt (e.g. "Slow dolly in", "Handheld tracking shot left", "Static wide shot").
4. Scenes follow the lyric timing. Use the timestamps provided; cover the whole song without gaps.

Output ONLY a JSON array, no prose, in exactly this shape:
[
  {"start": 0.0, "end": 4.5, "visual_prompt": "...", "motion_prompt": "..."}
]"#;

/// Why the fallback storyboard was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The text generator call itself failed
    GeneratorFailed,
    /// No `[` ... `]` pair in the output
    NoArray,
    /// The bracketed text was not valid JSON
    InvalidJson,
    /// The array had elements but none could be used
    NoUsableScenes,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::GeneratorFailed => "generator_failed",
            FallbackReason::NoArray => "no_array",
            FallbackReason::InvalidJson => "invalid_json",
            FallbackReason::NoUsableScenes => "no_usable_scenes",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of storyboard synthesis.
#[derive(Debug, Clone, PartialEq)]
pub enum StoryboardOutcome {
    /// Scenes recovered from the generator output
    Parsed(Vec<Scene>),
    /// Single-scene default substituted for unusable output
    Fallback {
        scenes: Vec<Scene>,
        reason: FallbackReason,
    },
}

impl StoryboardOutcome {
    pub fn scenes(&self) -> &[Scene] {
        match self {
            StoryboardOutcome::Parsed(scenes) => scenes,
            StoryboardOutcome::Fallback { scenes, .. } => scenes,
        }
    }

    pub fn into_scenes(self) -> Vec<Scene> {
        match self {
            StoryboardOutcome::Parsed(scenes) => scenes,
            StoryboardOutcome::Fallback { scenes, .. } => scenes,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StoryboardOutcome::Fallback { .. })
    }
}

/// Turns timed segments and song metadata into scenes.
#[derive(Clone)]
pub struct StoryboardSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl StoryboardSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Synthesize a storyboard. Never fails; see [`StoryboardOutcome`].
    pub async fn synthesize(
        &self,
        segments: &[TranscriptSegment],
        title: &str,
        tags: &str,
    ) -> StoryboardOutcome {
        let prompt = build_user_prompt(segments, title, tags);
        debug!(prompt_chars = prompt.chars().count(), "Requesting storyboard");

        let raw = match self.generator.generate(SYSTEM_PROMPT, &prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Storyboard generation failed, using fallback");
                return fallback(segments, title, FallbackReason::GeneratorFailed);
            }
        };

        match parse_storyboard(&raw) {
            Ok(scenes) => {
                info!(scenes = scenes.len(), "Parsed storyboard");
                StoryboardOutcome::Parsed(scenes)
            }
            Err(reason) => {
                warn!(reason = %reason, output_chars = raw.len(), "Unusable storyboard output, using fallback");
                fallback(segments, title, reason)
            }
        }
    }
}

/// Build the user instruction for the text generator.
pub fn build_user_prompt(segments: &[TranscriptSegment], title: &str, tags: &str) -> String {
    let lyrics = segments
        .iter()
        .map(|s| {
            format!(
                "{} {}",
                timestamp::format_range(s.start, s.end),
                s.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let lyrics = truncate_chars(&lyrics, LYRICS_CHAR_BUDGET);

    format!(
        "Song Title: {}\nGenre/Tags: {}\n\nLyrics & Timing:\n{}",
        title, tags, lyrics
    )
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Slice from the first `[` to the last `]`, inclusive.
pub fn extract_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Parse generator output into scenes, or say why it can't be used.
pub fn parse_storyboard(raw: &str) -> Result<Vec<Scene>, FallbackReason> {
    let array = extract_json_array(raw).ok_or(FallbackReason::NoArray)?;
    let value: Value = serde_json::from_str(array).map_err(|_| FallbackReason::InvalidJson)?;
    let Value::Array(items) = value else {
        return Err(FallbackReason::InvalidJson);
    };

    if items.is_empty() {
        return Ok(Vec::new());
    }

    let scenes: Vec<Scene> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let scene = coerce_scene(item);
            if scene.is_none() {
                debug!(index = i, "Dropping storyboard element without a visual prompt");
            }
            scene
        })
        .collect();

    if scenes.is_empty() {
        return Err(FallbackReason::NoUsableScenes);
    }
    Ok(scenes)
}

fn coerce_scene(item: &Value) -> Option<Scene> {
    let obj = item.as_object()?;
    let visual_prompt = obj
        .get("visual_prompt")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?;
    let motion_prompt = obj
        .get("motion_prompt")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_MOTION_PROMPT);

    Some(Scene::new(
        seconds(obj.get("start")),
        seconds(obj.get("end")),
        visual_prompt,
        motion_prompt,
    ))
}

fn seconds(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// The single scene used when the generator output is unusable.
pub fn fallback_scene(segments: &[TranscriptSegment], title: &str) -> Scene {
    let end = transcript_span(segments).unwrap_or(FALLBACK_SPAN_SECONDS);
    Scene::new(
        0.0,
        end,
        format!("Abstract art representing {}", title),
        DEFAULT_MOTION_PROMPT,
    )
}

fn fallback(segments: &[TranscriptSegment], title: &str, reason: FallbackReason) -> StoryboardOutcome {
    StoryboardOutcome::Fallback {
        scenes: vec![fallback_scene(segments, title)],
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CollaboratorError, CollaboratorResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedGenerator {
        reply: CollaboratorResult<String>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGenerator {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(CollaboratorError::text("connection refused")),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, system: &str, user: &str) -> CollaboratorResult<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            self.reply.clone()
        }
    }

    fn segments() -> Vec<TranscriptSegment> {
        vec![
            TranscriptSegment::new(0.0, 4.0, "neon rain"),
            TranscriptSegment::new(4.0, 9.0, "empty streets"),
            TranscriptSegment::new(9.0, 15.0, "we run"),
        ]
    }

    #[test]
    fn test_extract_ignores_surrounding_prose() {
        let raw = r#"Sure! Here's your storyboard: [ {"start":0,"end":3,"visual_prompt":"a"} ] Hope that helps!"#;
        assert_eq!(
            extract_json_array(raw),
            Some(r#"[ {"start":0,"end":3,"visual_prompt":"a"} ]"#)
        );
    }

    #[test]
    fn test_extract_requires_ordered_brackets() {
        assert_eq!(extract_json_array("I cannot do that."), None);
        assert_eq!(extract_json_array("] backwards ["), None);
        assert_eq!(extract_json_array(""), None);
    }

    #[test]
    fn test_parse_reasons() {
        assert_eq!(parse_storyboard("no brackets").unwrap_err(), FallbackReason::NoArray);
        assert_eq!(parse_storyboard("[{\"start\": 0,]").unwrap_err(), FallbackReason::InvalidJson);
        assert_eq!(parse_storyboard("[1] and [2]").unwrap_err(), FallbackReason::InvalidJson);
        assert_eq!(
            parse_storyboard(r#"[{"start": 0, "end": 3}]"#).unwrap_err(),
            FallbackReason::NoUsableScenes
        );
        assert_eq!(parse_storyboard("[]").unwrap(), Vec::new());
    }

    #[test]
    fn test_parse_coerces_fields() {
        let raw = r#"[
            {"start": "1.5", "end": 6, "visual_prompt": " rooftop at dusk "},
            {"end": 9, "visual_prompt": "alley", "motion_prompt": "Dolly in"},
            {"start": 9, "end": 12, "visual_prompt": ""},
            "not an object"
        ]"#;
        let scenes = parse_storyboard(raw).unwrap();

        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0], Scene::new(1.5, 6.0, "rooftop at dusk", DEFAULT_MOTION_PROMPT));
        assert_eq!(scenes[1], Scene::new(0.0, 9.0, "alley", "Dolly in"));
    }

    #[test]
    fn test_user_prompt_format() {
        let prompt = build_user_prompt(&segments()[..1], "Night Drive", "synthwave");
        assert_eq!(
            prompt,
            "Song Title: Night Drive\nGenre/Tags: synthwave\n\nLyrics & Timing:\n[0.00-4.00] neon rain"
        );
    }

    #[test]
    fn test_user_prompt_truncates_lyrics() {
        let long: Vec<TranscriptSegment> = (0..500)
            .map(|i| TranscriptSegment::new(i as f64, i as f64 + 1.0, "ééééééééééééééééééé"))
            .collect();
        let prompt = build_user_prompt(&long, "T", "g");
        let lyrics = prompt.split_once("Lyrics & Timing:\n").unwrap().1;
        assert_eq!(lyrics.chars().count(), LYRICS_CHAR_BUDGET);
    }

    #[test]
    fn test_fallback_span() {
        let scene = fallback_scene(&segments(), "Night Drive");
        assert_eq!(scene.start, 0.0);
        assert_eq!(scene.end, 15.0);
        assert_eq!(scene.visual_prompt, "Abstract art representing Night Drive");

        assert_eq!(fallback_scene(&[], "x").end, FALLBACK_SPAN_SECONDS);
    }

    #[tokio::test]
    async fn test_synthesize_parsed() {
        let generator = ScriptedGenerator::replying(
            r#"Here you go:
            [{"start":0,"end":4,"visual_prompt":"a"},{"start":4,"end":9,"visual_prompt":"b"},{"start":9,"end":15,"visual_prompt":"c"}]"#,
        );
        let synth = StoryboardSynthesizer::new(generator.clone());
        let outcome = synth.synthesize(&segments(), "Night Drive", "synthwave").await;

        assert!(!outcome.is_fallback());
        assert_eq!(outcome.scenes().len(), 3);

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].0.contains("JSON array"));
        assert!(prompts[0].1.starts_with("Song Title: Night Drive"));
    }

    #[tokio::test]
    async fn test_synthesize_never_empty_on_noise() {
        for noise in ["I cannot do that.", "", "[[[", "]]] [ {", "{\"start\": ]"] {
            let synth = StoryboardSynthesizer::new(ScriptedGenerator::replying(noise));
            let outcome = synth.synthesize(&segments(), "Night Drive", "").await;
            assert!(outcome.is_fallback(), "expected fallback for {:?}", noise);
            assert_eq!(outcome.scenes().len(), 1);
            assert_eq!(outcome.scenes()[0].end, 15.0);
        }
    }

    #[tokio::test]
    async fn test_synthesize_generator_failure() {
        let synth = StoryboardSynthesizer::new(ScriptedGenerator::failing());
        let outcome = synth.synthesize(&segments(), "Night Drive", "").await;

        match outcome {
            StoryboardOutcome::Fallback { scenes, reason } => {
                assert_eq!(reason, FallbackReason::GeneratorFailed);
                assert_eq!(scenes.len(), 1);
            }
            other => panic!("expected fallback, got {:?}", other),
        }
    }
}
