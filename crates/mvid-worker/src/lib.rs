//! Song to music video pipeline.
//!
//! This crate provides:
//! - Collaborator traits for the model services and stores, with
//!   production adapters
//! - Storyboard synthesis with schema recovery and fallback
//! - Per-scene rendering with best-effort provenance uploads
//! - The pipeline controller that reconciles, assembles and persists

pub mod adapters;
pub mod audio;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod renderer;
pub mod storyboard;

#[cfg(test)]
mod testing;

pub use audio::{audio_path, AudioFetcher};
pub use collaborators::{
    AssetStore, CollaboratorError, CollaboratorResult, Collaborators, ImageSynthesizer,
    MetadataStore, TextGenerator, Transcriber, VideoSynthesizer,
};
pub use config::WorkerConfig;
pub use error::{AudioError, PipelineError, PipelineResult, PipelineStage, SceneError};
pub use logging::RunLogger;
pub use pipeline::{master_key, PipelineController, RunOutput, SceneTally, MIN_SURVIVING_CLIPS};
pub use renderer::{RenderedScene, SceneRenderer};
pub use storyboard::{FallbackReason, StoryboardOutcome, StoryboardSynthesizer};

/// Install the global tracing subscriber.
///
/// JSON output when `LOG_FORMAT=json`, ANSI text otherwise. `RUST_LOG`
/// overrides the default `info` level.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}
