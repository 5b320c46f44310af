//! Run one song through the pipeline from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mvid_media::{check_ffmpeg, FfmpegEditor};
use mvid_models::SongRequest;
use mvid_worker::{Collaborators, PipelineController, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "mvid-worker")]
#[command(about = "Turn a song into a music video")]
#[command(version)]
struct Args {
    /// URL of the song audio
    #[arg(long)]
    audio_url: String,

    #[arg(long, default_value = "Unknown Song")]
    title: String,

    #[arg(long, default_value = "Music")]
    tags: String,

    #[arg(long, default_value = "suno_video")]
    song_id: String,

    /// Where to copy the master video
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    mvid_worker::init_tracing();

    let args = Args::parse();
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    check_ffmpeg().context("ffmpeg is required")?;

    let editor = Arc::new(FfmpegEditor::new().with_timeout(config.ffmpeg_timeout_secs));
    let collaborators = Collaborators::from_env()
        .await
        .context("Failed to initialize collaborators")?;
    let controller = PipelineController::new(config, collaborators, editor)?;

    let request = SongRequest::new(args.song_id, args.title, args.tags, args.audio_url);
    let output = controller.run(&request).await?;

    let destination = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}.mp4", request.song_id.file_stem())));
    tokio::fs::write(&destination, &output.bytes)
        .await
        .with_context(|| format!("Failed to write {}", destination.display()))?;

    info!(
        output = %destination.display(),
        scenes = output.tally.succeeded,
        duration = output.master.video_duration,
        "Music video written"
    );
    Ok(())
}
