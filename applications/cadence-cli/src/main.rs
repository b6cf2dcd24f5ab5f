/// Cadence - headless media queue player
mod config;

use anyhow::{bail, Context};
use cadence_backends::{clock_adapters, MediaInfo, MediaProbe, StaticProbe, SymphoniaProbe};
use cadence_core::{playable_items_from_json, MediaItem, MediaType};
use cadence_playback::{PlayerController, PlayerEvent, PlayerHandle, RepeatMode};
use clap::{Parser, Subcommand, ValueEnum};
use crate::config::{CliConfig, MediaSettings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Headless media queue player", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the playable items of a catalog JSON file
    Play {
        /// Catalog file (array of catalog records)
        catalog: PathBuf,

        /// Queue index to start from
        #[arg(short, long, default_value_t = 0)]
        start: usize,

        /// Shuffle the queue, keeping the start item first
        #[arg(long)]
        shuffle: bool,

        /// Repeat mode
        #[arg(short, long, value_enum)]
        repeat: Option<RepeatArg>,

        /// Playback rate (0.5-2.0)
        #[arg(long)]
        rate: Option<f32>,
    },
    /// Print the duration of a local media file
    Probe {
        /// File path
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RepeatArg {
    Off,
    All,
    One,
}

impl From<RepeatArg> for RepeatMode {
    fn from(arg: RepeatArg) -> Self {
        match arg {
            RepeatArg::Off => RepeatMode::Off,
            RepeatArg::All => RepeatMode::All,
            RepeatArg::One => RepeatMode::One,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            catalog,
            start,
            shuffle,
            repeat,
            rate,
        } => {
            let mut config = CliConfig::load(cli.config.as_deref())?;
            if shuffle {
                config.playback.shuffle = true;
            }
            if let Some(repeat) = repeat {
                config.playback.repeat_mode = repeat.into();
            }
            if let Some(rate) = rate {
                config.playback.playback_rate = rate;
            }
            play(&catalog, start, config).await?;
        }
        Commands::Probe { path } => {
            let info = cadence_backends::probe::probe_file(&path)?;
            println!("{}\t{} ms", path.display(), info.duration_ms);
        }
    }

    Ok(())
}

async fn play(catalog: &Path, start: usize, config: CliConfig) -> anyhow::Result<()> {
    let json = tokio::fs::read_to_string(catalog)
        .await
        .with_context(|| format!("Failed to read {}", catalog.display()))?;
    let items = playable_items_from_json(&json)?;
    if items.is_empty() {
        bail!("{} has no playable items", catalog.display());
    }
    tracing::info!("Loaded {} playable items", items.len());

    let probe = build_probe(&items, &config.media).await;
    let player = PlayerController::spawn(config.playback, clock_adapters(Arc::new(probe)));
    let mut events = player.events();

    player.play_queue(items, start).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(PlayerEvent::QueueEnded) => {
                    tracing::info!("Queue ended");
                    break;
                }
                Ok(PlayerEvent::ItemChanged { .. }) => log_state(&player),
                Ok(PlayerEvent::LoadFailed { item_id, message }) => {
                    tracing::warn!("Failed to load {}: {}", item_id, message);
                    break;
                }
                Ok(other) => tracing::debug!(event = ?other, "Player event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    player.shutdown().await?;
    Ok(())
}

fn log_state(player: &PlayerHandle) {
    let state = player.state();
    if let Some(item) = state.current_item() {
        tracing::info!(
            "Now playing [{}/{}] {} ({:?}, {} ms)",
            state.current_index + 1,
            state.queue.len(),
            item.title,
            item.media_type,
            state.duration_ms
        );
    }
}

/// Probe local files up front; remote media gets the configured defaults
async fn build_probe(items: &[MediaItem], media: &MediaSettings) -> StaticProbe {
    let mut probe = StaticProbe::new();

    for item in items {
        let info = if item.media_url.starts_with("file:") {
            match SymphoniaProbe.probe(&item.media_url).await {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!("Could not probe {}: {}", item.media_url, e);
                    continue;
                }
            }
        } else {
            MediaInfo::audio(media.default_duration_ms)
        };

        let info = match item.media_type {
            MediaType::Video => {
                MediaInfo::video(info.duration_ms, media.video_width, media.video_height)
            }
            MediaType::Audio => info,
        };
        probe = probe.with(item.media_url.clone(), info);
    }

    probe
}
