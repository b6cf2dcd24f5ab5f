//! CLI configuration
use anyhow::{Context, Result};
use cadence_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default = "default_media")]
    pub media: MediaSettings,
}

/// What to assume about media that cannot be probed locally
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaSettings {
    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: u64,

    #[serde(default = "default_video_width")]
    pub video_width: u32,

    #[serde(default = "default_video_height")]
    pub video_height: u32,
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// Without an explicit path, `cadence.toml` in the working directory is
    /// used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables, e.g. CADENCE_PLAYBACK__VOLUME
        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings.build().context("Failed to read configuration")?;
        config
            .try_deserialize()
            .context("Invalid configuration")
    }
}

// Default values
fn default_media() -> MediaSettings {
    MediaSettings {
        default_duration_ms: default_duration_ms(),
        video_width: default_video_width(),
        video_height: default_video_height(),
    }
}

fn default_duration_ms() -> u64 {
    30_000
}

fn default_video_width() -> u32 {
    1920
}

fn default_video_height() -> u32 {
    1080
}
