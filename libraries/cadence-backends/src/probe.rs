//! Media probing
//!
//! Adapters learn an item's duration (and, for video, its frame size) from a
//! [`MediaProbe`] when loading it.

use crate::error::{BackendError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;
use url::Url;

/// What a probe learned about a media URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaInfo {
    /// 0 when unknown
    pub duration_ms: u64,

    /// Natural frame size of video media
    pub dimensions: Option<(u32, u32)>,
}

impl MediaInfo {
    pub fn audio(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            dimensions: None,
        }
    }

    pub fn video(duration_ms: u64, width: u32, height: u32) -> Self {
        Self {
            duration_ms,
            dimensions: Some((width, height)),
        }
    }
}

/// Resolves media URLs to [`MediaInfo`]
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<MediaInfo>;
}

/// Fixed URL → info table, with an optional fallback
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    entries: HashMap<String, MediaInfo>,
    fallback: Option<MediaInfo>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, url: impl Into<String>, info: MediaInfo) -> Self {
        self.entries.insert(url.into(), info);
        self
    }

    /// Info for URLs without an entry; without one they fail to load
    #[must_use]
    pub fn with_fallback(mut self, info: MediaInfo) -> Self {
        self.fallback = Some(info);
        self
    }
}

#[async_trait]
impl MediaProbe for StaticProbe {
    async fn probe(&self, url: &str) -> Result<MediaInfo> {
        self.entries
            .get(url)
            .copied()
            .or(self.fallback)
            .ok_or_else(|| BackendError::NotFound(url.to_string()))
    }
}

/// Reads duration from local files with Symphonia
///
/// Only `file://` URLs are supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaProbe;

#[async_trait]
impl MediaProbe for SymphoniaProbe {
    async fn probe(&self, url: &str) -> Result<MediaInfo> {
        let parsed = Url::parse(url).map_err(|_| BackendError::UnsupportedUrl(url.to_string()))?;
        if parsed.scheme() != "file" {
            return Err(BackendError::UnsupportedUrl(url.to_string()));
        }
        let path = parsed
            .to_file_path()
            .map_err(|()| BackendError::UnsupportedUrl(url.to_string()))?;

        tokio::task::spawn_blocking(move || probe_file(&path))
            .await
            .map_err(|e| BackendError::Task(e.to_string()))?
    }
}

/// Probe a local file for its default track's duration
pub fn probe_file(path: &Path) -> Result<MediaInfo> {
    if !path.exists() {
        return Err(BackendError::NotFound(path.display().to_string()));
    }

    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| BackendError::DecodeError(format!("Failed to probe file: {}", e)))?;

    let duration_ms = probed
        .format
        .default_track()
        .and_then(|track| {
            let params = &track.codec_params;
            let time_base = params.time_base?;
            let n_frames = params.n_frames?;
            let time = time_base.calc_time(n_frames);
            Some(time.seconds * 1000 + (time.frac * 1000.0).round() as u64)
        })
        .unwrap_or(0);

    debug!(path = %path.display(), duration_ms, "Probed media file");
    Ok(MediaInfo::audio(duration_ms))
}
