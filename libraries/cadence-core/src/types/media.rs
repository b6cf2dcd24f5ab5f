/// Media item types
use crate::error::CoreError;
use crate::types::ItemId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of media an item carries
///
/// Selects which backend adapter plays the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
}

impl MediaType {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl FromStr for MediaType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            other => Err(CoreError::UnknownMediaType(other.to_string())),
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One playable unit in a queue
///
/// Only items with a resolvable media URL exist; the catalog intake in
/// [`crate::catalog`] drops everything else. `media_type` never changes once
/// the item is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Stable identifier, unique within a queue
    pub id: ItemId,

    /// Display title
    pub title: String,

    /// Display artist (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,

    /// Audio or video
    pub media_type: MediaType,

    /// Artwork URL (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,

    /// Where the backend fetches the media from
    pub media_url: String,

    /// Advisory lock flag from the catalog; not enforced by playback
    #[serde(default)]
    pub is_locked: bool,
}

impl MediaItem {
    /// Create a new media item
    pub fn new(
        id: impl Into<ItemId>,
        title: impl Into<String>,
        media_type: MediaType,
        media_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist_name: None,
            media_type,
            artwork_url: None,
            media_url: media_url.into(),
            is_locked: false,
        }
    }

    /// Shorthand for an audio item
    pub fn audio(id: impl Into<ItemId>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(id, title, MediaType::Audio, url)
    }

    /// Shorthand for a video item
    pub fn video(id: impl Into<ItemId>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(id, title, MediaType::Video, url)
    }

    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist_name = Some(artist.into());
        self
    }

    #[must_use]
    pub fn with_artwork(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn locked(mut self, locked: bool) -> Self {
        self.is_locked = locked;
        self
    }

    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }
}
