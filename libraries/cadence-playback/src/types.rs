//! Core types for playback management

use crate::levels::{clamp_rate, clamp_volume};
use crate::surface::SurfaceId;
use cadence_core::{ItemId, MediaItem};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when queue ends
    #[default]
    Off,

    /// Loop entire queue
    All,

    /// Loop current item only
    One,
}

impl RepeatMode {
    /// Next mode in the `off → all → one → off` cycle
    #[must_use]
    pub fn cycle(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }
}

/// Where the controller is in its per-session state machine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlaybackPhase {
    /// No backend instance
    ///
    /// The queue is empty, except after a failed load where the previously
    /// current item is kept on display.
    #[default]
    Idle,

    /// A backend instance is being created for this item
    Loading {
        #[serde(rename = "itemId")]
        item_id: ItemId,
    },

    /// Backend loaded; status snapshots flow
    Ready,
}

/// The single source of truth for a playback session
///
/// Written only by the controller task. Presentation reads snapshots of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    /// Playback order
    pub queue: Vec<MediaItem>,

    /// Index into `queue`; meaningless when the queue is empty
    pub current_index: usize,

    /// Actual backend transport state
    pub is_playing: bool,

    pub position_ms: u64,

    /// 0 until the backend reports a known duration
    pub duration_ms: u64,

    /// Full-screen (true) vs mini player
    pub is_expanded: bool,

    pub is_shuffle: bool,

    pub repeat_mode: RepeatMode,

    /// Clamped to 0.5-2.0
    pub playback_rate: f32,

    /// Clamped to 0.0-1.0
    pub volume: f32,

    pub phase: PlaybackPhase,

    /// Video surface currently receiving playback
    pub active_surface: Option<SurfaceId>,
}

impl PlayerState {
    /// Empty state with the configured transport settings
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            queue: Vec::new(),
            current_index: 0,
            is_playing: false,
            position_ms: 0,
            duration_ms: 0,
            is_expanded: false,
            is_shuffle: config.shuffle,
            repeat_mode: config.repeat_mode,
            playback_rate: clamp_rate(config.playback_rate).unwrap_or(1.0),
            volume: clamp_volume(config.volume).unwrap_or(1.0),
            phase: PlaybackPhase::Idle,
            active_surface: None,
        }
    }

    /// Item at `current_index`, or `None` if the queue is empty
    pub fn current_item(&self) -> Option<&MediaItem> {
        self.queue.get(self.current_index)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, PlaybackPhase::Loading { .. })
    }

    pub fn is_ready(&self) -> bool {
        self.phase == PlaybackPhase::Ready
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new(&PlaybackConfig::default())
    }
}

/// What disabling shuffle does to the queue order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnshuffleBehavior {
    /// The shuffled order becomes the new baseline
    #[default]
    KeepOrder,

    /// Go back to the order the queue had before shuffling
    RestoreOriginal,
}

/// One-time background audio mode handed to the audio adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSessionMode {
    /// Duck or mix with other apps' audio
    MixWithOthers,

    /// Take over the audio session
    #[default]
    Exclusive,
}

/// Configuration for the playback controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Initial volume (0.0-1.0, default: 1.0)
    pub volume: f32,

    /// Initial playback rate (0.5-2.0, default: 1.0)
    pub playback_rate: f32,

    /// Initial repeat mode (default: Off)
    pub repeat_mode: RepeatMode,

    /// Initial shuffle flag (default: false)
    pub shuffle: bool,

    /// Status polling period for polled adapters (default: 500ms)
    pub status_interval_ms: u64,

    /// Upper bound on one backend load; `None` waits forever (default)
    pub load_timeout_ms: Option<u64>,

    /// Queue order after disabling shuffle (default: KeepOrder)
    pub unshuffle: UnshuffleBehavior,

    /// Start playing as soon as an item is loaded (default: true)
    pub autoplay: bool,

    /// Command mailbox capacity (default: 64)
    pub command_buffer: usize,

    /// Background audio mode (default: Exclusive)
    pub audio_session: AudioSessionMode,
}

impl PlaybackConfig {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms.max(1))
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            playback_rate: 1.0,
            repeat_mode: RepeatMode::Off,
            shuffle: false,
            status_interval_ms: 500,
            load_timeout_ms: None,
            unshuffle: UnshuffleBehavior::KeepOrder,
            autoplay: true,
            command_buffer: 64,
            audio_session: AudioSessionMode::Exclusive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlaybackConfig::default();
        assert_eq!(config.volume, 1.0);
        assert_eq!(config.playback_rate, 1.0);
        assert_eq!(config.repeat_mode, RepeatMode::Off);
        assert!(!config.shuffle);
        assert_eq!(config.status_interval(), Duration::from_millis(500));
        assert_eq!(config.load_timeout(), None);
        assert!(config.autoplay);
    }

    #[test]
    fn repeat_mode_cycles() {
        assert_eq!(RepeatMode::Off.cycle(), RepeatMode::All);
        assert_eq!(RepeatMode::All.cycle(), RepeatMode::One);
        assert_eq!(RepeatMode::One.cycle(), RepeatMode::Off);
    }

    #[test]
    fn initial_state_clamps_config() {
        let config = PlaybackConfig {
            volume: 3.0,
            playback_rate: 0.1,
            repeat_mode: RepeatMode::All,
            shuffle: true,
            ..Default::default()
        };

        let state = PlayerState::new(&config);
        assert_eq!(state.volume, 1.0);
        assert_eq!(state.playback_rate, 0.5);
        assert_eq!(state.repeat_mode, RepeatMode::All);
        assert!(state.is_shuffle);
        assert!(state.is_empty());
        assert!(state.current_item().is_none());
        assert_eq!(state.phase, PlaybackPhase::Idle);
    }

    #[test]
    fn current_item_follows_index() {
        let mut state = PlayerState::default();
        state.queue = vec![
            MediaItem::audio("a", "A", "https://cdn.example.com/a.mp3"),
            MediaItem::video("b", "B", "https://cdn.example.com/b.mp4"),
        ];
        state.current_index = 1;

        assert_eq!(state.current_item().map(|i| i.id.as_str()), Some("b"));
    }

    #[test]
    fn config_deserializes_partial() {
        let config: PlaybackConfig =
            serde_json::from_str(r#"{"repeat_mode": "all", "unshuffle": "restore_original"}"#)
                .unwrap();

        assert_eq!(config.repeat_mode, RepeatMode::All);
        assert_eq!(config.unshuffle, UnshuffleBehavior::RestoreOriginal);
        assert_eq!(config.status_interval_ms, 500);
    }

    #[test]
    fn state_serializes_camel_case() {
        let mut state = PlayerState::default();
        state.phase = PlaybackPhase::Loading {
            item_id: ItemId::new("x"),
        };

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["currentIndex"], 0);
        assert_eq!(json["repeatMode"], "off");
        assert_eq!(json["phase"]["kind"], "loading");
        assert_eq!(json["phase"]["itemId"], "x");
    }
}
