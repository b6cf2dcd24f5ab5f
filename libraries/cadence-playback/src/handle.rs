//! Presentation-facing handle to a running controller

use crate::controller::{Command, Reply};
use crate::error::{PlaybackError, Result};
use crate::events::PlayerEvent;
use crate::surface::{SurfaceId, SurfaceRole};
use crate::types::{PlayerState, RepeatMode};
use cadence_core::MediaItem;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::debug;

/// Cloneable handle to a [`crate::PlayerController`]
///
/// Commands resolve once the controller has acted on them. Item changes
/// (`play_queue`, skips, a reload through `toggle_play_pause`) resolve when
/// the load settles: `Ok` once the new item is ready, the load error if it
/// failed, or [`PlaybackError::Superseded`] if a newer item change replaced it
/// first.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<PlayerState>,
    events: broadcast::Sender<PlayerEvent>,
}

impl PlayerHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        state: watch::Receiver<PlayerState>,
        events: broadcast::Sender<PlayerEvent>,
    ) -> Self {
        Self {
            commands,
            state,
            events,
        }
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| PlaybackError::ControllerClosed)?;
        rx.await.map_err(|_| PlaybackError::ControllerClosed)?
    }

    /// Replace the queue and start at `start_index` (clamped)
    pub async fn play_queue(&self, items: Vec<MediaItem>, start_index: usize) -> Result<()> {
        debug!(len = items.len(), start_index, "play_queue");
        self.request(|reply| Command::PlayQueue {
            items,
            start_index,
            reply,
        })
        .await
    }

    /// Pause if the backend reports playing, otherwise play
    ///
    /// After a failed load this reloads the current item instead.
    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.request(|reply| Command::TogglePlayPause { reply }).await
    }

    /// Seek the current item; negative positions clamp to 0
    pub async fn seek_to(&self, position_ms: i64) -> Result<()> {
        self.request(|reply| Command::SeekTo { position_ms, reply })
            .await
    }

    pub async fn skip_next(&self) -> Result<()> {
        self.request(|reply| Command::SkipNext { reply }).await
    }

    pub async fn skip_prev(&self) -> Result<()> {
        self.request(|reply| Command::SkipPrevious { reply }).await
    }

    pub async fn set_shuffle(&self, enabled: bool) -> Result<()> {
        self.request(|reply| Command::SetShuffle { enabled, reply })
            .await
    }

    /// Flip shuffle; returns the new flag
    pub async fn toggle_shuffle(&self) -> Result<bool> {
        self.request(|reply| Command::ToggleShuffle { reply }).await
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.request(|reply| Command::SetRepeatMode { mode, reply })
            .await
    }

    /// Advance `off → all → one → off`; returns the new mode
    pub async fn cycle_repeat_mode(&self) -> Result<RepeatMode> {
        self.request(|reply| Command::CycleRepeatMode { reply }).await
    }

    /// Set the rate, clamped to 0.5-2.0; returns the applied value
    pub async fn set_playback_rate(&self, rate: f32) -> Result<f32> {
        self.request(|reply| Command::SetPlaybackRate { rate, reply })
            .await
    }

    /// Set the volume, clamped to 0.0-1.0; returns the applied value
    pub async fn set_volume(&self, level: f32) -> Result<f32> {
        self.request(|reply| Command::SetVolume { level, reply })
            .await
    }

    pub async fn set_expanded(&self, expanded: bool) -> Result<()> {
        self.request(|reply| Command::SetExpanded { expanded, reply })
            .await
    }

    /// Register a rendering surface
    pub async fn mount_surface(&self, role: SurfaceRole) -> Result<SurfaceId> {
        self.request(|reply| Command::MountSurface { role, reply })
            .await
    }

    pub async fn unmount_surface(&self, surface: SurfaceId) -> Result<()> {
        self.request(|reply| Command::UnmountSurface { surface, reply })
            .await
    }

    /// Claim or release playback for an inline surface
    pub async fn set_inline_active(&self, surface: SurfaceId, active: bool) -> Result<()> {
        self.request(|reply| Command::SetInlineActive {
            surface,
            active,
            reply,
        })
        .await
    }

    /// Tear down the live backend and reset state
    pub async fn close(&self) -> Result<()> {
        self.request(|reply| Command::Close { reply }).await
    }

    /// Close and stop the controller; later calls fail with `ControllerClosed`
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// Latest published state
    pub fn state(&self) -> PlayerState {
        self.state.borrow().clone()
    }

    /// The item at `current_index`, if any
    pub fn current_item(&self) -> Option<MediaItem> {
        self.state.borrow().current_item().cloned()
    }

    /// State receiver for change notifications
    pub fn watch(&self) -> watch::Receiver<PlayerState> {
        self.state.clone()
    }

    /// Subscribe to events emitted from now on
    pub fn events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}
