//! Cadence - Playback Management
//!
//! Queue and transport control for a mixed audio/video player.
//!
//! This crate provides:
//! - A single-writer controller task owning [`PlayerState`]
//! - Queue navigation with wraparound, repeat modes and auto-advance
//! - Shuffle that keeps the current item pinned at the front
//! - A status sink that discards callbacks from torn-down backend instances
//! - Clamped playback rate (0.5-2.0) and volume (0.0-1.0)
//! - Video surface arbitration between expanded and inline hosts
//!
//! # Architecture
//!
//! `cadence-playback` knows nothing about decoders or platforms. Audio and
//! video engines plug in through the [`MediaAdapter`] trait; the controller
//! picks one per item by [`cadence_core::MediaType`] and keeps at most one
//! instance alive.
//!
//! ```text
//! PlayerHandle ──commands──▶ controller task ──ops──▶ backend driver ──▶ MediaAdapter
//!      ▲                        │      ▲                    │
//!      └──── watch / events ────┘      └── status, settles ─┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_core::MediaItem;
//! use cadence_playback::{Adapters, PlaybackConfig, PlayerController, RepeatMode};
//!
//! async fn listen(adapters: Adapters) -> cadence_playback::Result<()> {
//!     let player = PlayerController::spawn(PlaybackConfig::default(), adapters);
//!
//!     let queue = vec![
//!         MediaItem::audio("ep-1", "Episode 1", "https://cdn.example.com/ep-1.mp3"),
//!         MediaItem::video("ep-2", "Episode 2", "https://cdn.example.com/ep-2.mp4"),
//!     ];
//!
//!     // Resolves once "ep-1" is loaded
//!     player.play_queue(queue, 0).await?;
//!
//!     player.set_repeat_mode(RepeatMode::All).await?;
//!     player.set_playback_rate(1.5).await?;
//!     player.skip_next().await?;
//!
//!     let state = player.state();
//!     assert_eq!(state.current_index, 1);
//!
//!     player.close().await
//! }
//! ```

mod backend;
mod controller;
mod driver;
mod error;
mod events;
mod handle;
pub mod levels;
pub mod queue;
pub mod shuffle;
mod sink;
mod surface;
pub mod types;

// Public exports
pub use backend::{Adapters, Backend, BackendStatus, Handle, LoadRequest, MediaAdapter, StatusDelivery};
pub use controller::PlayerController;
pub use error::{PlaybackError, Result};
pub use events::PlayerEvent;
pub use handle::PlayerHandle;
pub use sink::{SessionId, StatusReceiver, StatusReport, StatusReporter, StatusSender};
pub use surface::{SurfaceId, SurfaceRole};
pub use types::{
    AudioSessionMode, PlaybackConfig, PlaybackPhase, PlayerState, RepeatMode, UnshuffleBehavior,
};
