//! Cadence Backends
//!
//! Headless [`MediaAdapter`](cadence_playback::MediaAdapter) implementations.
//!
//! Neither adapter decodes or renders; each loaded item is a virtual
//! [`Timeline`] whose length comes from a [`MediaProbe`]. They drive the
//! controller exactly like platform engines would:
//! - [`ClockAudioAdapter`]: polled status
//! - [`ClockVideoAdapter`]: pushed status and a ready-for-display announcement
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_backends::{clock_adapters, MediaInfo, StaticProbe};
//! use cadence_playback::{PlaybackConfig, PlayerController};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let probe = StaticProbe::new().with_fallback(MediaInfo::audio(180_000));
//! let player = PlayerController::spawn(PlaybackConfig::default(), clock_adapters(Arc::new(probe)));
//! # }
//! ```

pub mod audio;
pub mod error;
pub mod probe;
pub mod timeline;
pub mod video;

pub use audio::ClockAudioAdapter;
pub use error::{BackendError, Result};
pub use probe::{MediaInfo, MediaProbe, StaticProbe, SymphoniaProbe};
pub use timeline::Timeline;
pub use video::ClockVideoAdapter;

use cadence_playback::Adapters;
use std::sync::Arc;

/// Audio and video clock adapters sharing one probe
pub fn clock_adapters(probe: Arc<dyn MediaProbe>) -> Adapters {
    Adapters::new(
        Arc::new(ClockAudioAdapter::new(Arc::clone(&probe))),
        Arc::new(ClockVideoAdapter::new(probe)),
    )
}
