//! Player Events
//!
//! Event-based notifications for presentation, alongside the watched
//! [`crate::PlayerState`]. Events are emitted at key points:
//! - Item changes (a load settled)
//! - Load failures
//! - End of track and end of queue
//! - Video ready-for-display and surface assignment

use crate::surface::SurfaceId;
use cadence_core::ItemId;
use serde::{Deserialize, Serialize};

/// Events emitted by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// A new item is loaded and current
    ItemChanged {
        item_id: ItemId,
        previous_item_id: Option<ItemId>,
    },

    /// Loading an item failed; the previous item stays current
    LoadFailed { item_id: ItemId, message: String },

    /// The current item reached its end
    TrackFinished { item_id: ItemId },

    /// Last item finished with repeat off; playback stopped
    QueueEnded,

    /// Video frame dimensions are known
    ///
    /// Used by presentation to compute aspect ratio.
    VideoReady {
        item_id: ItemId,
        width: u32,
        height: u32,
    },

    /// The surface receiving video changed
    SurfaceChanged { surface: Option<SurfaceId> },

    /// The session was closed and state reset
    Closed,
}

impl PlayerEvent {
    /// Aspect ratio for a [`PlayerEvent::VideoReady`] event
    pub fn aspect_ratio(&self) -> Option<f32> {
        match self {
            Self::VideoReady { width, height, .. } if *height > 0 => {
                Some(*width as f32 / *height as f32)
            }
            _ => None,
        }
    }
}
