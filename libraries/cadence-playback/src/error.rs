//! Error types for playback management

use cadence_core::ItemId;
use std::time::Duration;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Queue is empty
    #[error("Queue is empty")]
    QueueEmpty,

    /// Backend could not open the item
    #[error("Failed to load {item_id}: {reason}")]
    LoadFailed { item_id: ItemId, reason: String },

    /// Backend load did not settle within the configured bound
    #[error("Loading {item_id} timed out after {timeout:?}")]
    LoadTimedOut { item_id: ItemId, timeout: Duration },

    /// A newer item change replaced this one before it settled
    #[error("Superseded by a newer command")]
    Superseded,

    /// Transport call (play/pause/seek/rate/volume) failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Adapter-level failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// The controller task is gone
    #[error("Controller closed")]
    ControllerClosed,

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl PlaybackError {
    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
