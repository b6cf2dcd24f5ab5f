//! Backend-specific errors

use cadence_playback::{Handle, PlaybackError};
use thiserror::Error;

/// Result type alias using `BackendError`
pub type Result<T> = std::result::Result<T, BackendError>;

/// Backend error types
#[derive(Error, Debug)]
pub enum BackendError {
    /// Handle was never issued or already unloaded
    #[error("Unknown handle: {0}")]
    UnknownHandle(Handle),

    /// No probe entry for this URL
    #[error("Media not found: {0}")]
    NotFound(String),

    /// URL scheme the probe cannot read
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    /// Container or codec could not be read
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Blocking probe task failed
    #[error("Probe task failed: {0}")]
    Task(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<BackendError> for PlaybackError {
    fn from(err: BackendError) -> Self {
        PlaybackError::backend(err.to_string())
    }
}
