/// Core error types for Cadence
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for Cadence
#[derive(Error, Debug)]
pub enum CoreError {
    /// Record has no media URL, or the URL cannot be resolved
    #[error("Item {id} is not playable: {reason}")]
    NotPlayable { id: String, reason: String },

    /// Unknown media type string
    #[error("Unknown media type: {0}")]
    UnknownMediaType(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a not-playable error
    pub fn not_playable(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotPlayable {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
