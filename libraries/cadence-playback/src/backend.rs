//! Backend adapter abstraction
//!
//! Abstracts the audio engine and the video engine behind one capability
//! surface. The controller only picks which adapter to call based on the
//! item's [`MediaType`]; every transport rule above that is adapter-agnostic.

use crate::error::Result;
use crate::sink::StatusReporter;
use crate::surface::SurfaceId;
use crate::types::AudioSessionMode;
use async_trait::async_trait;
use cadence_core::{ItemId, MediaType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to one loaded backend instance
///
/// Unique across both adapters for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Mint a fresh handle
    pub fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// Transport snapshot reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackendStatus {
    pub loaded: bool,
    pub playing: bool,
    pub position_ms: u64,

    /// 0 while unknown
    pub duration_ms: u64,

    /// The item reached its end
    pub finished: bool,
}

/// How status reaches the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDelivery {
    /// The controller polls `status()` on its status interval
    Polled,

    /// The adapter pushes snapshots through its [`StatusReporter`]
    Pushed,
}

/// What to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub item_id: ItemId,
    pub url: String,
}

/// Uniform capability surface implemented once per media type
///
/// Every call is a suspension point; implementors must not block the
/// executor.
#[async_trait]
pub trait MediaAdapter: Send + Sync {
    /// How this adapter delivers status
    fn delivery(&self) -> StatusDelivery;

    /// One-time platform session setup, called when the controller starts
    async fn configure_session(&self, mode: AudioSessionMode) -> Result<()> {
        let _ = mode;
        Ok(())
    }

    /// Open `request.url` and return a handle to the new instance
    ///
    /// `reporter` is bound to this load; pushed snapshots and the video
    /// ready-for-display notification go through it.
    async fn load(&self, request: LoadRequest, reporter: StatusReporter) -> Result<Handle>;

    /// Release the instance; the handle is dead afterwards
    async fn unload(&self, handle: Handle) -> Result<()>;

    async fn play(&self, handle: Handle) -> Result<()>;

    async fn pause(&self, handle: Handle) -> Result<()>;

    async fn seek(&self, handle: Handle, position_ms: u64) -> Result<()>;

    async fn set_rate(&self, handle: Handle, rate: f32) -> Result<()>;

    async fn set_volume(&self, handle: Handle, level: f32) -> Result<()>;

    async fn status(&self, handle: Handle) -> Result<BackendStatus>;

    /// Point the instance at a rendering surface (video only)
    async fn attach_surface(&self, handle: Handle, surface: Option<SurfaceId>) -> Result<()> {
        let _ = (handle, surface);
        Ok(())
    }
}

/// The live backend instance, tagged by media type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Audio(Handle),
    Video(Handle),
}

impl Backend {
    pub fn new(kind: MediaType, handle: Handle) -> Self {
        match kind {
            MediaType::Audio => Self::Audio(handle),
            MediaType::Video => Self::Video(handle),
        }
    }

    pub fn kind(&self) -> MediaType {
        match self {
            Self::Audio(_) => MediaType::Audio,
            Self::Video(_) => MediaType::Video,
        }
    }

    pub fn handle(&self) -> Handle {
        match self {
            Self::Audio(h) | Self::Video(h) => *h,
        }
    }
}

/// The pair of adapters a controller drives
#[derive(Clone)]
pub struct Adapters {
    audio: Arc<dyn MediaAdapter>,
    video: Arc<dyn MediaAdapter>,
}

impl Adapters {
    pub fn new(audio: Arc<dyn MediaAdapter>, video: Arc<dyn MediaAdapter>) -> Self {
        Self { audio, video }
    }

    pub fn audio(&self) -> &Arc<dyn MediaAdapter> {
        &self.audio
    }

    /// The single media-type dispatch point
    pub fn for_kind(&self, kind: MediaType) -> &Arc<dyn MediaAdapter> {
        match kind {
            MediaType::Audio => &self.audio,
            MediaType::Video => &self.video,
        }
    }
}

impl fmt::Debug for Adapters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapters")
            .field("audio", &self.audio.delivery())
            .field("video", &self.video.delivery())
            .finish()
    }
}
