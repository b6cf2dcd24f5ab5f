//! Headless audio adapter
//!
//! Emulates an audio engine with a [`Timeline`] per loaded item. Status is
//! polled by the controller.

use crate::error::BackendError;
use crate::probe::MediaProbe;
use crate::timeline::Timeline;
use async_trait::async_trait;
use cadence_playback::{
    AudioSessionMode, BackendStatus, Handle, LoadRequest, MediaAdapter, Result, StatusDelivery,
    StatusReporter,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

struct AudioInstance {
    url: String,
    timeline: Timeline,
    volume: f32,
}

/// Clock-driven audio backend
pub struct ClockAudioAdapter {
    probe: Arc<dyn MediaProbe>,
    instances: Mutex<HashMap<Handle, AudioInstance>>,
    session: Mutex<Option<AudioSessionMode>>,
}

impl ClockAudioAdapter {
    pub fn new(probe: Arc<dyn MediaProbe>) -> Self {
        Self {
            probe,
            instances: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
        }
    }

    /// Mode set by `configure_session`, if it ran
    pub async fn session_mode(&self) -> Option<AudioSessionMode> {
        *self.session.lock().await
    }

    /// Number of loaded instances
    pub async fn loaded(&self) -> usize {
        self.instances.lock().await.len()
    }

    /// Volume applied to an instance
    pub async fn volume(&self, handle: Handle) -> Option<f32> {
        self.instances.lock().await.get(&handle).map(|i| i.volume)
    }

    async fn with_instance<T>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut AudioInstance) -> T + Send,
    ) -> Result<T> {
        let mut instances = self.instances.lock().await;
        let instance = instances
            .get_mut(&handle)
            .ok_or(BackendError::UnknownHandle(handle))?;
        Ok(f(instance))
    }
}

#[async_trait]
impl MediaAdapter for ClockAudioAdapter {
    fn delivery(&self) -> StatusDelivery {
        StatusDelivery::Polled
    }

    async fn configure_session(&self, mode: AudioSessionMode) -> Result<()> {
        info!(mode = ?mode, "Audio session configured");
        *self.session.lock().await = Some(mode);
        Ok(())
    }

    async fn load(&self, request: LoadRequest, _reporter: StatusReporter) -> Result<Handle> {
        let info = self.probe.probe(&request.url).await?;
        let handle = Handle::next();

        debug!(%handle, item_id = %request.item_id, duration_ms = info.duration_ms, "Audio loaded");
        self.instances.lock().await.insert(
            handle,
            AudioInstance {
                url: request.url,
                timeline: Timeline::new(info.duration_ms),
                volume: 1.0,
            },
        );
        Ok(handle)
    }

    async fn unload(&self, handle: Handle) -> Result<()> {
        let instance = self
            .instances
            .lock()
            .await
            .remove(&handle)
            .ok_or(BackendError::UnknownHandle(handle))?;
        debug!(%handle, url = %instance.url, "Audio unloaded");
        Ok(())
    }

    async fn play(&self, handle: Handle) -> Result<()> {
        self.with_instance(handle, |i| i.timeline.play()).await
    }

    async fn pause(&self, handle: Handle) -> Result<()> {
        self.with_instance(handle, |i| i.timeline.pause()).await
    }

    async fn seek(&self, handle: Handle, position_ms: u64) -> Result<()> {
        self.with_instance(handle, |i| i.timeline.seek(position_ms))
            .await
    }

    async fn set_rate(&self, handle: Handle, rate: f32) -> Result<()> {
        self.with_instance(handle, |i| i.timeline.set_rate(rate))
            .await
    }

    async fn set_volume(&self, handle: Handle, level: f32) -> Result<()> {
        self.with_instance(handle, |i| i.volume = level).await
    }

    async fn status(&self, handle: Handle) -> Result<BackendStatus> {
        self.with_instance(handle, |i| i.timeline.status()).await
    }
}
