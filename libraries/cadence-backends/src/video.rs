//! Headless video adapter
//!
//! Like the audio adapter, a [`Timeline`] stands in for the decoder. Status is
//! pushed: every transport call reports immediately, and a per-instance ticker
//! reports while the position moves, so the end of the item is noticed
//! without polling. Frame size is announced once after load.

use crate::error::BackendError;
use crate::probe::MediaProbe;
use crate::timeline::Timeline;
use async_trait::async_trait;
use cadence_playback::{
    BackendStatus, Handle, LoadRequest, MediaAdapter, Result, StatusDelivery, StatusReporter,
    SurfaceId,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, trace};

/// Default push period while playing
pub const DEFAULT_PUSH_INTERVAL: Duration = Duration::from_millis(250);

struct VideoInstance {
    url: String,
    timeline: Arc<Mutex<Timeline>>,
    reporter: StatusReporter,
    surface: Option<SurfaceId>,
    volume: f32,
    ticker: JoinHandle<()>,
}

impl Drop for VideoInstance {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

/// Clock-driven video backend
pub struct ClockVideoAdapter {
    probe: Arc<dyn MediaProbe>,
    push_interval: Duration,
    instances: Mutex<HashMap<Handle, VideoInstance>>,
}

impl ClockVideoAdapter {
    pub fn new(probe: Arc<dyn MediaProbe>) -> Self {
        Self::with_push_interval(probe, DEFAULT_PUSH_INTERVAL)
    }

    pub fn with_push_interval(probe: Arc<dyn MediaProbe>, push_interval: Duration) -> Self {
        Self {
            probe,
            push_interval,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Surface an instance renders to
    pub async fn surface(&self, handle: Handle) -> Option<SurfaceId> {
        self.instances
            .lock()
            .await
            .get(&handle)
            .and_then(|i| i.surface)
    }

    pub async fn volume(&self, handle: Handle) -> Option<f32> {
        self.instances.lock().await.get(&handle).map(|i| i.volume)
    }

    pub async fn loaded(&self) -> usize {
        self.instances.lock().await.len()
    }

    /// Apply `change` to the instance's timeline and push the result
    async fn transport(&self, handle: Handle, change: impl FnOnce(&mut Timeline) + Send) -> Result<()> {
        let (timeline, reporter) = {
            let instances = self.instances.lock().await;
            let instance = instances
                .get(&handle)
                .ok_or(BackendError::UnknownHandle(handle))?;
            (Arc::clone(&instance.timeline), instance.reporter.clone())
        };

        // Report under the lock so pushes leave in the order they happened
        let mut timeline = timeline.lock().await;
        change(&mut timeline);
        reporter.report(timeline.status());
        Ok(())
    }
}

/// Push status while it changes, until the controller goes away
fn spawn_ticker(
    handle: Handle,
    timeline: Arc<Mutex<Timeline>>,
    reporter: StatusReporter,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<BackendStatus> = None;

        loop {
            ticker.tick().await;
            let guard = timeline.lock().await;
            let status = guard.status();
            if last == Some(status) {
                continue;
            }
            last = Some(status);

            trace!(%handle, position_ms = status.position_ms, "Pushing video status");
            if !reporter.report(status) {
                break;
            }
        }
    })
}

#[async_trait]
impl MediaAdapter for ClockVideoAdapter {
    fn delivery(&self) -> StatusDelivery {
        StatusDelivery::Pushed
    }

    async fn load(&self, request: LoadRequest, reporter: StatusReporter) -> Result<Handle> {
        let info = self.probe.probe(&request.url).await?;
        let handle = Handle::next();
        let timeline = Arc::new(Mutex::new(Timeline::new(info.duration_ms)));

        let ticker = spawn_ticker(
            handle,
            Arc::clone(&timeline),
            reporter.clone(),
            self.push_interval,
        );
        self.instances.lock().await.insert(
            handle,
            VideoInstance {
                url: request.url,
                timeline,
                reporter: reporter.clone(),
                surface: None,
                volume: 1.0,
                ticker,
            },
        );

        debug!(%handle, item_id = %request.item_id, duration_ms = info.duration_ms, "Video loaded");
        if let Some((width, height)) = info.dimensions {
            reporter.ready_for_display(width, height);
        }
        Ok(handle)
    }

    async fn unload(&self, handle: Handle) -> Result<()> {
        let instance = self
            .instances
            .lock()
            .await
            .remove(&handle)
            .ok_or(BackendError::UnknownHandle(handle))?;
        debug!(%handle, url = %instance.url, "Video unloaded");
        Ok(())
    }

    async fn play(&self, handle: Handle) -> Result<()> {
        self.transport(handle, Timeline::play).await
    }

    async fn pause(&self, handle: Handle) -> Result<()> {
        self.transport(handle, Timeline::pause).await
    }

    async fn seek(&self, handle: Handle, position_ms: u64) -> Result<()> {
        self.transport(handle, |t| t.seek(position_ms)).await
    }

    async fn set_rate(&self, handle: Handle, rate: f32) -> Result<()> {
        self.transport(handle, |t| t.set_rate(rate)).await
    }

    async fn set_volume(&self, handle: Handle, level: f32) -> Result<()> {
        let mut instances = self.instances.lock().await;
        let instance = instances
            .get_mut(&handle)
            .ok_or(BackendError::UnknownHandle(handle))?;
        instance.volume = level;
        Ok(())
    }

    async fn status(&self, handle: Handle) -> Result<BackendStatus> {
        let timeline = self
            .instances
            .lock()
            .await
            .get(&handle)
            .map(|i| Arc::clone(&i.timeline))
            .ok_or(BackendError::UnknownHandle(handle))?;
        let status = timeline.lock().await.status();
        Ok(status)
    }

    async fn attach_surface(&self, handle: Handle, surface: Option<SurfaceId>) -> Result<()> {
        let mut instances = self.instances.lock().await;
        let instance = instances
            .get_mut(&handle)
            .ok_or(BackendError::UnknownHandle(handle))?;
        debug!(%handle, surface = ?surface, "Video surface attached");
        instance.surface = surface;
        Ok(())
    }
}
