//! Backend driver
//!
//! Owns the single live backend instance and executes adapter calls one at a
//! time, in the order the controller issued them. Because ops are sequential
//! the previous instance is always unloaded before the next one is created.
//!
//! The driver never touches [`crate::PlayerState`]. Load outcomes and
//! transport results go back to the controller as [`DriverSignal`]s; status
//! snapshots go through the shared status channel like pushed ones do.

use crate::backend::{Adapters, Backend, BackendStatus, Handle, LoadRequest, MediaAdapter, StatusDelivery};
use crate::error::{PlaybackError, Result};
use crate::sink::{SessionId, StatusReport, StatusReporter, StatusSender};
use crate::surface::SurfaceId;
use crate::types::AudioSessionMode;
use cadence_core::{MediaItem, MediaType};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// Completion of a forwarded command
pub(crate) type Ack = oneshot::Sender<Result<()>>;

/// Most recent session the controller asked for
///
/// Written by the controller before it issues an op, read by the driver to
/// skip, abandon or discard loads that were superseded while queued or in
/// flight.
#[derive(Debug, Clone)]
pub(crate) struct LatestSession(Arc<watch::Sender<u64>>);

impl Default for LatestSession {
    fn default() -> Self {
        Self(Arc::new(watch::channel(0).0))
    }
}

impl LatestSession {
    pub(crate) fn set(&self, session: SessionId) {
        self.0.send_replace(session.as_u64());
    }

    pub(crate) fn is_current(&self, session: SessionId) -> bool {
        *self.0.borrow() == session.as_u64()
    }

    /// Resolves once `session` is no longer the latest
    pub(crate) async fn superseded(&self, session: SessionId) {
        let mut latest = self.0.subscribe();
        // A closed channel means the controller is gone, which supersedes too
        let _ = latest.wait_for(|raw| *raw != session.as_u64()).await;
    }
}

/// Work for the driver
pub(crate) enum DriverOp {
    ConfigureSession(AudioSessionMode),

    /// Tear down the live instance and load `item` under `session`
    Switch {
        session: SessionId,
        item: MediaItem,
        autoplay: bool,
    },

    /// Pause if playing, otherwise play (rewinding a finished item first)
    TogglePlayPause { session: SessionId, ack: Ack },

    /// Seek to 0 and play
    Replay { session: SessionId },

    Seek {
        session: SessionId,
        position_ms: u64,
        ack: Ack,
    },

    SetRate(f32),

    SetVolume(f32),

    AttachSurface(Option<SurfaceId>),

    /// Unload the live instance, if any
    Teardown { ack: Option<Ack> },

    /// Unload and stop the driver
    Shutdown { ack: Option<Ack> },
}

/// Results reported back to the controller
pub(crate) enum DriverSignal {
    /// A `Switch` settled
    Loaded {
        session: SessionId,
        result: Result<BackendStatus>,
    },

    /// A transport op ran; `playing` is the resulting play state when known
    Transport {
        session: SessionId,
        playing: Option<bool>,
        ack: Option<Ack>,
    },
}

struct LiveBackend {
    session: SessionId,
    backend: Backend,
    adapter: Arc<dyn MediaAdapter>,
}

pub(crate) struct BackendDriver {
    adapters: Adapters,
    live: Option<LiveBackend>,
    latest: LatestSession,
    rate: f32,
    volume: f32,
    surface: Option<SurfaceId>,
    status_interval: Duration,
    load_timeout: Option<Duration>,
    status_tx: StatusSender,
    signals: mpsc::UnboundedSender<DriverSignal>,
}

/// Driver settings taken from the controller's config at spawn
pub(crate) struct DriverSettings {
    pub(crate) rate: f32,
    pub(crate) volume: f32,
    pub(crate) status_interval: Duration,
    pub(crate) load_timeout: Option<Duration>,
}

impl BackendDriver {
    pub(crate) fn new(
        adapters: Adapters,
        latest: LatestSession,
        settings: DriverSettings,
        status_tx: StatusSender,
        signals: mpsc::UnboundedSender<DriverSignal>,
    ) -> Self {
        Self {
            adapters,
            live: None,
            latest,
            rate: settings.rate,
            volume: settings.volume,
            surface: None,
            status_interval: settings.status_interval,
            load_timeout: settings.load_timeout,
            status_tx,
            signals,
        }
    }

    /// Process ops until shutdown or until the controller drops its sender
    pub(crate) async fn run(mut self, mut ops: mpsc::UnboundedReceiver<DriverOp>) {
        let mut ticker = interval(self.status_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                op = ops.recv() => match op {
                    Some(op @ DriverOp::Shutdown { .. }) => {
                        self.handle(op).await;
                        break;
                    }
                    Some(op) => self.handle(op).await,
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                _ = ticker.tick(), if self.polls() => self.poll().await,
            }
        }

        debug!("Backend driver stopped");
    }

    async fn handle(&mut self, op: DriverOp) {
        match op {
            DriverOp::ConfigureSession(mode) => {
                if let Err(e) = self.adapters.audio().configure_session(mode).await {
                    warn!(mode = ?mode, error = %e, "Audio session configuration failed");
                } else {
                    debug!(mode = ?mode, "Audio session configured");
                }
            }
            DriverOp::Switch {
                session,
                item,
                autoplay,
            } => self.switch(session, item, autoplay).await,
            DriverOp::TogglePlayPause { session, ack } => self.toggle(session, ack).await,
            DriverOp::Replay { session } => self.replay(session).await,
            DriverOp::Seek {
                session,
                position_ms,
                ack,
            } => self.seek(session, position_ms, ack).await,
            DriverOp::SetRate(rate) => {
                self.rate = rate;
                if let Some((adapter, handle)) = self.live_instance() {
                    if let Err(e) = adapter.set_rate(handle, rate).await {
                        warn!(%handle, rate, error = %e, "Failed to set playback rate");
                    }
                }
            }
            DriverOp::SetVolume(level) => {
                self.volume = level;
                if let Some((adapter, handle)) = self.live_instance() {
                    if let Err(e) = adapter.set_volume(handle, level).await {
                        warn!(%handle, level, error = %e, "Failed to set volume");
                    }
                }
            }
            DriverOp::AttachSurface(surface) => {
                self.surface = surface;
                if let Some(live) = &self.live {
                    if let Backend::Video(handle) = live.backend {
                        let adapter = Arc::clone(&live.adapter);
                        attach(&*adapter, handle, surface).await;
                    }
                }
            }
            DriverOp::Teardown { ack } | DriverOp::Shutdown { ack } => {
                self.teardown().await;
                if let Some(ack) = ack {
                    let _ = ack.send(Ok(()));
                }
            }
        }
    }

    async fn switch(&mut self, session: SessionId, item: MediaItem, autoplay: bool) {
        self.teardown().await;

        if !self.latest.is_current(session) {
            debug!(%session, item_id = %item.id, "Skipping load for superseded session");
            self.signal(DriverSignal::Loaded {
                session,
                result: Err(PlaybackError::Superseded),
            });
            return;
        }

        let adapter = Arc::clone(self.adapters.for_kind(item.media_type));
        let request = LoadRequest {
            item_id: item.id.clone(),
            url: item.media_url.clone(),
        };
        let reporter = StatusReporter::new(session, self.status_tx.clone());

        debug!(%session, item_id = %item.id, kind = %item.media_type, url = %item.media_url, "Loading item");

        let load_adapter = Arc::clone(&adapter);
        let load_timeout = self.load_timeout;
        let item_id = item.id.clone();
        let mut load = Box::pin(async move {
            let pending = load_adapter.load(request, reporter);
            match load_timeout {
                Some(limit) => tokio::time::timeout(limit, pending).await.unwrap_or_else(|_| {
                    Err(PlaybackError::LoadTimedOut {
                        item_id,
                        timeout: limit,
                    })
                }),
                None => pending.await,
            }
        });

        // A hung load must not hold up the ops queued behind it
        let loaded = tokio::select! {
            biased;

            result = &mut load => result.map_err(|e| load_failed(&item, e)),
            () = self.latest.superseded(session) => {
                debug!(%session, item_id = %item.id, "Abandoning in-flight load for superseded session");
                tokio::spawn(async move {
                    if let Ok(handle) = load.await {
                        debug!(%handle, "Abandoned load settled, unloading");
                        if let Err(e) = adapter.unload(handle).await {
                            warn!(%handle, error = %e, "Failed to unload abandoned instance");
                        }
                    }
                });
                self.signal(DriverSignal::Loaded {
                    session,
                    result: Err(PlaybackError::Superseded),
                });
                return;
            }
        };

        let handle = match loaded {
            Ok(handle) => handle,
            Err(e) => {
                warn!(%session, item_id = %item.id, error = %e, "Load failed");
                self.signal(DriverSignal::Loaded {
                    session,
                    result: Err(e),
                });
                return;
            }
        };

        if !self.latest.is_current(session) {
            debug!(%session, %handle, "Load settled after being superseded, unloading");
            if let Err(e) = adapter.unload(handle).await {
                warn!(%handle, error = %e, "Failed to unload superseded instance");
            }
            self.signal(DriverSignal::Loaded {
                session,
                result: Err(PlaybackError::Superseded),
            });
            return;
        }

        let backend = Backend::new(item.media_type, handle);
        self.live = Some(LiveBackend {
            session,
            backend,
            adapter: Arc::clone(&adapter),
        });

        if let Err(e) = adapter.set_rate(handle, self.rate).await {
            warn!(%handle, rate = self.rate, error = %e, "Failed to apply playback rate");
        }
        if let Err(e) = adapter.set_volume(handle, self.volume).await {
            warn!(%handle, level = self.volume, error = %e, "Failed to apply volume");
        }
        if item.media_type == MediaType::Video {
            attach(&*adapter, handle, self.surface).await;
        }
        if autoplay {
            if let Err(e) = adapter.play(handle).await {
                warn!(%handle, error = %e, "Autoplay failed");
            }
        }

        let status = adapter.status(handle).await.unwrap_or_else(|e| {
            debug!(%handle, error = %e, "Initial status unavailable");
            BackendStatus {
                loaded: true,
                ..BackendStatus::default()
            }
        });

        info!(%session, item_id = %item.id, %handle, kind = %item.media_type, "Item loaded");
        self.signal(DriverSignal::Loaded {
            session,
            result: Ok(status),
        });
    }

    async fn toggle(&mut self, session: SessionId, ack: Ack) {
        let Some((adapter, handle)) = self.instance_for(session) else {
            debug!(%session, "Toggle for a session that is not live, ignoring");
            self.signal(DriverSignal::Transport {
                session,
                playing: None,
                ack: Some(ack),
            });
            return;
        };

        let status = match adapter.status(handle).await {
            Ok(status) => status,
            Err(e) => {
                warn!(%handle, error = %e, "Status unavailable, toggle skipped");
                self.signal(DriverSignal::Transport {
                    session,
                    playing: None,
                    ack: Some(ack),
                });
                return;
            }
        };

        let result = if status.playing {
            adapter.pause(handle).await.map(|()| false)
        } else if status.finished {
            match adapter.seek(handle, 0).await {
                Ok(()) => adapter.play(handle).await.map(|()| true),
                Err(e) => Err(e),
            }
        } else {
            adapter.play(handle).await.map(|()| true)
        };

        let playing = match result {
            Ok(playing) => {
                debug!(%handle, playing, "Toggled play/pause");
                playing
            }
            Err(e) => {
                warn!(%handle, error = %e, "Play/pause failed");
                status.playing
            }
        };

        self.signal(DriverSignal::Transport {
            session,
            playing: Some(playing),
            ack: Some(ack),
        });
    }

    async fn replay(&mut self, session: SessionId) {
        let Some((adapter, handle)) = self.instance_for(session) else {
            return;
        };

        let result = match adapter.seek(handle, 0).await {
            Ok(()) => adapter.play(handle).await,
            Err(e) => Err(e),
        };

        let playing = match result {
            Ok(()) => {
                debug!(%handle, "Replaying from start");
                Some(true)
            }
            Err(e) => {
                warn!(%handle, error = %e, "Replay failed");
                None
            }
        };

        self.signal(DriverSignal::Transport {
            session,
            playing,
            ack: None,
        });
    }

    async fn seek(&mut self, session: SessionId, position_ms: u64, ack: Ack) {
        if let Some((adapter, handle)) = self.instance_for(session) {
            if let Err(e) = adapter.seek(handle, position_ms).await {
                warn!(%handle, position_ms, error = %e, "Seek failed");
            } else {
                trace!(%handle, position_ms, "Seeked");
            }
        } else {
            debug!(%session, "Seek for a session that is not live, ignoring");
        }

        self.signal(DriverSignal::Transport {
            session,
            playing: None,
            ack: Some(ack),
        });
    }

    async fn teardown(&mut self) {
        let Some(live) = self.live.take() else {
            return;
        };

        let handle = live.backend.handle();
        debug!(session = %live.session, %handle, kind = %live.backend.kind(), "Tearing down backend");
        if let Err(e) = live.adapter.unload(handle).await {
            warn!(%handle, error = %e, "Unload failed");
        }
    }

    async fn poll(&mut self) {
        let Some(live) = &self.live else {
            return;
        };
        let session = live.session;
        let handle = live.backend.handle();
        let adapter = Arc::clone(&live.adapter);

        match adapter.status(handle).await {
            Ok(status) => {
                trace!(%session, position_ms = status.position_ms, "Polled status");
                let _ = self.status_tx.send((session, StatusReport::Snapshot(status)));
            }
            Err(e) => debug!(%handle, error = %e, "Status poll failed"),
        }
    }

    fn polls(&self) -> bool {
        self.live
            .as_ref()
            .is_some_and(|live| live.adapter.delivery() == StatusDelivery::Polled)
    }

    fn live_instance(&self) -> Option<(Arc<dyn MediaAdapter>, Handle)> {
        self.live
            .as_ref()
            .map(|live| (Arc::clone(&live.adapter), live.backend.handle()))
    }

    fn instance_for(&self, session: SessionId) -> Option<(Arc<dyn MediaAdapter>, Handle)> {
        self.live
            .as_ref()
            .filter(|live| live.session == session)
            .map(|live| (Arc::clone(&live.adapter), live.backend.handle()))
    }

    fn signal(&self, signal: DriverSignal) {
        // Controller gone; pending acks drop and callers see ControllerClosed
        let _ = self.signals.send(signal);
    }
}

fn load_failed(item: &MediaItem, error: PlaybackError) -> PlaybackError {
    match error {
        e @ (PlaybackError::LoadFailed { .. } | PlaybackError::LoadTimedOut { .. }) => e,
        other => PlaybackError::LoadFailed {
            item_id: item.id.clone(),
            reason: other.to_string(),
        },
    }
}

async fn attach(adapter: &dyn MediaAdapter, handle: Handle, surface: Option<SurfaceId>) {
    match adapter.attach_surface(handle, surface).await {
        Ok(()) => debug!(%handle, surface = ?surface, "Surface attached"),
        Err(e) => warn!(%handle, error = %e, "Failed to attach surface"),
    }
}
