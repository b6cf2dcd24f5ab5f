//! Queue & Transport Controller
//!
//! A single task owns [`PlayerState`] and is the only writer of it. Commands
//! from [`PlayerHandle`]s, status snapshots from adapters and settle signals
//! from the backend driver are all serialized through its select loop, so
//! state transitions never interleave.
//!
//! Item changes are optimistic: the queue index moves and the state enters
//! `Loading` immediately, with a rollback snapshot kept until the driver
//! reports the load settled. A failed load restores the snapshot; a newer item
//! change supersedes the pending one and inherits its snapshot.

use crate::backend::{Adapters, BackendStatus};
use crate::driver::{BackendDriver, DriverOp, DriverSettings, DriverSignal, LatestSession};
use crate::error::{PlaybackError, Result};
use crate::events::PlayerEvent;
use crate::handle::PlayerHandle;
use crate::levels::{clamp_rate, clamp_seek, clamp_volume};
use crate::queue::{self, EndOfTrack};
use crate::shuffle::{restore_original, shuffle_keep_current};
use crate::sink::{SessionId, SinkOutcome, StatusReceiver, StatusReport, StatusSink};
use crate::surface::{SurfaceArbiter, SurfaceId, SurfaceRole};
use crate::types::{PlaybackConfig, PlaybackPhase, PlayerState, RepeatMode, UnshuffleBehavior};
use cadence_core::{ItemId, MediaItem};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

/// Broadcast capacity for [`PlayerEvent`]s
const EVENT_CAPACITY: usize = 64;

pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

/// Requests accepted by the controller task
pub(crate) enum Command {
    PlayQueue {
        items: Vec<MediaItem>,
        start_index: usize,
        reply: Reply<()>,
    },
    TogglePlayPause {
        reply: Reply<()>,
    },
    SeekTo {
        position_ms: i64,
        reply: Reply<()>,
    },
    SkipNext {
        reply: Reply<()>,
    },
    SkipPrevious {
        reply: Reply<()>,
    },
    SetShuffle {
        enabled: bool,
        reply: Reply<()>,
    },
    ToggleShuffle {
        reply: Reply<bool>,
    },
    SetRepeatMode {
        mode: RepeatMode,
        reply: Reply<()>,
    },
    CycleRepeatMode {
        reply: Reply<RepeatMode>,
    },
    SetPlaybackRate {
        rate: f32,
        reply: Reply<f32>,
    },
    SetVolume {
        level: f32,
        reply: Reply<f32>,
    },
    SetExpanded {
        expanded: bool,
        reply: Reply<()>,
    },
    MountSurface {
        role: SurfaceRole,
        reply: Reply<SurfaceId>,
    },
    UnmountSurface {
        surface: SurfaceId,
        reply: Reply<()>,
    },
    SetInlineActive {
        surface: SurfaceId,
        active: bool,
        reply: Reply<()>,
    },
    Close {
        reply: Reply<()>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

/// What a failed load restores
struct Rollback {
    queue: Vec<MediaItem>,
    current_index: usize,
    position_ms: u64,
    duration_ms: u64,
    is_shuffle: bool,
    original_order: Option<Vec<MediaItem>>,
}

/// An item change waiting for the driver to settle it
struct Transition {
    session: SessionId,
    rollback: Rollback,
    reply: Option<Reply<()>>,
}

/// The controller task
pub struct PlayerController {
    config: PlaybackConfig,
    state: PlayerState,
    sink: StatusSink,
    surfaces: SurfaceArbiter,

    /// Newest session issued; bumped on every load and on close
    session: SessionId,
    latest: LatestSession,

    /// Session of the item the driver is loading or has loaded
    target: Option<SessionId>,
    pending: Option<Transition>,

    /// Queue order before shuffle was turned on
    original_order: Option<Vec<MediaItem>>,

    /// Item of the last settled load
    last_item: Option<ItemId>,

    ops: mpsc::UnboundedSender<DriverOp>,
    state_tx: watch::Sender<PlayerState>,
    events: broadcast::Sender<PlayerEvent>,
}

impl PlayerController {
    /// Start the controller and its backend driver on the current runtime
    ///
    /// Configures the audio session once, before any load.
    pub fn spawn(config: PlaybackConfig, adapters: Adapters) -> PlayerHandle {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (op_tx, op_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let state = PlayerState::new(&config);
        let (state_tx, state_rx) = watch::channel(state.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let latest = LatestSession::default();

        let settings = DriverSettings {
            rate: state.playback_rate,
            volume: state.volume,
            status_interval: config.status_interval(),
            load_timeout: config.load_timeout(),
        };
        let driver = BackendDriver::new(adapters, latest.clone(), settings, status_tx, signal_tx);
        let _ = op_tx.send(DriverOp::ConfigureSession(config.audio_session));
        tokio::spawn(driver.run(op_rx));

        let controller = Self {
            config,
            state,
            sink: StatusSink::new(),
            surfaces: SurfaceArbiter::new(),
            session: SessionId::from_raw(0),
            latest,
            target: None,
            pending: None,
            original_order: None,
            last_item: None,
            ops: op_tx,
            state_tx,
            events: events.clone(),
        };
        tokio::spawn(controller.run(command_rx, status_rx, signal_rx));

        PlayerHandle::new(command_tx, state_rx, events)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut status_rx: StatusReceiver,
        mut signals: mpsc::UnboundedReceiver<DriverSignal>,
    ) {
        info!(
            status_interval_ms = self.config.status_interval_ms,
            shuffle = self.config.shuffle,
            repeat = ?self.config.repeat_mode,
            "Playback controller started"
        );

        loop {
            // Status before settles before commands: a snapshot is always
            // sent ahead of the driver signal that follows it
            tokio::select! {
                biased;

                Some((session, report)) = status_rx.recv() => self.on_status(session, report),
                Some(signal) = signals.recv() => self.on_signal(signal),
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.shutdown(Some(reply));
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All handles dropped");
                        self.shutdown(None);
                        break;
                    }
                },
            }
        }

        info!("Playback controller stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::PlayQueue {
                items,
                start_index,
                reply,
            } => self.play_queue(items, start_index, reply),
            Command::TogglePlayPause { reply } => self.toggle_play_pause(reply),
            Command::SeekTo { position_ms, reply } => self.seek_to(position_ms, reply),
            Command::SkipNext { reply } => {
                let next = queue::next_index(
                    self.state.queue.len(),
                    self.state.current_index,
                    self.state.repeat_mode,
                );
                self.skip_to(next, reply);
            }
            Command::SkipPrevious { reply } => {
                let previous =
                    queue::previous_index(self.state.queue.len(), self.state.current_index);
                self.skip_to(previous, reply);
            }
            Command::SetShuffle { enabled, reply } => {
                self.set_shuffle(enabled);
                let _ = reply.send(Ok(()));
            }
            Command::ToggleShuffle { reply } => {
                let enabled = !self.state.is_shuffle;
                self.set_shuffle(enabled);
                let _ = reply.send(Ok(enabled));
            }
            Command::SetRepeatMode { mode, reply } => {
                self.set_repeat_mode(mode);
                let _ = reply.send(Ok(()));
            }
            Command::CycleRepeatMode { reply } => {
                let mode = self.state.repeat_mode.cycle();
                self.set_repeat_mode(mode);
                let _ = reply.send(Ok(mode));
            }
            Command::SetPlaybackRate { rate, reply } => {
                let _ = reply.send(self.set_playback_rate(rate));
            }
            Command::SetVolume { level, reply } => {
                let _ = reply.send(self.set_volume(level));
            }
            Command::SetExpanded { expanded, reply } => {
                self.state.is_expanded = expanded;
                self.surfaces.set_expanded(expanded);
                self.refresh_surface();
                self.publish();
                let _ = reply.send(Ok(()));
            }
            Command::MountSurface { role, reply } => {
                let surface = self.surfaces.mount(role);
                debug!(%surface, role = ?role, "Surface mounted");
                self.refresh_surface();
                self.publish();
                let _ = reply.send(Ok(surface));
            }
            Command::UnmountSurface { surface, reply } => {
                let result = if self.surfaces.unmount(surface) {
                    debug!(%surface, "Surface unmounted");
                    self.refresh_surface();
                    self.publish();
                    Ok(())
                } else {
                    Err(PlaybackError::InvalidOperation(format!(
                        "{} is not mounted",
                        surface
                    )))
                };
                let _ = reply.send(result);
            }
            Command::SetInlineActive {
                surface,
                active,
                reply,
            } => {
                let result = if self.surfaces.set_inline_active(surface, active) {
                    self.refresh_surface();
                    self.publish();
                    Ok(())
                } else {
                    Err(PlaybackError::InvalidOperation(format!(
                        "{} is not a mounted inline surface",
                        surface
                    )))
                };
                let _ = reply.send(result);
            }
            Command::Close { reply } => {
                info!("Closing playback session");
                self.reset_session();
                self.send_op(DriverOp::Teardown { ack: Some(reply) });
                self.emit(PlayerEvent::Closed);
                self.publish();
            }
            Command::Shutdown { reply } => self.shutdown(Some(reply)),
        }
    }

    fn play_queue(&mut self, items: Vec<MediaItem>, start_index: usize, reply: Reply<()>) {
        if items.is_empty() {
            let _ = reply.send(Err(PlaybackError::QueueEmpty));
            return;
        }

        let index = queue::clamp_index(items.len(), start_index);
        debug!(len = items.len(), start_index, index, "Playing queue");

        if self.state.is_shuffle {
            let original = items.clone();
            let shuffled = shuffle_keep_current(items, index);
            self.begin_transition(shuffled, 0, self.config.autoplay, Some(reply));
            self.original_order = Some(original);
        } else {
            self.begin_transition(items, index, self.config.autoplay, Some(reply));
            self.original_order = None;
        }
    }

    fn skip_to(&mut self, index: Option<usize>, reply: Reply<()>) {
        let Some(index) = index else {
            debug!(current = self.state.current_index, "Nothing to skip to");
            let _ = reply.send(Ok(()));
            return;
        };

        let queue = self.state.queue.clone();
        self.begin_transition(queue, index, self.config.autoplay, Some(reply));
    }

    fn toggle_play_pause(&mut self, reply: Reply<()>) {
        if self.state.current_item().is_none() {
            let _ = reply.send(Ok(()));
            return;
        }

        match self.target {
            Some(session) => self.send_op(DriverOp::TogglePlayPause {
                session,
                ack: reply,
            }),
            None => {
                // No instance after a failed load; retry the current item
                debug!(index = self.state.current_index, "Reloading current item");
                let queue = self.state.queue.clone();
                let index = self.state.current_index;
                self.begin_transition(queue, index, true, Some(reply));
            }
        }
    }

    fn seek_to(&mut self, position_ms: i64, reply: Reply<()>) {
        let Some(session) = self.target else {
            let _ = reply.send(Ok(()));
            return;
        };

        let position_ms = clamp_seek(position_ms);
        if self.sink.is_live(session) {
            self.state.position_ms = if self.state.duration_ms > 0 {
                position_ms.min(self.state.duration_ms)
            } else {
                position_ms
            };
            self.publish();
        }

        self.send_op(DriverOp::Seek {
            session,
            position_ms,
            ack: reply,
        });
    }

    fn set_shuffle(&mut self, enabled: bool) {
        if enabled == self.state.is_shuffle {
            return;
        }
        self.state.is_shuffle = enabled;

        if enabled {
            if !self.state.queue.is_empty() {
                let original = std::mem::take(&mut self.state.queue);
                self.state.queue = shuffle_keep_current(original.clone(), self.state.current_index);
                self.state.current_index = 0;
                self.original_order = Some(original);
            }
        } else {
            let original = self.original_order.take();
            if let (UnshuffleBehavior::RestoreOriginal, Some(original)) = (self.config.unshuffle, original) {
                let current = self.state.current_item().map(|item| item.id.clone());
                let (queue, index) = restore_original(original, current.as_ref());
                self.state.queue = queue;
                self.state.current_index = index;
            }
        }

        debug!(enabled, index = self.state.current_index, "Shuffle changed");
        self.publish();
    }

    fn set_repeat_mode(&mut self, mode: RepeatMode) {
        debug!(mode = ?mode, "Repeat mode changed");
        self.state.repeat_mode = mode;
        self.publish();
    }

    fn set_playback_rate(&mut self, rate: f32) -> Result<f32> {
        let rate = clamp_rate(rate).ok_or_else(|| {
            warn!("Rejecting NaN playback rate");
            PlaybackError::InvalidOperation("playback rate is not a number".to_string())
        })?;

        self.state.playback_rate = rate;
        self.send_op(DriverOp::SetRate(rate));
        self.publish();
        Ok(rate)
    }

    fn set_volume(&mut self, level: f32) -> Result<f32> {
        let level = clamp_volume(level).ok_or_else(|| {
            warn!("Rejecting NaN volume");
            PlaybackError::InvalidOperation("volume is not a number".to_string())
        })?;

        self.state.volume = level;
        self.send_op(DriverOp::SetVolume(level));
        self.publish();
        Ok(level)
    }

    /// Optimistically move to `queue[index]` and ask the driver to load it
    fn begin_transition(
        &mut self,
        queue: Vec<MediaItem>,
        index: usize,
        autoplay: bool,
        reply: Option<Reply<()>>,
    ) {
        let rollback = match self.pending.take() {
            Some(previous) => {
                debug!(session = %previous.session, "Superseding pending load");
                if let Some(reply) = previous.reply {
                    let _ = reply.send(Err(PlaybackError::Superseded));
                }
                previous.rollback
            }
            None => Rollback {
                queue: self.state.queue.clone(),
                current_index: self.state.current_index,
                position_ms: self.state.position_ms,
                duration_ms: self.state.duration_ms,
                is_shuffle: self.state.is_shuffle,
                original_order: self.original_order.clone(),
            },
        };

        self.session = self.session.next();
        let session = self.session;
        self.latest.set(session);
        self.sink.detach();

        let item = queue[index].clone();
        self.state.queue = queue;
        self.state.current_index = index;
        self.state.position_ms = 0;
        self.state.duration_ms = 0;
        self.state.is_playing = false;
        self.state.phase = PlaybackPhase::Loading {
            item_id: item.id.clone(),
        };
        self.target = Some(session);

        info!(%session, item_id = %item.id, kind = %item.media_type, index, "Switching item");
        self.send_op(DriverOp::Switch {
            session,
            item,
            autoplay,
        });
        self.pending = Some(Transition {
            session,
            rollback,
            reply,
        });
        self.publish();
    }

    fn on_signal(&mut self, signal: DriverSignal) {
        match signal {
            DriverSignal::Loaded { session, result } => self.on_loaded(session, result),
            DriverSignal::Transport {
                session,
                playing,
                ack,
            } => {
                if let (true, Some(playing)) = (self.sink.is_live(session), playing) {
                    self.state.is_playing = playing;
                    self.publish();
                }
                if let Some(ack) = ack {
                    let _ = ack.send(Ok(()));
                }
            }
        }
    }

    fn on_loaded(&mut self, session: SessionId, result: Result<BackendStatus>) {
        let transition = match self.pending.take() {
            Some(transition) if transition.session == session => transition,
            other => {
                self.pending = other;
                debug!(%session, "Discarding settle for superseded session");
                return;
            }
        };

        match result {
            Ok(status) => {
                self.sink.attach(session);
                self.state.phase = PlaybackPhase::Ready;
                let outcome = self.sink.apply(&mut self.state, session, status);

                if let Some(item_id) = self.state.current_item().map(|item| item.id.clone()) {
                    let previous_item_id = self.last_item.replace(item_id.clone());
                    self.emit(PlayerEvent::ItemChanged {
                        item_id,
                        previous_item_id,
                    });
                }
                self.publish();

                if let Some(reply) = transition.reply {
                    let _ = reply.send(Ok(()));
                }
                if outcome == SinkOutcome::Finished {
                    self.on_track_finished();
                }
            }
            Err(error) => {
                let failed = match &self.state.phase {
                    PlaybackPhase::Loading { item_id } => Some(item_id.clone()),
                    _ => None,
                };
                warn!(%session, error = %error, "Load failed, restoring previous item");

                let rollback = transition.rollback;
                self.state.queue = rollback.queue;
                self.state.current_index = rollback.current_index;
                self.state.position_ms = rollback.position_ms;
                self.state.duration_ms = rollback.duration_ms;
                self.state.is_shuffle = rollback.is_shuffle;
                self.original_order = rollback.original_order;
                self.state.is_playing = false;
                self.state.phase = PlaybackPhase::Idle;
                self.target = None;

                if let Some(item_id) = failed {
                    self.emit(PlayerEvent::LoadFailed {
                        item_id,
                        message: error.to_string(),
                    });
                }
                self.publish();

                if let Some(reply) = transition.reply {
                    let _ = reply.send(Err(error));
                }
            }
        }
    }

    fn on_status(&mut self, session: SessionId, report: StatusReport) {
        match report {
            StatusReport::Snapshot(status) => match self.sink.apply(&mut self.state, session, status) {
                SinkOutcome::Stale => trace!(%session, "Discarding stale status"),
                SinkOutcome::Applied => self.publish(),
                SinkOutcome::Finished => {
                    self.publish();
                    self.on_track_finished();
                }
            },
            StatusReport::ReadyForDisplay { width, height } => {
                if self.target != Some(session) {
                    trace!(%session, "Discarding stale ready-for-display");
                    return;
                }
                if let Some(item) = self.state.current_item() {
                    debug!(%session, width, height, "Video ready for display");
                    let item_id = item.id.clone();
                    self.emit(PlayerEvent::VideoReady {
                        item_id,
                        width,
                        height,
                    });
                }
            }
        }
    }

    fn on_track_finished(&mut self) {
        let (Some(session), Some(item)) = (self.sink.live(), self.state.current_item()) else {
            return;
        };
        let item_id = item.id.clone();
        info!(%session, item_id = %item_id, "Track finished");
        self.emit(PlayerEvent::TrackFinished { item_id });

        match queue::end_of_track(
            self.state.queue.len(),
            self.state.current_index,
            self.state.repeat_mode,
        ) {
            EndOfTrack::Replay => {
                self.state.position_ms = 0;
                self.state.is_playing = true;
                self.send_op(DriverOp::Replay { session });
                self.publish();
            }
            EndOfTrack::Stop => {
                self.state.is_playing = false;
                if self.state.duration_ms > 0 {
                    self.state.position_ms = self.state.duration_ms;
                }
                self.emit(PlayerEvent::QueueEnded);
                self.publish();
            }
            EndOfTrack::Advance(next) => {
                let queue = self.state.queue.clone();
                self.begin_transition(queue, next, true, None);
            }
        }
    }

    fn refresh_surface(&mut self) {
        if let Some(active) = self.surfaces.refresh() {
            debug!(surface = ?active, "Active surface changed");
            self.state.active_surface = active;
            self.send_op(DriverOp::AttachSurface(active));
            self.emit(PlayerEvent::SurfaceChanged { surface: active });
        }
    }

    /// Drop the session: pending loads are superseded and state resets
    fn reset_session(&mut self) {
        if let Some(transition) = self.pending.take() {
            if let Some(reply) = transition.reply {
                let _ = reply.send(Err(PlaybackError::Superseded));
            }
        }

        self.session = self.session.next();
        self.latest.set(self.session);
        self.sink.detach();
        self.target = None;
        self.original_order = None;
        self.last_item = None;

        self.state = PlayerState::new(&self.config);
        self.surfaces.set_expanded(false);
        self.refresh_surface();
        self.state.active_surface = self.surfaces.active();
        self.send_op(DriverOp::SetRate(self.state.playback_rate));
        self.send_op(DriverOp::SetVolume(self.state.volume));
    }

    fn shutdown(&mut self, reply: Option<Reply<()>>) {
        info!("Shutting down playback controller");
        self.reset_session();
        self.send_op(DriverOp::Shutdown { ack: reply });
        self.publish();
    }

    fn send_op(&self, op: DriverOp) {
        if self.ops.send(op).is_err() {
            warn!("Backend driver is gone");
        }
    }

    fn emit(&self, event: PlayerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn publish(&self) {
        let state = &self.state;
        self.state_tx.send_if_modified(|current| {
            if current == state {
                false
            } else {
                current.clone_from(state);
                true
            }
        });
    }
}
