//! Shared test infrastructure: scripted adapters and a spawned controller

#![allow(dead_code)]

use async_trait::async_trait;
use cadence_core::MediaItem;
use cadence_playback::{
    Adapters, AudioSessionMode, BackendStatus, Handle, LoadRequest, MediaAdapter, PlaybackConfig,
    PlaybackError, PlayerController, PlayerEvent, PlayerHandle, PlayerState, Result,
    StatusDelivery, StatusReporter, SurfaceId,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

pub const DEFAULT_DURATION_MS: u64 = 60_000;
const WAIT: Duration = Duration::from_secs(60);

// ============================================================================
// Call journal
// ============================================================================

/// Adapter call, identified by media URL
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Configure(AudioSessionMode),
    Load(String),
    Unload(String),
    Play(String),
    Pause(String),
    Seek(String, u64),
    SetRate(String, f32),
    SetVolume(String, f32),
    Attach(String, Option<SurfaceId>),
}

#[derive(Default)]
struct JournalInner {
    calls: Vec<Call>,
    open: HashSet<Handle>,
    max_open: usize,
}

/// Calls across both adapters, in order
#[derive(Default)]
pub struct Journal {
    inner: Mutex<JournalInner>,
}

impl Journal {
    fn lock(&self) -> MutexGuard<'_, JournalInner> {
        self.inner.lock().unwrap()
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }

    fn opened(&self, handle: Handle) {
        let mut inner = self.lock();
        inner.open.insert(handle);
        inner.max_open = inner.max_open.max(inner.open.len());
    }

    fn closed(&self, handle: Handle) {
        self.lock().open.remove(&handle);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Load(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Highest number of simultaneously loaded instances seen
    pub fn max_open(&self) -> usize {
        self.lock().max_open
    }

    pub fn open_count(&self) -> usize {
        self.lock().open.len()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    /// Position of the first call equal to `call`
    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }
}

// ============================================================================
// Scripted adapter
// ============================================================================

struct Instance {
    url: String,
    playing: bool,
    position_ms: u64,
    duration_ms: u64,
    finished: bool,
    reporter: StatusReporter,
}

impl Instance {
    fn status(&self) -> BackendStatus {
        BackendStatus {
            loaded: true,
            playing: self.playing,
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            finished: self.finished,
        }
    }
}

#[derive(Default)]
struct Script {
    instances: HashMap<Handle, Instance>,
    durations: HashMap<String, u64>,
    failing: HashSet<String>,
    gates: HashMap<String, Arc<Notify>>,
    reporters: HashMap<String, StatusReporter>,
    failing_transport: bool,
}

/// In-memory backend whose behavior tests control
pub struct ScriptedAdapter {
    delivery: StatusDelivery,
    journal: Arc<Journal>,
    script: Mutex<Script>,
}

impl ScriptedAdapter {
    pub fn new(delivery: StatusDelivery, journal: Arc<Journal>) -> Self {
        Self {
            delivery,
            journal,
            script: Mutex::new(Script::default()),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    /// Loads of `url` fail
    pub fn fail_url(&self, url: &str) {
        self.script().failing.insert(url.to_string());
    }

    /// Transport calls fail
    pub fn fail_transport(&self, failing: bool) {
        self.script().failing_transport = failing;
    }

    /// Loads of `url` wait until the returned gate is notified
    pub fn gate(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script().gates.insert(url.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn set_duration(&self, url: &str, duration_ms: u64) {
        self.script().durations.insert(url.to_string(), duration_ms);
    }

    /// Reporter handed to the most recent load of `url`
    pub fn reporter(&self, url: &str) -> Option<StatusReporter> {
        self.script().reporters.get(url).cloned()
    }

    /// Drive the live instance of `url` to its end
    pub fn finish(&self, url: &str) {
        self.update(url, |instance| {
            instance.position_ms = instance.duration_ms;
            instance.playing = false;
            instance.finished = true;
        });
    }

    /// Pause behind the controller's back, like a platform interruption
    pub fn interrupt(&self, url: &str) {
        self.update(url, |instance| instance.playing = false);
    }

    pub fn advance(&self, url: &str, elapsed_ms: u64) {
        self.update(url, |instance| {
            instance.position_ms = (instance.position_ms + elapsed_ms).min(instance.duration_ms);
        });
    }

    fn update(&self, url: &str, change: impl Fn(&mut Instance)) {
        let mut script = self.script();
        for instance in script.instances.values_mut().filter(|i| i.url == url) {
            change(instance);
            if self.delivery == StatusDelivery::Pushed {
                instance.reporter.report(instance.status());
            }
        }
    }

    fn transport(&self, handle: Handle, call: impl FnOnce(String) -> Call, change: impl FnOnce(&mut Instance)) -> Result<()> {
        let mut script = self.script();
        let failing = script.failing_transport;
        let instance = script
            .instances
            .get_mut(&handle)
            .ok_or_else(|| PlaybackError::transport(format!("{} is not loaded", handle)))?;
        self.journal.record(call(instance.url.clone()));

        if failing {
            return Err(PlaybackError::transport("scripted failure"));
        }

        change(instance);
        if self.delivery == StatusDelivery::Pushed {
            instance.reporter.report(instance.status());
        }
        Ok(())
    }
}

#[async_trait]
impl MediaAdapter for ScriptedAdapter {
    fn delivery(&self) -> StatusDelivery {
        self.delivery
    }

    async fn configure_session(&self, mode: AudioSessionMode) -> Result<()> {
        self.journal.record(Call::Configure(mode));
        Ok(())
    }

    async fn load(&self, request: LoadRequest, reporter: StatusReporter) -> Result<Handle> {
        let url = request.url;
        self.journal.record(Call::Load(url.clone()));

        let gate = self.script().gates.get(&url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let handle = {
            let mut script = self.script();
            script.reporters.insert(url.clone(), reporter.clone());
            if script.failing.contains(&url) {
                return Err(PlaybackError::backend(format!("cannot open {}", url)));
            }

            let handle = Handle::next();
            let duration_ms = script.durations.get(&url).copied().unwrap_or(DEFAULT_DURATION_MS);
            script.instances.insert(
                handle,
                Instance {
                    url,
                    playing: false,
                    position_ms: 0,
                    duration_ms,
                    finished: false,
                    reporter: reporter.clone(),
                },
            );
            handle
        };

        self.journal.opened(handle);
        if self.delivery == StatusDelivery::Pushed {
            reporter.ready_for_display(1920, 1080);
        }
        Ok(handle)
    }

    async fn unload(&self, handle: Handle) -> Result<()> {
        let instance = self
            .script()
            .instances
            .remove(&handle)
            .ok_or_else(|| PlaybackError::backend(format!("{} is not loaded", handle)))?;
        self.journal.record(Call::Unload(instance.url));
        self.journal.closed(handle);
        Ok(())
    }

    async fn play(&self, handle: Handle) -> Result<()> {
        self.transport(handle, Call::Play, |i| i.playing = true)
    }

    async fn pause(&self, handle: Handle) -> Result<()> {
        self.transport(handle, Call::Pause, |i| i.playing = false)
    }

    async fn seek(&self, handle: Handle, position_ms: u64) -> Result<()> {
        self.transport(
            handle,
            |url| Call::Seek(url, position_ms),
            |i| {
                i.position_ms = position_ms.min(i.duration_ms);
                i.finished = false;
            },
        )
    }

    async fn set_rate(&self, handle: Handle, rate: f32) -> Result<()> {
        self.transport(handle, |url| Call::SetRate(url, rate), |_| {})
    }

    async fn set_volume(&self, handle: Handle, level: f32) -> Result<()> {
        self.transport(handle, |url| Call::SetVolume(url, level), |_| {})
    }

    async fn status(&self, handle: Handle) -> Result<BackendStatus> {
        self.script()
            .instances
            .get(&handle)
            .map(Instance::status)
            .ok_or_else(|| PlaybackError::backend(format!("{} is not loaded", handle)))
    }

    async fn attach_surface(&self, handle: Handle, surface: Option<SurfaceId>) -> Result<()> {
        self.transport(handle, |url| Call::Attach(url, surface), |_| {})
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub player: PlayerHandle,
    pub audio: Arc<ScriptedAdapter>,
    pub video: Arc<ScriptedAdapter>,
    pub journal: Arc<Journal>,
}

/// Polled audio, pushed video, default config
pub fn spawn() -> Harness {
    spawn_with(PlaybackConfig::default())
}

pub fn spawn_with(config: PlaybackConfig) -> Harness {
    let journal = Arc::new(Journal::default());
    let audio = Arc::new(ScriptedAdapter::new(StatusDelivery::Polled, Arc::clone(&journal)));
    let video = Arc::new(ScriptedAdapter::new(StatusDelivery::Pushed, Arc::clone(&journal)));
    let adapters = Adapters::new(audio.clone(), video.clone());
    let player = PlayerController::spawn(config, adapters);

    Harness {
        player,
        audio,
        video,
        journal,
    }
}

pub fn audio_url(id: &str) -> String {
    format!("https://cdn.test/{}.mp3", id)
}

pub fn video_url(id: &str) -> String {
    format!("https://cdn.test/{}.mp4", id)
}

pub fn audio(id: &str) -> MediaItem {
    MediaItem::audio(id, format!("Audio {}", id), audio_url(id))
}

pub fn video(id: &str) -> MediaItem {
    MediaItem::video(id, format!("Video {}", id), video_url(id))
}

pub fn ids(state: &PlayerState) -> Vec<String> {
    state.queue.iter().map(|item| item.id.to_string()).collect()
}

pub fn current_id(state: &PlayerState) -> Option<String> {
    state.current_item().map(|item| item.id.to_string())
}

/// Wait until the published state satisfies `pred`
pub async fn wait_for(player: &PlayerHandle, pred: impl Fn(&PlayerState) -> bool) -> PlayerState {
    let mut rx = player.watch();
    let result = tokio::time::timeout(WAIT, rx.wait_for(|state| pred(state))).await;
    match result {
        Ok(Ok(state)) => state.clone(),
        Ok(Err(_)) => panic!("controller stopped"),
        Err(_) => panic!("timed out waiting for state; last: {:#?}", player.state()),
    }
}

/// Receive events until one matches
pub async fn expect_event(
    rx: &mut broadcast::Receiver<PlayerEvent>,
    pred: impl Fn(&PlayerEvent) -> bool,
) -> PlayerEvent {
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    };
    tokio::time::timeout(WAIT, wait)
        .await
        .expect("timed out waiting for event")
}

/// Events already queued on `rx`
pub fn drain(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Let spawned tasks and timers run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
