//! Status Sink
//!
//! Translates backend status snapshots into [`PlayerState`] updates.
//!
//! Every load gets a fresh [`SessionId`]. The [`StatusReporter`] handed to the
//! adapter, and every poll the driver issues, tag their snapshots with that
//! session. The sink only applies snapshots whose session is the live one;
//! anything else comes from a torn-down or superseded instance and is dropped.

use crate::backend::BackendStatus;
use crate::types::PlayerState;
use std::fmt;
use tokio::sync::mpsc;

/// Identity of one load attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// What an adapter can report about a loaded instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusReport {
    Snapshot(BackendStatus),

    /// Video frame dimensions are known
    ReadyForDisplay { width: u32, height: u32 },
}

/// Tagged status channel
pub type StatusSender = mpsc::UnboundedSender<(SessionId, StatusReport)>;

/// Receiving end of a [`StatusSender`]
pub type StatusReceiver = mpsc::UnboundedReceiver<(SessionId, StatusReport)>;

/// Per-load status callback handed to an adapter
///
/// Captures its session at creation; reports sent after the session was
/// superseded are discarded by the controller.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    session: SessionId,
    tx: StatusSender,
}

impl StatusReporter {
    pub fn new(session: SessionId, tx: StatusSender) -> Self {
        Self { session, tx }
    }

    /// Reporter plus the receiver it feeds
    pub fn channel(session: SessionId) -> (Self, StatusReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(session, tx), rx)
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Push a snapshot; returns false once the controller is gone
    pub fn report(&self, status: BackendStatus) -> bool {
        self.tx
            .send((self.session, StatusReport::Snapshot(status)))
            .is_ok()
    }

    /// Announce natural video dimensions
    pub fn ready_for_display(&self, width: u32, height: u32) -> bool {
        self.tx
            .send((self.session, StatusReport::ReadyForDisplay { width, height }))
            .is_ok()
    }

    /// True once the controller dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Result of offering a snapshot to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SinkOutcome {
    /// Not from the live session; nothing changed
    Stale,

    /// Mapped onto the state
    Applied,

    /// Mapped, and the item just finished
    Finished,
}

/// Staleness filter and state mapper
#[derive(Debug, Default)]
pub(crate) struct StatusSink {
    live: Option<SessionId>,
    finish_latched: bool,
}

impl StatusSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&mut self, session: SessionId) {
        self.live = Some(session);
        self.finish_latched = false;
    }

    pub(crate) fn detach(&mut self) {
        self.live = None;
        self.finish_latched = false;
    }

    pub(crate) fn live(&self) -> Option<SessionId> {
        self.live
    }

    pub(crate) fn is_live(&self, session: SessionId) -> bool {
        self.live == Some(session)
    }

    /// Apply a snapshot from `session` to `state`
    ///
    /// The finish edge fires once per play-through: a finished snapshot
    /// latches until a non-finished one arrives.
    pub(crate) fn apply(
        &mut self,
        state: &mut PlayerState,
        session: SessionId,
        status: BackendStatus,
    ) -> SinkOutcome {
        if !self.is_live(session) {
            return SinkOutcome::Stale;
        }

        if status.duration_ms > 0 {
            state.duration_ms = status.duration_ms;
        }

        state.position_ms = if state.duration_ms > 0 {
            status.position_ms.min(state.duration_ms)
        } else {
            status.position_ms
        };
        state.is_playing = status.loaded && status.playing;

        if status.finished {
            if self.finish_latched {
                SinkOutcome::Applied
            } else {
                self.finish_latched = true;
                SinkOutcome::Finished
            }
        } else {
            self.finish_latched = false;
            SinkOutcome::Applied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing_at(position_ms: u64, duration_ms: u64) -> BackendStatus {
        BackendStatus {
            loaded: true,
            playing: true,
            position_ms,
            duration_ms,
            finished: false,
        }
    }

    fn finished(duration_ms: u64) -> BackendStatus {
        BackendStatus {
            loaded: true,
            playing: false,
            position_ms: duration_ms,
            duration_ms,
            finished: true,
        }
    }

    #[test]
    fn stale_session_is_ignored() {
        let mut sink = StatusSink::new();
        let mut state = PlayerState::default();
        let a = SessionId::from_raw(1);
        let b = a.next();

        sink.attach(b);
        assert_eq!(sink.apply(&mut state, a, playing_at(5_000, 60_000)), SinkOutcome::Stale);
        assert_eq!(state.position_ms, 0);
        assert_eq!(state.duration_ms, 0);
    }

    #[test]
    fn detached_sink_applies_nothing() {
        let mut sink = StatusSink::new();
        let mut state = PlayerState::default();
        let a = SessionId::from_raw(1);

        sink.attach(a);
        sink.detach();
        assert_eq!(sink.apply(&mut state, a, playing_at(1, 2)), SinkOutcome::Stale);
        assert_eq!(sink.live(), None);
    }

    #[test]
    fn maps_status_fields() {
        let mut sink = StatusSink::new();
        let mut state = PlayerState::default();
        let a = SessionId::from_raw(1);

        sink.attach(a);
        assert_eq!(sink.apply(&mut state, a, playing_at(1_500, 90_000)), SinkOutcome::Applied);
        assert_eq!(state.position_ms, 1_500);
        assert_eq!(state.duration_ms, 90_000);
        assert!(state.is_playing);
    }

    #[test]
    fn unknown_duration_keeps_last_known() {
        let mut sink = StatusSink::new();
        let mut state = PlayerState::default();
        let a = SessionId::from_raw(1);
        sink.attach(a);

        sink.apply(&mut state, a, playing_at(0, 0));
        assert_eq!(state.duration_ms, 0);

        sink.apply(&mut state, a, playing_at(100, 10_000));
        sink.apply(&mut state, a, playing_at(200, 0));
        assert_eq!(state.duration_ms, 10_000);
        assert_eq!(state.position_ms, 200);
    }

    #[test]
    fn position_clamped_to_duration() {
        let mut sink = StatusSink::new();
        let mut state = PlayerState::default();
        let a = SessionId::from_raw(1);
        sink.attach(a);

        sink.apply(&mut state, a, playing_at(12_000, 10_000));
        assert_eq!(state.position_ms, 10_000);
    }

    #[test]
    fn finish_fires_once_per_play_through() {
        let mut sink = StatusSink::new();
        let mut state = PlayerState::default();
        let a = SessionId::from_raw(1);
        sink.attach(a);

        assert_eq!(sink.apply(&mut state, a, finished(3_000)), SinkOutcome::Finished);
        assert_eq!(sink.apply(&mut state, a, finished(3_000)), SinkOutcome::Applied);
        assert!(!state.is_playing);
        assert_eq!(state.position_ms, 3_000);
    }

    #[test]
    fn reattach_resets_latch() {
        let mut sink = StatusSink::new();
        let mut state = PlayerState::default();
        let a = SessionId::from_raw(1);
        let b = a.next();

        sink.attach(a);
        assert_eq!(sink.apply(&mut state, a, finished(3_000)), SinkOutcome::Finished);
        sink.attach(b);
        assert_eq!(sink.apply(&mut state, b, finished(3_000)), SinkOutcome::Finished);
    }

    #[test]
    fn fresh_play_through_unlatches() {
        let mut sink = StatusSink::new();
        let mut state = PlayerState::default();
        let a = SessionId::from_raw(1);
        sink.attach(a);

        assert_eq!(sink.apply(&mut state, a, finished(3_000)), SinkOutcome::Finished);
        assert_eq!(sink.apply(&mut state, a, playing_at(0, 3_000)), SinkOutcome::Applied);
        assert_eq!(sink.apply(&mut state, a, finished(3_000)), SinkOutcome::Finished);
    }

    #[test]
    fn reporter_tags_session() {
        let session = SessionId::from_raw(7);
        let (reporter, mut rx) = StatusReporter::channel(session);

        assert!(reporter.report(playing_at(10, 20)));
        assert!(reporter.ready_for_display(1920, 1080));

        let (tag, report) = rx.try_recv().unwrap();
        assert_eq!(tag, session);
        assert_eq!(report, StatusReport::Snapshot(playing_at(10, 20)));

        let (_, report) = rx.try_recv().unwrap();
        assert_eq!(report, StatusReport::ReadyForDisplay { width: 1920, height: 1080 });

        drop(rx);
        assert!(!reporter.report(playing_at(0, 0)));
        assert!(reporter.is_closed());
    }
}
