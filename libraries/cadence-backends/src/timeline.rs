//! Virtual transport clock
//!
//! Tracks position as "anchor + elapsed × rate" against [`tokio::time::Instant`],
//! so paused-clock tests can drive it with `tokio::time::advance`.

use cadence_playback::BackendStatus;
use std::time::Duration;
use tokio::time::Instant;

/// Position clock for one loaded item
#[derive(Debug, Clone)]
pub struct Timeline {
    /// 0 when unknown; position is then unbounded
    duration_ms: u64,
    rate: f32,
    anchor_ms: u64,
    started: Option<Instant>,
}

impl Timeline {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            rate: 1.0,
            anchor_ms: 0,
            started: None,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Current position, clamped to the duration when known
    pub fn position_ms(&self) -> u64 {
        let position = match self.started {
            Some(started) => {
                let elapsed = started.elapsed().as_secs_f64() * 1000.0 * f64::from(self.rate);
                self.anchor_ms.saturating_add(elapsed as u64)
            }
            None => self.anchor_ms,
        };

        if self.duration_ms > 0 {
            position.min(self.duration_ms)
        } else {
            position
        }
    }

    pub fn is_finished(&self) -> bool {
        self.duration_ms > 0 && self.position_ms() >= self.duration_ms
    }

    /// Clock running and not at the end
    pub fn is_playing(&self) -> bool {
        self.started.is_some() && !self.is_finished()
    }

    /// Start the clock; no-op while running or at the end
    pub fn play(&mut self) {
        if self.started.is_none() && !self.is_finished() {
            self.started = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        self.anchor_ms = self.position_ms();
        self.started = None;
    }

    pub fn seek(&mut self, position_ms: u64) {
        self.anchor_ms = if self.duration_ms > 0 {
            position_ms.min(self.duration_ms)
        } else {
            position_ms
        };
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.anchor_ms = self.position_ms();
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
        self.rate = rate;
    }

    /// Wall time until the end at the current rate, while playing
    pub fn remaining(&self) -> Option<Duration> {
        if !self.is_playing() || self.duration_ms == 0 || self.rate <= 0.0 {
            return None;
        }
        let left_ms = (self.duration_ms - self.position_ms()) as f64 / f64::from(self.rate);
        Some(Duration::from_secs_f64(left_ms / 1000.0))
    }

    pub fn status(&self) -> BackendStatus {
        let finished = self.is_finished();
        BackendStatus {
            loaded: true,
            playing: self.started.is_some() && !finished,
            position_ms: self.position_ms(),
            duration_ms: self.duration_ms,
            finished,
        }
    }
}
