//! Queue navigation policy
//!
//! Pure index arithmetic for skip and auto-advance. The queue itself lives in
//! [`crate::PlayerState`]; these helpers only decide which index comes next.
//!
//! ```text
//! skip next     (i + 1) % len     no-op at the last index when repeat is off
//! skip previous (i - 1 + len) % len
//! end of track  repeat one  → replay i
//!               last + off  → stop, stay at i
//!               otherwise   → advance to (i + 1) % len
//! ```

use crate::types::RepeatMode;

/// What to do when the current item finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfTrack {
    /// Seek the same item to 0 and keep playing
    Replay,

    /// Stop on the last item; keep it loaded
    Stop,

    /// Load the item at this index
    Advance(usize),
}

/// Clamp a requested start index into `[0, len)`
///
/// `len` must be non-zero.
pub fn clamp_index(len: usize, index: usize) -> usize {
    debug_assert!(len > 0, "clamp_index on empty queue");
    index.min(len.saturating_sub(1))
}

/// Index after `current` for an explicit skip
///
/// Returns `None` when the queue is empty, or when `current` is the last index
/// and repeat is off.
pub fn next_index(len: usize, current: usize, repeat: RepeatMode) -> Option<usize> {
    if len == 0 {
        return None;
    }

    if current + 1 >= len && repeat == RepeatMode::Off {
        return None;
    }

    Some((current + 1) % len)
}

/// Index before `current`, always wrapping
pub fn previous_index(len: usize, current: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }

    Some((current % len + len - 1) % len)
}

/// Decide the end-of-track action
pub fn end_of_track(len: usize, current: usize, repeat: RepeatMode) -> EndOfTrack {
    if repeat == RepeatMode::One {
        return EndOfTrack::Replay;
    }

    if len == 0 || (current + 1 >= len && repeat == RepeatMode::Off) {
        return EndOfTrack::Stop;
    }

    EndOfTrack::Advance((current + 1) % len)
}
