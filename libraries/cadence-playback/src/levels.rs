//! Transport level clamping
//!
//! Playback rate is limited to 0.5x-2.0x and volume to a linear 0.0-1.0.
//! Out-of-range values are clamped; NaN is rejected so a bad slider value can
//! never reach a backend.

/// Slowest supported playback rate
pub const MIN_PLAYBACK_RATE: f32 = 0.5;

/// Fastest supported playback rate
pub const MAX_PLAYBACK_RATE: f32 = 2.0;

/// Silence
pub const MIN_VOLUME: f32 = 0.0;

/// Unity gain
pub const MAX_VOLUME: f32 = 1.0;

/// Clamp a playback rate into range
///
/// Returns `None` for NaN.
pub fn clamp_rate(rate: f32) -> Option<f32> {
    if rate.is_nan() {
        None
    } else {
        Some(rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE))
    }
}

/// Clamp a volume level into range
///
/// Returns `None` for NaN.
pub fn clamp_volume(level: f32) -> Option<f32> {
    if level.is_nan() {
        None
    } else {
        Some(level.clamp(MIN_VOLUME, MAX_VOLUME))
    }
}

/// Clamp a seek target to `[0, ∞)`
pub fn clamp_seek(position_ms: i64) -> u64 {
    position_ms.max(0) as u64
}
