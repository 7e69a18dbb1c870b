mod map;
mod time;

pub use map::{TempoMap, TempoMapEntry, TempoMapError, beats_to_seconds, seconds_to_beats};
pub use time::{MusicalPosition, TimeContext};

/// Pulses Per Quarter Note - the one tick resolution every stored tick uses
pub const PPQN: u64 = 480;

/// Tempo substituted for any missing or invalid bpm
pub const DEFAULT_BPM: f64 = 120.0;

pub const DEFAULT_BEATS_PER_BAR: u32 = 4;

/// Replace a non-positive or non-finite bpm with [`DEFAULT_BPM`].
pub fn sanitize_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() && bpm > 0.0 {
        bpm
    } else {
        log::debug!("invalid bpm {bpm} replaced with {DEFAULT_BPM}");
        DEFAULT_BPM
    }
}

pub fn secs_per_beat(bpm: f64) -> f64 {
    60.0 / sanitize_bpm(bpm)
}

/// Clamp a signed tick request into the valid tick range.
pub fn clamp_tick(tick: i64) -> u64 {
    tick.max(0) as u64
}

/// Clamp a seconds value to a finite, non-negative number.
pub fn clamp_seconds(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}
