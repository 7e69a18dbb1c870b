//! Piecewise tempo timeline and the pure beats/seconds conversions over it.

use serde::{Deserialize, Serialize};

use crate::secs_per_beat;

/// A tempo breakpoint: from `time` seconds onward the tempo is `tempo` bpm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoMapEntry {
    pub time: f64,
    pub tempo: f64,
}

impl TempoMapEntry {
    pub fn new(time: f64, tempo: f64) -> Self {
        Self { time, tempo }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TempoMapError {
    #[error("tempo map entry {index} at {time}s comes before the previous entry at {previous}s")]
    NonMonotonic { index: usize, time: f64, previous: f64 },

    #[error("tempo map entry {index} has an invalid time of {time}s")]
    InvalidTime { index: usize, time: f64 },

    #[error("tempo map entry {index} has an invalid tempo of {tempo} bpm")]
    InvalidTempo { index: usize, tempo: f64 },
}

/// Validated, ordered tempo breakpoints.
///
/// An empty map means uniform tempo: every conversion falls back to the
/// caller-supplied seconds-per-beat. The map is only ever replaced as a
/// whole; there is no way to edit an entry in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TempoMap {
    entries: Vec<TempoMapEntry>,
}

impl TempoMap {
    /// Build a map, rejecting entries that would be silently misintegrated.
    pub fn new(entries: Vec<TempoMapEntry>) -> Result<Self, TempoMapError> {
        let mut previous: Option<f64> = None;

        for (index, entry) in entries.iter().enumerate() {
            if !entry.time.is_finite() || entry.time < 0.0 {
                return Err(TempoMapError::InvalidTime {
                    index,
                    time: entry.time,
                });
            }
            if !entry.tempo.is_finite() || entry.tempo <= 0.0 {
                return Err(TempoMapError::InvalidTempo {
                    index,
                    tempo: entry.tempo,
                });
            }
            if let Some(previous) = previous {
                if entry.time < previous {
                    return Err(TempoMapError::NonMonotonic {
                        index,
                        time: entry.time,
                        previous,
                    });
                }
            }
            previous = Some(entry.time);
        }

        Ok(Self { entries })
    }

    /// The uniform-tempo map.
    pub fn uniform() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TempoMapEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Tempo in effect at `seconds`. Before the first breakpoint (or with an
    /// empty map) this is `fallback_bpm`.
    pub fn tempo_at_seconds(&self, seconds: f64, fallback_bpm: f64) -> f64 {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.time <= seconds)
            .map(|entry| entry.tempo)
            .unwrap_or(fallback_bpm)
    }

    pub fn into_entries(self) -> Vec<TempoMapEntry> {
        self.entries
    }
}

impl TryFrom<Vec<TempoMapEntry>> for TempoMap {
    type Error = TempoMapError;

    fn try_from(entries: Vec<TempoMapEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

/// Convert wall-clock seconds to beats.
///
/// Integrates across every breakpoint that precedes `seconds`; the span before
/// the first breakpoint runs at the fallback tempo.
pub fn seconds_to_beats(map: &TempoMap, seconds: f64, fallback_secs_per_beat: f64) -> f64 {
    if map.is_empty() {
        return seconds / fallback_secs_per_beat;
    }

    let mut beats = 0.0;
    let mut last_time = 0.0;
    let mut spb = fallback_secs_per_beat;

    for entry in map.entries() {
        if entry.time >= seconds {
            break;
        }
        beats += (entry.time - last_time) / spb;
        last_time = entry.time;
        spb = secs_per_beat(entry.tempo);
    }

    beats + (seconds - last_time) / spb
}

/// Convert beats to wall-clock seconds. Exact inverse of [`seconds_to_beats`].
pub fn beats_to_seconds(map: &TempoMap, beats: f64, fallback_secs_per_beat: f64) -> f64 {
    if map.is_empty() {
        return beats * fallback_secs_per_beat;
    }

    let mut beat_cursor = 0.0;
    let mut last_time = 0.0;
    let mut spb = fallback_secs_per_beat;

    for entry in map.entries() {
        let segment_beats = (entry.time - last_time) / spb;
        if beat_cursor + segment_beats >= beats {
            break;
        }
        beat_cursor += segment_beats;
        last_time = entry.time;
        spb = secs_per_beat(entry.tempo);
    }

    last_time + (beats - beat_cursor) * spb
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_step_map() -> TempoMap {
        // 120 bpm for two seconds, then 60 bpm
        TempoMap::new(vec![TempoMapEntry::new(0.0, 120.0), TempoMapEntry::new(2.0, 60.0)])
            .expect("valid map")
    }

    #[test]
    fn test_uniform_map_uses_fallback() {
        let map = TempoMap::uniform();
        assert_relative_eq!(seconds_to_beats(&map, 3.0, 0.5), 6.0);
        assert_relative_eq!(beats_to_seconds(&map, 6.0, 0.5), 3.0);
    }

    #[test]
    fn test_piecewise_seconds_to_beats() {
        let map = two_step_map();
        // 2s at 120 = 4 beats, then 2s at 60 = 2 beats
        assert_relative_eq!(seconds_to_beats(&map, 4.0, 0.5), 6.0);
        assert_relative_eq!(seconds_to_beats(&map, 1.0, 0.5), 2.0);
        assert_relative_eq!(seconds_to_beats(&map, 2.0, 0.5), 4.0);
    }

    #[test]
    fn test_piecewise_beats_to_seconds() {
        let map = two_step_map();
        assert_relative_eq!(beats_to_seconds(&map, 6.0, 0.5), 4.0);
        assert_relative_eq!(beats_to_seconds(&map, 4.0, 0.5), 2.0);
        assert_relative_eq!(beats_to_seconds(&map, 1.0, 0.5), 0.5);
    }

    #[test]
    fn test_span_before_first_breakpoint_uses_fallback() {
        let map = TempoMap::new(vec![TempoMapEntry::new(1.0, 60.0)]).expect("valid map");
        // 1s at fallback 120 bpm = 2 beats, then 1s at 60 = 1 beat
        assert_relative_eq!(seconds_to_beats(&map, 2.0, 0.5), 3.0);
        assert_relative_eq!(beats_to_seconds(&map, 3.0, 0.5), 2.0);
    }

    #[test]
    fn test_conversions_are_inverse() {
        let map = TempoMap::new(vec![
            TempoMapEntry::new(0.0, 120.0),
            TempoMapEntry::new(1.5, 90.0),
            TempoMapEntry::new(1.5, 150.0),
            TempoMapEntry::new(7.25, 75.0),
        ])
        .expect("valid map");

        for i in 0..200 {
            let seconds = i as f64 * 0.137;
            let beats = seconds_to_beats(&map, seconds, 0.5);
            assert_relative_eq!(beats_to_seconds(&map, beats, 0.5), seconds, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_rejects_non_monotonic_time() {
        let result = TempoMap::new(vec![
            TempoMapEntry::new(2.0, 120.0),
            TempoMapEntry::new(1.0, 90.0),
        ]);
        assert!(matches!(
            result,
            Err(TempoMapError::NonMonotonic { index: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_tempo() {
        let result = TempoMap::new(vec![TempoMapEntry::new(0.0, 0.0)]);
        assert!(matches!(result, Err(TempoMapError::InvalidTempo { index: 0, .. })));

        let result = TempoMap::new(vec![TempoMapEntry::new(0.0, f64::NAN)]);
        assert!(matches!(result, Err(TempoMapError::InvalidTempo { .. })));
    }

    #[test]
    fn test_rejects_invalid_time() {
        let result = TempoMap::new(vec![TempoMapEntry::new(-1.0, 120.0)]);
        assert!(matches!(result, Err(TempoMapError::InvalidTime { index: 0, .. })));
    }

    #[test]
    fn test_equal_times_are_allowed() {
        let map = TempoMap::new(vec![
            TempoMapEntry::new(1.0, 120.0),
            TempoMapEntry::new(1.0, 90.0),
        ]);
        assert!(map.is_ok());
    }

    #[test]
    fn test_tempo_at_seconds() {
        let map = two_step_map();
        assert_eq!(map.tempo_at_seconds(0.5, 100.0), 120.0);
        assert_eq!(map.tempo_at_seconds(2.0, 100.0), 60.0);
        assert_eq!(TempoMap::uniform().tempo_at_seconds(5.0, 100.0), 100.0);
    }
}
