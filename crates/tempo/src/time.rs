use crate::map::{TempoMap, beats_to_seconds, seconds_to_beats};
use crate::{DEFAULT_BEATS_PER_BAR, PPQN, clamp_seconds, sanitize_bpm, secs_per_beat};

/// The timing context of one timeline.
///
/// Owned by whoever owns the timeline and passed by reference into every
/// conversion, so independent timelines never share tempo state.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeContext {
    bpm: f64,
    beats_per_bar: u32,
    tempo_map: TempoMap,
}

impl TimeContext {
    pub fn new(bpm: f64, beats_per_bar: u32) -> Self {
        Self {
            bpm: sanitize_bpm(bpm),
            beats_per_bar: sanitize_beats_per_bar(beats_per_bar),
            tempo_map: TempoMap::uniform(),
        }
    }

    pub fn with_tempo_map(mut self, tempo_map: TempoMap) -> Self {
        self.tempo_map = tempo_map;
        self
    }

    /// Global tempo, used wherever the tempo map is silent.
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = sanitize_bpm(bpm);
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    pub fn set_beats_per_bar(&mut self, beats_per_bar: u32) {
        self.beats_per_bar = sanitize_beats_per_bar(beats_per_bar);
    }

    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }

    pub fn set_tempo_map(&mut self, tempo_map: TempoMap) {
        self.tempo_map = tempo_map;
    }

    pub fn secs_per_beat(&self) -> f64 {
        secs_per_beat(self.bpm)
    }

    pub fn ticks_per_bar(&self) -> u64 {
        PPQN * self.beats_per_bar as u64
    }

    pub fn ticks_to_beats(&self, ticks: u64) -> f64 {
        ticks as f64 / PPQN as f64
    }

    pub fn beats_to_ticks(&self, beats: f64) -> u64 {
        if !beats.is_finite() || beats <= 0.0 {
            return 0;
        }
        (beats * PPQN as f64).round() as u64
    }

    pub fn ticks_to_bars(&self, ticks: u64) -> f64 {
        let beats = self.ticks_to_beats(ticks);
        beats / self.beats_per_bar as f64
    }

    pub fn bars_to_ticks(&self, bars: f64) -> u64 {
        let beats = bars * self.beats_per_bar as f64;
        self.beats_to_ticks(beats)
    }

    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats_to_seconds(&self.tempo_map, beats, self.secs_per_beat())
    }

    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds_to_beats(&self.tempo_map, seconds, self.secs_per_beat())
    }

    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        self.beats_to_seconds(self.ticks_to_beats(ticks))
    }

    /// Fractional tick position for `seconds`; negative or non-finite input is
    /// treated as zero.
    pub fn seconds_to_ticks_f64(&self, seconds: f64) -> f64 {
        self.seconds_to_beats(clamp_seconds(seconds)) * PPQN as f64
    }

    /// Nearest whole tick for `seconds`.
    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        self.seconds_to_ticks_f64(seconds).round() as u64
    }

    /// Instantaneous tempo at a tick position. Read fresh on every call; the
    /// frame clock depends on this never being cached.
    pub fn tempo_at_tick(&self, ticks: u64) -> f64 {
        let seconds = self.ticks_to_seconds(ticks);
        self.tempo_map.tempo_at_seconds(seconds, self.bpm)
    }

    pub fn format_position(&self, ticks: u64) -> MusicalPosition {
        let total_beats = ticks / PPQN;
        let beats_per_bar = self.beats_per_bar as u64;

        MusicalPosition {
            bar: (total_beats / beats_per_bar) as u32 + 1,
            beat: (total_beats % beats_per_bar) as u32 + 1,
            tick: (ticks % PPQN) as u32,
        }
    }
}

impl Default for TimeContext {
    fn default() -> Self {
        Self::new(crate::DEFAULT_BPM, DEFAULT_BEATS_PER_BAR)
    }
}

fn sanitize_beats_per_bar(beats_per_bar: u32) -> u32 {
    if beats_per_bar == 0 {
        log::debug!("beats per bar of 0 replaced with {DEFAULT_BEATS_PER_BAR}");
        DEFAULT_BEATS_PER_BAR
    } else {
        beats_per_bar
    }
}

/// One-based bar and beat, zero-based tick within the beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicalPosition {
    pub bar: u32,
    pub beat: u32,
    pub tick: u32,
}

impl std::fmt::Display for MusicalPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{:03}", self.bar, self.beat, self.tick)
    }
}
