use std::collections::HashMap;
use std::path::Path;

use timeline_ingest::NoteRaw;
use timeline_project::{LoadedProject, Project, TrackData, load_project, save_project};
use timeline_tempo::{MusicalPosition, PPQN, TempoMap, TempoMapEntry, TimeContext};
use timeline_transport::{
    Command, FrameClock, PlayheadAuthority, QuantizeMode, Transition, Transport, TransportState,
};

use crate::TimelineError;
use crate::cache::NoteCache;
use crate::config::TimelineConfig;
use crate::region::{ResolvedNote, resolve_window};
use crate::track::{Track, TrackId};

/// One timeline: its timing context, transport, tracks and note cache.
///
/// All mutations are synchronous and complete before the next caller can
/// observe state.
pub struct Timeline {
    time_context: TimeContext,
    transport: Transport,
    frame_clock: FrameClock,
    tracks: Vec<Track>,
    pub(crate) notes: NoteCache,
    pub(crate) pending_ingests: HashMap<TrackId, u64>,
    pub(crate) next_ingest_generation: u64,
}

impl Timeline {
    pub fn new(bpm: f64, beats_per_bar: u32) -> Self {
        Self {
            time_context: TimeContext::new(bpm, beats_per_bar),
            transport: Transport::new(),
            frame_clock: FrameClock::new(),
            tracks: Vec::new(),
            notes: NoteCache::new(),
            pending_ingests: HashMap::new(),
            next_ingest_generation: 0,
        }
    }

    pub fn with_config(config: &TimelineConfig) -> Self {
        let mut timeline = Self::new(config.default_bpm, config.beats_per_bar);
        timeline.apply(Command::SetQuantize(config.quantize));
        timeline.apply(Command::SetRate(config.rate));
        timeline.apply(Command::SetLoopEnabled(config.loop_enabled));
        timeline
    }

    pub fn from_project(path: &Path) -> Result<Self, TimelineError> {
        let project = load_project(path)?;
        Ok(Self::from_loaded(project, &TimelineConfig::load()))
    }

    pub fn from_loaded(project: LoadedProject, config: &TimelineConfig) -> Self {
        let mut timeline = Self::with_config(config);
        timeline.time_context =
            TimeContext::new(project.bpm, project.beats_per_bar).with_tempo_map(project.tempo_map);

        for data in project.tracks {
            let id = TrackId(data.id);
            let mut track = Track::new(id, data.name);
            track.set_offset_ticks(tick_to_i64(data.offset_ticks));
            track.set_region_ticks(
                data.region_start_tick.map(tick_to_i64),
                data.region_end_tick.map(tick_to_i64),
            );
            timeline.tracks.push(track);
            timeline.notes.insert(id, data.notes);
        }

        timeline.apply(Command::Resync);
        timeline
    }

    pub fn to_project(&self, name: &str) -> Project {
        Project {
            name: name.to_string(),
            ppq: PPQN,
            bpm: self.time_context.bpm(),
            beats_per_bar: self.time_context.beats_per_bar(),
            tempo_map: self.time_context.tempo_map().entries().to_vec(),
            tracks: self
                .tracks
                .iter()
                .map(|track| TrackData {
                    id: track.id.0,
                    name: track.name.clone(),
                    offset_ticks: track.offset_ticks(),
                    region_start_tick: track.region_start_tick(),
                    region_end_tick: track.region_end_tick(),
                    notes: self.notes.get(track.id).map(<[NoteRaw]>::to_vec).unwrap_or_default(),
                })
                .collect(),
        }
    }

    pub fn save(&self, path: &Path, name: &str) -> Result<(), TimelineError> {
        save_project(path, &self.to_project(name))?;
        Ok(())
    }

    // Transport commands

    /// Apply a transport command against this timeline's timing context.
    pub fn apply(&mut self, command: Command) -> Transition {
        let transition = self.transport.apply(command, &self.time_context);
        if transition.reposition.is_some() {
            self.frame_clock.reset();
        }
        transition
    }

    pub fn set_current_tick(&mut self, tick: i64, authority: PlayheadAuthority) -> Transition {
        self.apply(Command::SetCurrentTick { tick, authority })
    }

    pub fn set_current_seconds(&mut self, seconds: f64) -> Transition {
        self.apply(Command::SetCurrentSeconds { seconds })
    }

    pub fn play(&mut self) -> Transition {
        self.apply(Command::Play)
    }

    pub fn pause(&mut self) -> Transition {
        self.apply(Command::Pause)
    }

    pub fn toggle_play(&mut self) -> Transition {
        self.apply(Command::TogglePlay)
    }

    pub fn seek_tick(&mut self, tick: i64) -> Transition {
        self.apply(Command::SeekTick { tick })
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) -> Transition {
        self.apply(Command::SetLoopEnabled(enabled))
    }

    pub fn set_loop_range_ticks(&mut self, start: Option<i64>, end: Option<i64>) -> Transition {
        self.apply(Command::SetLoopRange { start, end })
    }

    pub fn set_quantize(&mut self, mode: QuantizeMode) -> Transition {
        self.apply(Command::SetQuantize(mode))
    }

    pub fn set_rate(&mut self, rate: f64) -> Transition {
        self.apply(Command::SetRate(rate))
    }

    /// Advance playback to wall-clock time `now_secs`. Call once per frame.
    pub fn advance_frame(&mut self, now_secs: f64) -> Transition {
        self.frame_clock
            .advance(&mut self.transport, &self.time_context, now_secs)
    }

    // Tempo

    pub fn set_global_bpm(&mut self, bpm: f64) -> Transition {
        self.time_context.set_bpm(bpm);
        self.apply(Command::Resync)
    }

    pub fn set_beats_per_bar(&mut self, beats_per_bar: u32) {
        self.time_context.set_beats_per_bar(beats_per_bar);
    }

    /// Replace the tempo map; `None` returns to uniform tempo. An invalid map
    /// is rejected and the previous one stays active.
    pub fn set_master_tempo_map(
        &mut self,
        entries: Option<Vec<TempoMapEntry>>,
    ) -> Result<Transition, TimelineError> {
        let map = match entries {
            Some(entries) => TempoMap::new(entries)?,
            None => TempoMap::uniform(),
        };
        self.time_context.set_tempo_map(map);
        Ok(self.apply(Command::Resync))
    }

    // Tracks

    pub fn add_track(
        &mut self,
        id: TrackId,
        name: impl Into<String>,
    ) -> Result<&Track, TimelineError> {
        if self.track(id).is_some() {
            return Err(TimelineError::DuplicateTrack(id));
        }
        self.tracks.push(Track::new(id, name.into()));
        Ok(&self.tracks[self.tracks.len() - 1])
    }

    /// Remove a track along with its cached notes and any in-flight ingestion.
    pub fn remove_track(&mut self, id: TrackId) -> Result<Track, TimelineError> {
        let index = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TimelineError::UnknownTrack(id))?;
        self.notes.remove(id);
        self.pending_ingests.remove(&id);
        Ok(self.tracks.remove(index))
    }

    pub fn set_track_offset_ticks(&mut self, id: TrackId, ticks: i64) -> Result<(), TimelineError> {
        self.track_mut(id)?.set_offset_ticks(ticks);
        Ok(())
    }

    pub fn set_track_region_ticks(
        &mut self,
        id: TrackId,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<(), TimelineError> {
        self.track_mut(id)?.set_region_ticks(start, end);
        Ok(())
    }

    /// Restore a note cache persisted elsewhere, possibly at an old PPQ.
    pub fn restore_notes(
        &mut self,
        id: TrackId,
        notes: Vec<NoteRaw>,
        ppq: u64,
    ) -> Result<(), TimelineError> {
        self.track_mut(id)?;
        self.notes.insert_at_ppq(id, notes, ppq);
        self.notes.migrate();
        Ok(())
    }

    // Selectors

    pub fn time_context(&self) -> &TimeContext {
        &self.time_context
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn current_tick(&self) -> u64 {
        self.transport.current_tick()
    }

    pub fn current_time_sec(&self) -> f64 {
        self.transport.current_time_sec()
    }

    pub fn playhead_authority(&self) -> PlayheadAuthority {
        self.transport.authority()
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn position(&self) -> MusicalPosition {
        self.time_context.format_position(self.current_tick())
    }

    /// Loop bounds in seconds, when both are set.
    pub fn loop_range_seconds(&self) -> Option<(f64, f64)> {
        let start = self.transport.loop_start_tick()?;
        let end = self.transport.loop_end_tick()?;
        Some((
            self.time_context.ticks_to_seconds(start),
            self.time_context.ticks_to_seconds(end),
        ))
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn notes(&self, id: TrackId) -> Option<&[NoteRaw]> {
        self.notes.get(id)
    }

    pub fn track_offset_seconds(&self, id: TrackId) -> Result<f64, TimelineError> {
        let track = self.track(id).ok_or(TimelineError::UnknownTrack(id))?;
        Ok(self.time_context.ticks_to_seconds(track.offset_ticks()))
    }

    /// Notes of a track sounding within the absolute window `[start_tick, end_tick)`.
    pub fn notes_in_window(
        &self,
        id: TrackId,
        start_tick: u64,
        end_tick: u64,
    ) -> Result<Vec<ResolvedNote>, TimelineError> {
        let track = self.track(id).ok_or(TimelineError::UnknownTrack(id))?;
        let notes = self.notes.get(id).unwrap_or_default();
        Ok(resolve_window(notes, track, start_tick, end_tick))
    }

    /// Absolute tick where the last note on any track ends.
    pub fn content_end_tick(&self) -> u64 {
        self.tracks
            .iter()
            .filter_map(|track| {
                let notes = self.notes.get(track.id)?;
                resolve_window(notes, track, 0, u64::MAX)
                    .iter()
                    .map(|n| n.end_tick)
                    .max()
            })
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn track_mut(&mut self, id: TrackId) -> Result<&mut Track, TimelineError> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TimelineError::UnknownTrack(id))
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::with_config(&TimelineConfig::default())
    }
}

fn tick_to_i64(tick: u64) -> i64 {
    i64::try_from(tick).unwrap_or(i64::MAX)
}
