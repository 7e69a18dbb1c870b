use std::collections::HashMap;

use timeline_ingest::{NoteRaw, rescale_notes};
use timeline_tempo::PPQN;

use crate::track::TrackId;

#[derive(Debug, Clone)]
struct CachedNotes {
    ppq: u64,
    notes: Vec<NoteRaw>,
}

/// Per-track note storage, each entry tagged with the PPQ it was written at.
#[derive(Debug, Clone, Default)]
pub struct NoteCache {
    entries: HashMap<TrackId, CachedNotes>,
}

impl NoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store canonical-resolution notes for a track, replacing any previous entry.
    pub fn insert(&mut self, track_id: TrackId, notes: Vec<NoteRaw>) {
        self.insert_at_ppq(track_id, notes, PPQN);
    }

    /// Store notes written at an arbitrary resolution. They stay stale until
    /// [`NoteCache::migrate`] runs.
    pub fn insert_at_ppq(&mut self, track_id: TrackId, notes: Vec<NoteRaw>, ppq: u64) {
        self.entries.insert(track_id, CachedNotes { ppq, notes });
    }

    /// Notes for a track. Stale entries are hidden until migrated.
    pub fn get(&self, track_id: TrackId) -> Option<&[NoteRaw]> {
        self.entries
            .get(&track_id)
            .filter(|entry| entry.ppq == PPQN)
            .map(|entry| entry.notes.as_slice())
    }

    pub fn remove(&mut self, track_id: TrackId) -> Option<Vec<NoteRaw>> {
        self.entries.remove(&track_id).map(|entry| entry.notes)
    }

    /// Rescale every stale entry to [`PPQN`], once. Returns how many entries
    /// were migrated. Entries tagged with PPQ 0 cannot be scaled and stay
    /// hidden.
    pub fn migrate(&mut self) -> usize {
        let mut migrated = 0;
        for (track_id, entry) in self.entries.iter_mut() {
            if entry.ppq == PPQN {
                continue;
            }
            if entry.ppq == 0 {
                log::warn!(
                    "note cache for track {track_id} tagged with PPQ 0; {} notes stay hidden",
                    entry.notes.len()
                );
                continue;
            }
            log::warn!("note cache for track {track_id} stored at PPQ {}", entry.ppq);
            entry.notes = rescale_notes(&entry.notes, entry.ppq);
            entry.ppq = PPQN;
            migrated += 1;
        }
        migrated
    }
}
