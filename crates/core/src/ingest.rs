use std::path::Path;

use timeline_ingest::{DecodedMidi, MidiDecoder, decode_midi_file, normalize};
use timeline_tempo::TempoMapEntry;

use crate::TimelineError;
use crate::timeline::Timeline;
use crate::track::TrackId;

/// Handle for an ingestion awaiting its decoder.
///
/// Only the most recent ticket for a track can complete. Starting another
/// ingestion, cancelling, or removing the track invalidates older tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestTicket {
    track_id: TrackId,
    generation: u64,
}

impl IngestTicket {
    pub fn track_id(&self) -> TrackId {
        self.track_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub track_id: TrackId,
    pub note_count: usize,
    pub orphan_count: usize,
    /// Tempo map carried by the source file. Not applied automatically; pass
    /// it to [`Timeline::set_master_tempo_map`] to adopt it.
    pub tempo_map: Option<Vec<TempoMapEntry>>,
}

impl Timeline {
    pub fn begin_ingest(&mut self, id: TrackId) -> Result<IngestTicket, TimelineError> {
        self.track_mut(id)?;
        self.next_ingest_generation += 1;
        let generation = self.next_ingest_generation;
        if self.pending_ingests.insert(id, generation).is_some() {
            log::debug!("ingestion for track {id} superseded");
        }
        Ok(IngestTicket { track_id: id, generation })
    }

    /// Discard an in-flight ingestion. Returns whether one was pending.
    pub fn cancel_ingest(&mut self, id: TrackId) -> bool {
        self.pending_ingests.remove(&id).is_some()
    }

    /// Normalize decoded events into the track's note cache, replacing
    /// whatever it held.
    pub fn complete_ingest(
        &mut self,
        ticket: IngestTicket,
        decoded: &DecodedMidi,
    ) -> Result<IngestReport, TimelineError> {
        let id = ticket.track_id;
        if self.pending_ingests.get(&id) != Some(&ticket.generation) {
            return Err(TimelineError::IngestCancelled(id));
        }
        self.pending_ingests.remove(&id);

        let normalized = normalize(decoded)?;
        let report = IngestReport {
            track_id: id,
            note_count: normalized.notes.len(),
            orphan_count: normalized.orphan_count,
            tempo_map: normalized.tempo_map,
        };
        self.notes.insert(id, normalized.notes);

        log::debug!("ingested {} notes into track {id}", report.note_count);
        Ok(report)
    }

    /// Decode a MIDI file and ingest it in one step.
    pub fn ingest_file(
        &mut self,
        id: TrackId,
        path: &Path,
        decoder: &dyn MidiDecoder,
    ) -> Result<IngestReport, TimelineError> {
        let ticket = self.begin_ingest(id)?;
        match decode_midi_file(path, decoder) {
            Ok(decoded) => self.complete_ingest(ticket, &decoded),
            Err(e) => {
                self.cancel_ingest(id);
                Err(TimelineError::Decode(e))
            }
        }
    }
}
