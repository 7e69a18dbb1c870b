use serde::{Deserialize, Serialize};
use timeline_tempo::PPQN;

/// A paired note at canonical resolution.
///
/// Built once at ingestion and never edited afterwards; the only exception is
/// the bulk [`rescale_notes`] migration of a cache stored at a stale PPQ.
/// Always construct through [`NoteRaw::new`] so the derived fields agree with
/// the ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteRaw {
    pub note: u8,
    pub channel: u8,
    pub start_tick: u64,
    pub end_tick: u64,
    /// `max(0, end_tick - start_tick)`
    pub duration_ticks: u64,
    pub start_beat: f64,
    pub end_beat: f64,
    pub velocity: Option<u8>,
}

impl NoteRaw {
    pub fn new(
        note: u8,
        channel: u8,
        start_tick: u64,
        end_tick: u64,
        velocity: Option<u8>,
    ) -> Self {
        Self {
            note,
            channel,
            start_tick,
            end_tick,
            duration_ticks: end_tick.saturating_sub(start_tick),
            start_beat: start_tick as f64 / PPQN as f64,
            end_beat: end_tick as f64 / PPQN as f64,
            velocity,
        }
    }

    pub fn duration_beats(&self) -> f64 {
        self.duration_ticks as f64 / PPQN as f64
    }
}

/// Scale a raw tick by a resolution ratio, rounding to the nearest tick.
pub(crate) fn scale_tick(tick: u64, scale: f64) -> u64 {
    if scale == 1.0 {
        tick
    } else {
        (tick as f64 * scale).round() as u64
    }
}

/// Rescale a note list stored at `from_ppq` into canonical resolution.
///
/// A list already at [`PPQN`] comes back unchanged. A `from_ppq` of zero
/// cannot be interpreted and also leaves the notes untouched.
pub fn rescale_notes(notes: &[NoteRaw], from_ppq: u64) -> Vec<NoteRaw> {
    if from_ppq == PPQN {
        return notes.to_vec();
    }
    if from_ppq == 0 {
        log::warn!("note cache tagged with PPQ 0; leaving {} notes unscaled", notes.len());
        return notes.to_vec();
    }

    let scale = PPQN as f64 / from_ppq as f64;
    log::warn!(
        "migrating {} notes from PPQ {from_ppq} to {PPQN}",
        notes.len()
    );

    notes
        .iter()
        .map(|n| {
            NoteRaw::new(
                n.note,
                n.channel,
                scale_tick(n.start_tick, scale),
                scale_tick(n.end_tick, scale),
                n.velocity,
            )
        })
        .collect()
}
