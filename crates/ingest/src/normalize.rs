//! Pair raw note events and bring them to canonical tick resolution.

use std::collections::{HashMap, VecDeque};

use timeline_tempo::{PPQN, TempoMapEntry};

use crate::note::{NoteRaw, scale_tick};
use crate::{DecodedMidi, IngestError, MidiEventKind};

/// Canonical-resolution output of [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMidi {
    /// Sorted by start tick, then note, then channel.
    pub notes: Vec<NoteRaw>,
    /// Always [`PPQN`]; downstream code never sees the source resolution.
    pub ticks_per_quarter: u64,
    /// Copied through from the decoder untouched.
    pub tempo_map: Option<Vec<TempoMapEntry>>,
    /// Note-ons that never saw a matching note-off.
    pub orphan_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct PendingNote {
    start_tick: u64,
    velocity: Option<u8>,
}

/// Convert a decoded payload into canonical-resolution notes.
///
/// Onsets are queued per `(note, channel)`: a retrigger before the note-off
/// opens a second onset instead of replacing the first, and each note-off
/// closes the oldest open onset. Onsets still open at the end are emitted
/// with a one-beat duration.
pub fn normalize(decoded: &DecodedMidi) -> Result<NormalizedMidi, IngestError> {
    if decoded.ticks_per_quarter == 0 {
        return Err(IngestError::ZeroResolution);
    }

    let source_ppq = decoded.ticks_per_quarter as u64;
    let scale = if source_ppq == PPQN {
        1.0
    } else {
        PPQN as f64 / source_ppq as f64
    };

    let mut events: Vec<_> = decoded.events.iter().collect();
    events.sort_by_key(|e| e.tick);

    let mut pending: HashMap<(u8, u8), VecDeque<PendingNote>> = HashMap::new();
    let mut notes = Vec::new();

    for event in events {
        let key = (event.note, event.channel);
        let tick = scale_tick(event.tick, scale);

        let closes = match event.kind {
            MidiEventKind::NoteOn => event.velocity == Some(0),
            MidiEventKind::NoteOff => true,
        };

        if !closes {
            pending.entry(key).or_default().push_back(PendingNote {
                start_tick: tick,
                velocity: event.velocity,
            });
            continue;
        }

        match pending.get_mut(&key).and_then(VecDeque::pop_front) {
            Some(open) => {
                notes.push(NoteRaw::new(
                    event.note,
                    event.channel,
                    open.start_tick,
                    tick,
                    open.velocity,
                ));
            }
            None => {
                log::debug!(
                    "note-off without onset: note {} channel {} at tick {}",
                    event.note,
                    event.channel,
                    event.tick
                );
            }
        }
    }

    let mut orphan_count = 0;
    for ((note, channel), queue) in pending {
        for open in queue {
            orphan_count += 1;
            notes.push(NoteRaw::new(
                note,
                channel,
                open.start_tick,
                open.start_tick.saturating_add(PPQN),
                open.velocity,
            ));
        }
    }

    if orphan_count > 0 {
        log::warn!("{orphan_count} note-on events had no note-off; closed after one beat");
    }

    notes.sort_by_key(|n| (n.start_tick, n.note, n.channel));

    Ok(NormalizedMidi {
        notes,
        ticks_per_quarter: PPQN,
        tempo_map: decoded.tempo_map.clone(),
        orphan_count,
    })
}
