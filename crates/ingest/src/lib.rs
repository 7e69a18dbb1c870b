mod normalize;
mod note;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use timeline_tempo::TempoMapEntry;

pub use normalize::{NormalizedMidi, normalize};
pub use note::{NoteRaw, rescale_notes};

const MIDI_ROOT: &str = "midi";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiEventKind {
    NoteOn,
    NoteOff,
}

/// One note event as produced by the decoder, at the source resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMidiEvent {
    pub kind: MidiEventKind,
    pub note: u8,
    pub channel: u8,
    pub velocity: Option<u8>,
    pub tick: u64,
    /// Seconds as computed by the decoder. Informational only.
    pub time: f64,
}

/// Decoder output: raw events plus the resolution they are expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMidi {
    pub events: Vec<RawMidiEvent>,
    pub ticks_per_quarter: u32,
    pub tempo_map: Option<Vec<TempoMapEntry>>,
}

/// Byte-level MIDI decoding lives outside this workspace; anything that can
/// turn file bytes into a [`DecodedMidi`] plugs in here.
pub trait MidiDecoder {
    fn decode(&self, bytes: &[u8]) -> anyhow::Result<DecodedMidi>;
}

impl<F> MidiDecoder for F
where
    F: Fn(&[u8]) -> anyhow::Result<DecodedMidi>,
{
    fn decode(&self, bytes: &[u8]) -> anyhow::Result<DecodedMidi> {
        self(bytes)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("source resolution of 0 ticks per quarter note")]
    ZeroResolution,
}

/// Resolve a MIDI path to an existing file.
/// Accepts paths as given or relative to the midi root (e.g. `drums/groove.mid`).
pub fn resolve_midi_path(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }

    let with_root = Path::new(MIDI_ROOT).join(path);
    if with_root.exists() {
        return Some(with_root);
    }

    None
}

/// Read a MIDI file and hand its bytes to `decoder`.
pub fn decode_midi_file(path: &Path, decoder: &dyn MidiDecoder) -> anyhow::Result<DecodedMidi> {
    let resolved = resolve_midi_path(path)
        .ok_or_else(|| anyhow::anyhow!("midi file not found: {}", path.display()))?;
    let bytes = std::fs::read(&resolved)
        .with_context(|| format!("failed to read {}", resolved.display()))?;
    decoder
        .decode(&bytes)
        .with_context(|| format!("failed to decode {}", resolved.display()))
}
