pub mod cache;
pub mod config;
pub mod ingest;
pub mod region;
pub mod timeline;
pub mod track;

pub use cache::NoteCache;
pub use config::{ConfigError, TimelineConfig};
pub use ingest::{IngestReport, IngestTicket};
pub use region::{ResolvedNote, resolve_window};
pub use timeline::Timeline;
pub use track::{Track, TrackId};

pub use timeline_ingest::{
    DecodedMidi, IngestError, MidiDecoder, MidiEventKind, NoteRaw, RawMidiEvent,
};
pub use timeline_project::{
    Project, ProjectError, ProjectMetadata, TrackData, load_project_metadata, save_project,
};
pub use timeline_tempo::{
    MusicalPosition, PPQN, TempoMap, TempoMapEntry, TempoMapError, TimeContext,
};
pub use timeline_transport::{
    Command, PlayheadAuthority, QuantizeMode, Transition, TransportState,
};

#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("unknown track {0}")]
    UnknownTrack(TrackId),

    #[error("track {0} already exists")]
    DuplicateTrack(TrackId),

    #[error("invalid tempo map: {0}")]
    TempoMap(#[from] TempoMapError),

    #[error("ingestion for track {0} was cancelled or superseded")]
    IngestCancelled(TrackId),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("decode failed: {0:#}")]
    Decode(anyhow::Error),

    #[error(transparent)]
    Project(#[from] ProjectError),
}
