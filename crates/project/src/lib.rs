mod load;
mod save;

use serde::{Deserialize, Serialize};
use timeline_ingest::NoteRaw;
use timeline_tempo::{DEFAULT_BEATS_PER_BAR, PPQN, TempoMapEntry, TempoMapError};

pub use load::{LoadedProject, ProjectMetadata, load_project, load_project_metadata};
pub use save::{save_project, save_project_msgpack};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    /// Resolution every tick in this file is expressed in.
    #[serde(default = "default_ppq")]
    pub ppq: u64,
    pub bpm: f64,
    #[serde(default = "default_beats_per_bar")]
    pub beats_per_bar: u32,
    #[serde(default)]
    pub tempo_map: Vec<TempoMapEntry>,
    pub tracks: Vec<TrackData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackData {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub offset_ticks: u64,
    #[serde(default)]
    pub region_start_tick: Option<u64>,
    #[serde(default)]
    pub region_end_tick: Option<u64>,
    #[serde(default)]
    pub notes: Vec<NoteRaw>,
}

fn default_ppq() -> u64 {
    PPQN
}

fn default_beats_per_bar() -> u32 {
    DEFAULT_BEATS_PER_BAR
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] rmp_serde::encode::Error),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] rmp_serde::decode::Error),

    #[error("Invalid tempo map: {0}")]
    TempoMap(#[from] TempoMapError),
}
