use crate::{Project, ProjectError, TrackData};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use timeline_ingest::rescale_notes;
use timeline_tempo::{PPQN, TempoMap};

/// A project ready to build a timeline from: tempo map validated, every tick
/// at canonical resolution.
#[derive(Debug)]
pub struct LoadedProject {
    pub name: String,
    pub bpm: f64,
    pub beats_per_bar: u32,
    pub tempo_map: TempoMap,
    pub tracks: Vec<TrackData>,
    /// PPQ the file was stored at, when it differed from [`PPQN`].
    pub migrated_from_ppq: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ProjectMetadata {
    pub name: String,
    pub ppq: u64,
    pub bpm: f64,
    pub beats_per_bar: u32,
    pub tempo_change_count: usize,
    pub track_count: usize,
    pub note_count: usize,
}

fn load_project_data(path: &Path) -> Result<Project, ProjectError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    // Try JSON first, fall back to MessagePack
    serde_json::from_reader(reader).or_else(|_| {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        rmp_serde::decode::from_read(reader).map_err(ProjectError::from)
    })
}

pub fn load_project_metadata(path: &Path) -> Result<ProjectMetadata, ProjectError> {
    let project = load_project_data(path)?;

    let note_count: usize = project.tracks.iter().map(|t| t.notes.len()).sum();

    Ok(ProjectMetadata {
        name: project.name,
        ppq: project.ppq,
        bpm: project.bpm,
        beats_per_bar: project.beats_per_bar,
        tempo_change_count: project.tempo_map.len(),
        track_count: project.tracks.len(),
        note_count,
    })
}

pub fn load_project(path: &Path) -> Result<LoadedProject, ProjectError> {
    let project = load_project_data(path)?;
    let tempo_map = TempoMap::new(project.tempo_map)?;

    let migrated_from_ppq = (project.ppq != PPQN && project.ppq != 0).then_some(project.ppq);
    let tracks = match migrated_from_ppq {
        Some(from_ppq) => project
            .tracks
            .into_iter()
            .map(|track| migrate_track(track, from_ppq))
            .collect(),
        None => project.tracks,
    };

    log::info!(
        "loaded project '{}' ({} tracks) from {}",
        project.name,
        tracks.len(),
        path.display()
    );

    Ok(LoadedProject {
        name: project.name,
        bpm: project.bpm,
        beats_per_bar: project.beats_per_bar,
        tempo_map,
        tracks,
        migrated_from_ppq,
    })
}

/// Bring a track stored at a stale resolution to canonical ticks.
fn migrate_track(track: TrackData, from_ppq: u64) -> TrackData {
    let scale = PPQN as f64 / from_ppq as f64;
    let rescale = |tick: u64| (tick as f64 * scale).round() as u64;

    TrackData {
        offset_ticks: rescale(track.offset_ticks),
        region_start_tick: track.region_start_tick.map(rescale),
        region_end_tick: track.region_end_tick.map(rescale),
        notes: rescale_notes(&track.notes, from_ppq),
        ..track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_project;
    use crate::{save_project, save_project_msgpack};
    use timeline_ingest::NoteRaw;
    use timeline_tempo::TempoMapEntry;
    use tempfile::tempdir;

    fn write_json(path: &Path, project: &Project) {
        let file = std::fs::File::create(path).expect("create");
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer(writer, project).expect("encode");
    }

    #[test]
    fn test_load_project_file_not_found() {
        let result = load_project(Path::new("/nonexistent/project.tlproj"));
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ProjectError::Io(_)));
    }

    #[test]
    fn test_load_project_invalid_format() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("invalid.tlproj");
        std::fs::write(&path, b"not valid json or msgpack").expect("write");

        let result = load_project(&path);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ProjectError::Deserialize(_)));
    }

    #[test]
    fn test_load_json_project() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("song.tlproj");
        save_project(&path, &sample_project()).expect("save");

        let loaded = load_project(&path).expect("load");

        assert_eq!(loaded.name, "Test Project");
        assert_eq!(loaded.tempo_map.len(), 2);
        assert_eq!(loaded.tracks[0].offset_ticks, 960);
        assert_eq!(loaded.migrated_from_ppq, None);
    }

    #[test]
    fn test_load_msgpack_project() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("song.tlproj");
        save_project_msgpack(&path, &sample_project()).expect("save");

        let loaded = load_project(&path).expect("load");

        assert_eq!(loaded.name, "Test Project");
        assert_eq!(loaded.tracks.len(), 2);
        assert_eq!(loaded.tracks[1].notes.len(), 1);
    }

    #[test]
    fn test_load_rejects_non_monotonic_tempo_map() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bad.tlproj");
        let mut project = sample_project();
        project.tempo_map = vec![TempoMapEntry::new(4.0, 120.0), TempoMapEntry::new(2.0, 90.0)];
        write_json(&path, &project);

        let result = load_project(&path);
        assert!(matches!(result, Err(ProjectError::TempoMap(_))));
    }

    #[test]
    fn test_load_migrates_stale_ppq() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("old.tlproj");
        let mut project = sample_project();
        project.ppq = 96;
        project.tracks = vec![TrackData {
            id: 7,
            name: "Old".to_string(),
            offset_ticks: 96,
            region_start_tick: Some(192),
            region_end_tick: None,
            notes: vec![NoteRaw::new(60, 0, 384, 480, Some(64))],
        }];
        write_json(&path, &project);

        let loaded = load_project(&path).expect("load");
        let track = &loaded.tracks[0];

        assert_eq!(loaded.migrated_from_ppq, Some(96));
        assert_eq!(track.offset_ticks, 480);
        assert_eq!(track.region_start_tick, Some(960));
        assert_eq!(track.notes[0].start_tick, 1920);
        assert_eq!(track.notes[0].duration_ticks, 480);
        assert_eq!(track.notes[0].start_beat, 4.0);
    }

    #[test]
    fn test_load_project_metadata() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("song.tlproj");
        save_project(&path, &sample_project()).expect("save");

        let metadata = load_project_metadata(&path).expect("metadata");

        assert_eq!(metadata.name, "Test Project");
        assert_eq!(metadata.ppq, PPQN);
        assert_eq!(metadata.track_count, 2);
        assert_eq!(metadata.note_count, 3);
        assert_eq!(metadata.tempo_change_count, 2);
    }
}
