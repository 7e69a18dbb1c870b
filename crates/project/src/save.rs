use crate::{Project, ProjectError};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Write `project` as pretty-printed JSON.
pub fn save_project(path: &Path, project: &Project) -> Result<(), ProjectError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, project)?;

    log::info!("saved project '{}' to {}", project.name, path.display());
    Ok(())
}

/// Write `project` as MessagePack.
pub fn save_project_msgpack(path: &Path, project: &Project) -> Result<(), ProjectError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    rmp_serde::encode::write_named(&mut writer, project)?;

    log::info!("saved project '{}' to {}", project.name, path.display());
    Ok(())
}
