//! Timeline inspection tool
//!
//! Usage:
//!   timeline inspect <project>                  - Summarize a project file
//!   timeline convert <project> --tick 1920      - Tick to seconds and position
//!   timeline convert <project> --seconds 2.5    - Seconds to tick and position

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use timeline_core::{PlayheadAuthority, Timeline, load_project_metadata};

#[derive(Parser)]
#[command(name = "timeline", about = "Inspect timeline projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print project tempo, tracks and note counts
    Inspect {
        /// Project file (JSON or MessagePack)
        project: PathBuf,
    },
    /// Convert a playhead position using the project's tempo
    Convert {
        /// Project file (JSON or MessagePack)
        project: PathBuf,
        /// Position in canonical ticks
        #[arg(long, conflicts_with = "seconds")]
        tick: Option<i64>,
        /// Position in seconds
        #[arg(long)]
        seconds: Option<f64>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { project } => inspect(&project),
        Commands::Convert { project, tick, seconds } => convert(&project, tick, seconds),
    }
}

fn open(path: &Path) -> Result<Timeline> {
    Timeline::from_project(path).with_context(|| format!("failed to load {}", path.display()))
}

fn inspect(path: &Path) -> Result<()> {
    let metadata =
        load_project_metadata(path).with_context(|| format!("failed to read {}", path.display()))?;
    let timeline = open(path)?;
    let ctx = timeline.time_context();

    println!("{}", metadata.name);
    println!("  stored PPQ:    {}", metadata.ppq);
    println!("  tempo:         {:.2} bpm, {}/4", ctx.bpm(), ctx.beats_per_bar());
    println!("  tempo changes: {}", metadata.tempo_change_count);
    for entry in ctx.tempo_map().entries() {
        println!("    {:>8.3}s  {:.2} bpm", entry.time, entry.tempo);
    }
    println!("  tracks:        {}", metadata.track_count);

    for track in timeline.tracks() {
        let notes = timeline.notes(track.id).map_or(0, <[_]>::len);
        let offset = timeline.track_offset_seconds(track.id)?;
        println!(
            "    {} {:<16} {:>6} notes  offset {:.3}s ({})",
            track.id,
            track.name,
            notes,
            offset,
            ctx.format_position(track.offset_ticks())
        );
    }

    let end = timeline.content_end_tick();
    println!(
        "  content end:   tick {end}, {:.3}s, {}",
        ctx.ticks_to_seconds(end),
        ctx.format_position(end)
    );
    Ok(())
}

fn convert(path: &Path, tick: Option<i64>, seconds: Option<f64>) -> Result<()> {
    let mut timeline = open(path)?;

    match (tick, seconds) {
        (Some(tick), _) => {
            timeline.set_current_tick(tick, PlayheadAuthority::Tick);
        }
        (None, Some(seconds)) => {
            timeline.set_current_seconds(seconds);
        }
        (None, None) => bail!("pass either --tick or --seconds"),
    }

    log::debug!("playhead authority {:?}", timeline.playhead_authority());
    println!("tick:     {}", timeline.current_tick());
    println!("seconds:  {:.6}", timeline.current_time_sec());
    println!("position: {}", timeline.position());
    println!("tempo:    {:.2} bpm", timeline.time_context().tempo_at_tick(timeline.current_tick()));
    Ok(())
}
