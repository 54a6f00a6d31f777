use std::path::PathBuf;
use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use cosmos_core::SimConfig;
use cosmos_sim::pipeline::SimulationPlugin;
use cosmos_sim::universe::UniverseState;
use cosmos_storage::{load_checkpoint, save_checkpoint};

/// Cosmic seconds per real second for a fresh run
const DEFAULT_TIME_SCALE: f64 = 1.0e13;
/// Frames between progress reports and checkpoint saves
const REPORT_INTERVAL: u64 = 600;

/// Where to resume from and save to, from `COSMOS_CHECKPOINT`
#[derive(Resource)]
struct CheckpointPath(Option<PathBuf>);

fn main() {
    let checkpoint_path = std::env::var_os("COSMOS_CHECKPOINT").map(PathBuf::from);

    let universe = match resume_or_start(checkpoint_path.as_ref()) {
        Ok(universe) => universe,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 60.0,
            ))),
        )
        .add_plugins(LogPlugin::default())
        .insert_resource(universe)
        .insert_resource(CheckpointPath(checkpoint_path))
        .add_plugins(SimulationPlugin)
        .add_systems(Update, report_progress)
        .run();
}

fn resume_or_start(path: Option<&PathBuf>) -> Result<UniverseState, cosmos_core::ConfigError> {
    if let Some(path) = path.filter(|p| p.exists()) {
        match load_checkpoint(path) {
            Ok(checkpoint) => {
                eprintln!("Resuming checkpoint {} from {}", checkpoint.id, path.display());
                return UniverseState::from_checkpoint(checkpoint);
            }
            Err(e) => eprintln!("Ignoring unreadable checkpoint: {e}"),
        }
    }
    let mut universe = UniverseState::new(SimConfig::default())?;
    universe.set_time_scale(DEFAULT_TIME_SCALE);
    Ok(universe)
}

fn report_progress(universe: Res<UniverseState>, checkpoint_path: Res<CheckpointPath>) {
    let frame = universe.frame();
    if frame == 0 || frame % REPORT_INTERVAL != 0 {
        return;
    }

    let snap = universe.cosmology.current();
    let epoch = universe
        .cosmology
        .epochs()
        .get(snap.epoch_index)
        .map_or("unknown", |e| e.name.as_str());
    info!(
        "frame {} | {} ({:.0}%) | t = {:.3e} yr | z = {:.3e} | T = {:.3e} K | {} particles | {:.0}% skipped",
        frame,
        epoch,
        snap.epoch_progress * 100.0,
        snap.time_years(),
        snap.redshift,
        snap.temperature,
        universe.alive_count(),
        universe.scheduler.skip_ratio() * 100.0
    );

    if let Some(path) = &checkpoint_path.0 {
        if let Err(e) = save_checkpoint(&universe.checkpoint(), path) {
            warn!("Checkpoint save failed: {e}");
        }
    }
}
