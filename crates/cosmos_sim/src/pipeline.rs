use bevy::prelude::*;
use cosmos_core::vector::Vec3;

use super::universe::UniverseState;

/// Point the viewer is looking from; update tiers follow it
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraFocus {
    pub position: Vec3,
}

/// Bevy plugin for the simulation pipeline
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraFocus>()
            .add_systems(Update, (sync_camera, simulation_tick).chain());
    }
}

fn sync_camera(focus: Res<CameraFocus>, mut universe: ResMut<UniverseState>) {
    if focus.is_changed() {
        universe.camera = focus.position;
    }
}

/// Main simulation tick advances cosmology and particles
fn simulation_tick(mut universe: ResMut<UniverseState>, time: Res<Time>) {
    let dt = time.delta_secs_f64();
    universe.tick(dt);
}
