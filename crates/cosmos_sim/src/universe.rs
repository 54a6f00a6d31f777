use bevy::prelude::*;
use cosmos_core::vector::{self, Vec3};
use cosmos_core::{ConfigError, EpochTable, ParticleSet, SimConfig};
use cosmos_physics::procgen::{generate_big_bang, seeded_rng};
use cosmos_physics::{CosmologyEngine, CosmologySnapshot, Octree, SpatialGrid, UpdateScheduler};
use cosmos_storage::Checkpoint;

/// Tiers are reassigned at least this often even if the camera is still
const RETIER_INTERVAL: u64 = 30;
/// Camera movement (squared) that forces a tier reassignment
const CAMERA_RETIER_DISTANCE_SQ: f32 = 1.0;
/// Dead particles are compacted away every this many frames
const COMPACT_INTERVAL: u64 = 600;
/// Largest particle step per frame, in simulation units
const MAX_PARTICLE_DT: f32 = 0.05;
/// Bound on the per-frame Hubble drag factor
const MAX_STEP_EXPANSION: f64 = 2.0;

/// Whole simulation state, tracked as a Bevy Resource
#[derive(Resource)]
pub struct UniverseState {
    pub config: SimConfig,
    pub particles: ParticleSet,
    pub cosmology: CosmologyEngine,
    pub octree: Octree,
    pub grid: SpatialGrid,
    pub scheduler: UpdateScheduler,
    /// Whether simulation is paused
    pub paused: bool,
    /// Run cosmic time backwards
    pub reversed: bool,
    /// Cosmic seconds per real second
    pub time_scale: f64,
    /// Where the viewer is; drives tier assignment
    pub camera: Vec3,
    last_tier_camera: Option<Vec3>,
    frame: u64,
    /// Incremented whenever particle indices are renumbered
    pub particles_generation: u32,
}

impl UniverseState {
    /// Placeholder with no particles
    pub fn empty(config: SimConfig) -> Self {
        Self::with_particles(config, ParticleSet::new())
    }

    /// Validate the config and generate the initial particle ball from its seed
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let particles = generate_big_bang(&config, &mut seeded_rng(config.seed));
        Ok(Self::with_particles(config, particles))
    }

    pub fn with_particles(config: SimConfig, particles: ParticleSet) -> Self {
        let cosmology = CosmologyEngine::new(config.cosmology, EpochTable::standard());
        let mut grid = SpatialGrid::from_config(&config.grid);
        grid.build(&particles);
        Self {
            octree: Octree::new(config.gravity.clone()),
            scheduler: UpdateScheduler::new(config.scheduler.clone()),
            grid,
            cosmology,
            particles,
            config,
            paused: false,
            reversed: false,
            time_scale: 1.0,
            camera: [0.0; 3],
            last_tier_camera: None,
            frame: 0,
            particles_generation: 0,
        }
    }

    /// Resume from a checkpoint
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self, ConfigError> {
        checkpoint.config.validate()?;
        let mut state = Self::with_particles(checkpoint.config, checkpoint.particles);
        state.cosmology = CosmologyEngine::from_state(
            state.config.cosmology,
            EpochTable::standard(),
            checkpoint.cosmology,
        );
        state.time_scale = checkpoint.time_scale;
        state.reversed = checkpoint.reversed;
        state.frame = checkpoint.frame;
        Ok(state)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        let mut checkpoint = Checkpoint::new(
            self.config.clone(),
            self.cosmology.state().clone(),
            self.particles.clone(),
        );
        checkpoint.frame = self.frame;
        checkpoint.time_scale = self.time_scale;
        checkpoint.reversed = self.reversed;
        checkpoint
    }

    /// Advance one frame of `dt` real seconds. Returns the cosmology snapshot,
    /// or `None` when paused.
    pub fn tick(&mut self, dt: f64) -> Option<CosmologySnapshot> {
        if self.paused || !dt.is_finite() || dt <= 0.0 {
            return None;
        }

        let cosmic_dt = dt * self.time_scale;
        let expansion = self
            .cosmology
            .expansion_ratio(cosmic_dt, self.reversed)
            .clamp(1.0 / MAX_STEP_EXPANSION, MAX_STEP_EXPANSION);
        let previous_epoch = self.cosmology.current().epoch_index;
        let snapshot = self.cosmology.update(cosmic_dt, self.reversed);
        if snapshot.epoch_changed {
            self.on_epoch_changed(previous_epoch, &snapshot);
        }

        self.frame = self.frame.wrapping_add(1);
        self.tick_particles(dt as f32, expansion as f32);

        if self.frame % COMPACT_INTERVAL == 0 {
            self.compact_particles();
        }

        Some(snapshot)
    }

    /// Gravity and integration for this frame's working set
    fn tick_particles(&mut self, dt: f32, expansion: f32) {
        if self.particles.is_empty() {
            return;
        }

        let camera_moved = self
            .last_tier_camera
            .is_none_or(|last| vector::distance_sq(last, self.camera) > CAMERA_RETIER_DISTANCE_SQ);
        if camera_moved || self.frame % RETIER_INTERVAL == 0 {
            self.scheduler.assign_tiers(&self.particles, self.camera);
            self.last_tier_camera = Some(self.camera);
        }

        self.octree.build(&self.particles);

        let step = dt.min(MAX_PARTICLE_DT);
        let step = if self.reversed { -step } else { step };
        self.scheduler.select_for_update();
        let scheduler = &self.scheduler;
        let selected = scheduler.selected();

        for &i in selected {
            // Slow tiers cover the frames they skipped, drag included
            let cadence = scheduler
                .tier_of(i)
                .map_or(1, |t| t.cadence(&self.config.scheduler.cadences));
            let h = step * cadence as f32;
            let drag = expansion.powi(cadence as i32);
            let i = i as usize;
            let accel = self.octree.acceleration(&self.particles, i);

            // Semi-implicit Euler, peculiar velocity decays as 1/a
            let v = self.particles.velocity(i);
            let v = vector::scale(vector::add(v, vector::scale(accel, h)), 1.0 / drag);
            let pos = vector::add(self.particles.position(i), vector::scale(v, h));
            self.particles.set_velocity(i, v);
            self.particles.set_position(i, pos);
            self.particles.age[i] += h.abs();
        }
    }

    fn on_epoch_changed(&mut self, previous: usize, snapshot: &CosmologySnapshot) {
        let name = |index: usize| {
            self.cosmology
                .epochs()
                .get(index)
                .map_or("unknown", |e| e.name.as_str())
                .to_string()
        };
        info!(
            "Epoch transition: {} -> {} (t = {:.3e} s, z = {:.3e}, T = {:.3e} K)",
            name(previous),
            name(snapshot.epoch_index),
            snapshot.time,
            snapshot.redshift,
            snapshot.temperature
        );

        if self.config.grid.auto_tune {
            let previous = self.grid.cell_size();
            let cell_size = self.grid.optimize_cell_size(&self.particles, &self.config.grid);
            if cell_size != previous {
                info!("Grid cell size retuned: {:.4} -> {:.4}", previous, cell_size);
            }
        }
        self.grid.build(&self.particles);
    }

    /// Drop dead particles and renumber the survivors
    pub fn compact_particles(&mut self) {
        let before = self.particles.len();
        let after = self.particles.count_alive();
        if before == after {
            return;
        }
        self.particles.reset();
        self.last_tier_camera = None;
        self.particles_generation = self.particles_generation.wrapping_add(1);
        self.grid.build(&self.particles);
        info!(
            "Compacted particles: {} -> {} (removed {})",
            before,
            after,
            before - after
        );
    }

    /// Jump the clock to the start of an epoch
    pub fn jump_to_epoch(&mut self, index: usize) -> Option<CosmologySnapshot> {
        let previous = self.cosmology.current().epoch_index;
        let snapshot = self.cosmology.jump_to_epoch(index)?;
        if snapshot.epoch_changed {
            self.on_epoch_changed(previous, &snapshot);
        }
        Some(snapshot)
    }

    pub fn set_time_scale(&mut self, time_scale: f64) {
        if time_scale.is_finite() && time_scale >= 0.0 {
            self.time_scale = time_scale;
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn alive_count(&self) -> usize {
        self.particles.count_alive()
    }

    /// Centroid of the most populated grid cell
    pub fn find_densest_cluster(&mut self) -> Option<Vec3> {
        self.grid.build(&self.particles);
        let (_, members) = self.grid.cells().max_by_key(|(_, members)| members.len())?;

        let mut sum = [0.0f64; 3];
        for &i in members {
            let p = self.particles.position(i as usize);
            for k in 0..3 {
                sum[k] += p[k] as f64;
            }
        }
        let n = members.len() as f64;
        Some([(sum[0] / n) as f32, (sum[1] / n) as f32, (sum[2] / n) as f32])
    }

    /// Nearest live particle to `pos`, searching the grid window first
    pub fn find_nearest_particle(&mut self, pos: Vec3) -> Option<(usize, Vec3)> {
        self.grid.build(&self.particles);
        if let Some(&(i, _)) = self.grid.find_nearest_n(&self.particles, pos, 1, None).first() {
            let i = i as usize;
            return Some((i, self.particles.position(i)));
        }

        // Nothing in the window: fall back to a full scan
        self.particles
            .active_indices()
            .filter(|&i| vector::is_finite(self.particles.position(i)))
            .min_by(|&a, &b| {
                let da = vector::distance_sq(self.particles.position(a), pos);
                let db = vector::distance_sq(self.particles.position(b), pos);
                da.total_cmp(&db)
            })
            .map(|i| (i, self.particles.position(i)))
    }
}
