use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of particles at Big Bang
    pub particle_count: u32,
    /// Random seed for deterministic simulation
    pub seed: u64,
    /// Radius of the initial particle sphere
    pub initial_radius: f32,
    /// Initial outward velocity range
    pub initial_velocity: f32,
    /// Dark matter fraction (0.0 - 1.0)
    pub dark_matter_fraction: f32,
    pub gravity: GravityConfig,
    pub grid: GridConfig,
    pub scheduler: SchedulerConfig,
    pub cosmology: CosmologyParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            particle_count: 20_000,
            seed: 42,
            initial_radius: 50.0,
            initial_velocity: 2.0,
            dark_matter_fraction: 0.84,
            gravity: GravityConfig::default(),
            grid: GridConfig::default(),
            scheduler: SchedulerConfig::default(),
            cosmology: CosmologyParams::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gravity.validate()?;
        self.grid.validate()?;
        self.scheduler.validate()?;
        self.cosmology.validate()
    }
}

/// Barnes-Hut octree settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GravityConfig {
    /// Gravitational constant
    pub g: f32,
    /// Opening angle, 0 = exact direct sum, 1 = coarsest
    pub theta: f32,
    /// Leaf occupancy that triggers subdivision
    pub max_particles_per_leaf: usize,
    /// Subdivision stops at this depth; deeper leaves keep every particle
    pub max_depth: u32,
    /// Softening length (epsilon), added in quadrature to the separation
    pub softening: f32,
    /// Nodes farther than this are ignored entirely
    pub max_interaction_distance: Option<f32>,
    /// Root box padding as a fraction of the particle extent
    pub bounds_padding: f32,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self {
            g: G,
            theta: BH_THETA,
            max_particles_per_leaf: MAX_PARTICLES_PER_LEAF,
            max_depth: MAX_TREE_DEPTH,
            softening: SOFTENING,
            max_interaction_distance: None,
            bounds_padding: 0.01,
        }
    }
}

impl GravityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.theta) {
            return Err(ConfigError::ThetaOutOfRange(self.theta));
        }
        if self.max_particles_per_leaf == 0 {
            return Err(ConfigError::ZeroLeafCapacity);
        }
        if !self.softening.is_finite() || self.softening < 0.0 {
            return Err(ConfigError::InvalidSoftening(self.softening));
        }
        if let Some(d) = self.max_interaction_distance {
            if !d.is_finite() || d <= 0.0 {
                return Err(ConfigError::InvalidInteractionDistance(d));
            }
        }
        Ok(())
    }
}

/// Uniform grid settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub cell_size: f32,
    /// Re-derive the cell size from particle spacing after epoch transitions
    pub auto_tune: bool,
    /// Upper bound on particles sampled by the spacing estimate
    pub tune_sample_limit: usize,
    /// Each sample is compared against this many neighbours in index order
    pub tune_window: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: GRID_CELL_SIZE,
            auto_tune: true,
            tune_sample_limit: 1000,
            tune_window: 50,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }
        Ok(())
    }
}

/// Update-tier breakpoints and cadences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Squared camera distances separating critical/high/medium/low/minimal
    pub breakpoints_sq: [f32; 4],
    /// A tier is updated on frames where `frame % cadence == 0`
    pub cadences: [u32; 5],
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            breakpoints_sq: TIER_BREAKPOINTS_SQ,
            cadences: TIER_CADENCES,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.breakpoints_sq.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::UnorderedBreakpoints(self.breakpoints_sq));
        }
        if let Some(tier) = self.cadences.iter().position(|&c| c == 0) {
            return Err(ConfigError::ZeroCadence(tier));
        }
        Ok(())
    }
}

/// Background cosmology parameters. Replaced wholesale, never patched mid-step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CosmologyParams {
    /// Hubble constant (km/s/Mpc)
    pub h0: f64,
    /// Total matter density fraction
    pub omega_m: f64,
    /// Dark energy density fraction
    pub omega_lambda: f64,
    /// Baryon fraction (display only, included in omega_m)
    pub omega_b: f64,
    /// Dark matter fraction (display only, included in omega_m)
    pub omega_dm: f64,
    /// Radiation density fraction
    pub omega_r: f64,
    /// Curvature density fraction
    pub omega_k: f64,
    /// Dark energy equation of state
    pub w: f64,
    /// Scalar spectral index (structure-formation display only)
    pub n_s: f64,
    /// Power spectrum normalisation (structure-formation display only)
    pub sigma_8: f64,
}

impl Default for CosmologyParams {
    /// Planck 2018 best fit
    fn default() -> Self {
        Self {
            h0: 67.4,
            omega_m: 0.315,
            omega_lambda: 0.685,
            omega_b: 0.049,
            omega_dm: 0.266,
            omega_r: 9.1e-5,
            omega_k: 0.0,
            w: -1.0,
            n_s: 0.965,
            sigma_8: 0.811,
        }
    }
}

impl CosmologyParams {
    /// Flat Lambda-CDM without radiation: omega_lambda = 1 - omega_m
    pub fn flat_lcdm(h0: f64, omega_m: f64) -> Self {
        Self {
            h0,
            omega_m,
            omega_lambda: 1.0 - omega_m,
            omega_r: 0.0,
            omega_k: 0.0,
            w: -1.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.h0.is_finite() || self.h0 <= 0.0 {
            return Err(ConfigError::InvalidHubbleConstant(self.h0));
        }
        let fields = [
            ("omega_m", self.omega_m),
            ("omega_lambda", self.omega_lambda),
            ("omega_b", self.omega_b),
            ("omega_dm", self.omega_dm),
            ("omega_r", self.omega_r),
            ("omega_k", self.omega_k),
            ("w", self.w),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteDensity { name, value });
            }
        }
        Ok(())
    }
}
