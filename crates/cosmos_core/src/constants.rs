// Two unit systems live side by side:
// - Particle space uses simulation units (G = 1, distances in arbitrary
//   comoving units) so positions and masses stay f32-friendly.
// - The cosmological background uses SI seconds and Kelvin in f64, because
//   cosmic time spans 1e-43 s to 1e18 s.

/// Gravitational constant in simulation units
pub const G: f32 = 1.0;

/// Default softening length (epsilon) for tree gravity
pub const SOFTENING: f32 = 0.05;

/// Barnes-Hut opening angle (theta)
pub const BH_THETA: f32 = 0.5;

/// Default maximum particles held by an octree leaf before it subdivides
pub const MAX_PARTICLES_PER_LEAF: usize = 16;

/// Depth ceiling for octree subdivision; deeper leaves keep their overflow
pub const MAX_TREE_DEPTH: u32 = 20;

/// Default uniform grid cell size in simulation units
pub const GRID_CELL_SIZE: f32 = 2.0;

/// Nearest-neighbour spacing multiplier used when auto-tuning the grid
pub const GRID_SPACING_FACTOR: f32 = 2.5;

/// Squared camera-distance breakpoints for the update tiers
pub const TIER_BREAKPOINTS_SQ: [f32; 4] = [100.0, 500.0, 2000.0, 10000.0];

/// Frame-modulo cadence per update tier (critical .. minimal)
pub const TIER_CADENCES: [u32; 5] = [1, 2, 4, 8, 16];

/// Present-day CMB temperature (K)
pub const T_CMB_0: f64 = 2.7255;

/// Planck temperature (K)
pub const PLANCK_TEMPERATURE: f64 = 1.416_784e32;

/// Planck time (s)
pub const PLANCK_TIME: f64 = 5.391_247e-44;

/// Present age of the universe (s), ~13.8 Gyr
pub const AGE_OF_UNIVERSE: f64 = 4.354e17;

/// End of inflation (s)
pub const INFLATION_END: f64 = 1e-32;

/// Recombination (s), ~380 kyr
pub const RECOMBINATION_TIME: f64 = 1.2e13;

/// Fraction of the present age after which dark energy dominates expansion
pub const DARK_ENERGY_ONSET: f64 = 0.7;

/// e-folds of inflationary growth before INFLATION_END
pub const INFLATION_EFOLDS: f64 = 60.0;

/// Largest redshift exposed to consumers; the Planck epoch is not infinity
pub const MAX_REDSHIFT: f64 = 1e6;

/// Redshift above which H(z) switches to the radiation-only form
pub const HUBBLE_FALLBACK_REDSHIFT: f64 = 1e12;

/// Kilometres per megaparsec, for km/s/Mpc -> 1/s
pub const KM_PER_MPC: f64 = 3.085_677_581_491_367e19;

/// Seconds per year (Julian)
pub const SECONDS_PER_YEAR: f64 = 3.155_76e7;

/// Samples kept in each cosmology history ring buffer
pub const HISTORY_LEN: usize = 128;
