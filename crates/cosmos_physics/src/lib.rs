pub mod cosmology;
pub mod grid;
pub mod octree;
pub mod procgen;
pub mod scheduler;

pub use cosmology::{
    CosmicStage, CosmologyEngine, CosmologySnapshot, CosmologyState, DensityFractions,
    ScaleFactorModel,
};
pub use grid::SpatialGrid;
pub use octree::{Octree, OctreeStats};
pub use procgen::generate_big_bang;
pub use scheduler::{UpdateScheduler, UpdateTier};
