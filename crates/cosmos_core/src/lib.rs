pub mod config;
pub mod constants;
pub mod epoch;
pub mod error;
pub mod particle;
pub mod vector;

pub use config::*;
pub use constants::*;
pub use epoch::{Epoch, EpochHint, EpochTable};
pub use error::{ConfigError, EpochTableError};
pub use particle::{ParticleInstance, ParticleSet};
pub use vector::{Aabb, Octant, Vec3};
