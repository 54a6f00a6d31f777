pub mod pipeline;
pub mod universe;

pub use pipeline::{CameraFocus, SimulationPlugin};
pub use universe::UniverseState;
