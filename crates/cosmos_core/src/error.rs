use thiserror::Error;

/// Rejected configuration values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("opening angle {0} is outside [0, 1]")]
    ThetaOutOfRange(f32),
    #[error("leaf capacity must be at least 1")]
    ZeroLeafCapacity,
    #[error("softening length {0} must be finite and non-negative")]
    InvalidSoftening(f32),
    #[error("maximum interaction distance {0} must be finite and positive")]
    InvalidInteractionDistance(f32),
    #[error("grid cell size {0} must be finite and positive")]
    InvalidCellSize(f32),
    #[error("tier breakpoints must be strictly increasing, got {0:?}")]
    UnorderedBreakpoints([f32; 4]),
    #[error("tier cadence for tier {0} must be at least 1")]
    ZeroCadence(usize),
    #[error("Hubble constant {0} must be finite and positive")]
    InvalidHubbleConstant(f64),
    #[error("density parameter {name} = {value} is not finite")]
    NonFiniteDensity { name: &'static str, value: f64 },
}

/// Rejected epoch tables
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EpochTableError {
    #[error("epoch table is empty")]
    Empty,
    #[error("epoch {index} ({name}) has a non-finite start time")]
    NonFiniteStart { index: usize, name: String },
    #[error("epoch {index} ({name}) ends before it starts")]
    EndBeforeStart { index: usize, name: String },
    #[error("epoch {index} ({name}) starts before the previous epoch")]
    OutOfOrder { index: usize, name: String },
}
