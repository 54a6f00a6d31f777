use cosmos_core::{ParticleSet, SimConfig};
use cosmos_physics::CosmologyState;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Bumped whenever the checkpoint layout changes
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode checkpoint: {0}")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode checkpoint: {0}")]
    Decode(#[source] bincode::Error),
    #[error("checkpoint format version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
}

/// Everything needed to resume a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: Uuid,
    pub format_version: u32,
    /// Scheduler frame the checkpoint was taken on
    pub frame: u64,
    pub time_scale: f64,
    pub reversed: bool,
    pub config: SimConfig,
    pub cosmology: CosmologyState,
    pub particles: ParticleSet,
}

impl Checkpoint {
    pub fn new(config: SimConfig, cosmology: CosmologyState, particles: ParticleSet) -> Self {
        Self {
            id: Uuid::new_v4(),
            format_version: FORMAT_VERSION,
            frame: 0,
            time_scale: 1.0,
            reversed: false,
            config,
            cosmology,
            particles,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        bincode::serialize(self).map_err(StorageError::Encode)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, StorageError> {
        let checkpoint: Checkpoint = bincode::deserialize(data).map_err(StorageError::Decode)?;
        if checkpoint.format_version != FORMAT_VERSION {
            return Err(StorageError::VersionMismatch {
                found: checkpoint.format_version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(checkpoint)
    }
}

/// Save a checkpoint to disk as bincode, creating parent directories
pub fn save_checkpoint(checkpoint: &Checkpoint, path: &Path) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let data = checkpoint.to_bytes()?;
    fs::write(path, data).map_err(io_err)
}

/// Load a checkpoint from disk
pub fn load_checkpoint(path: &Path) -> Result<Checkpoint, StorageError> {
    let data = fs::read(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Checkpoint::from_bytes(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmos_core::{CosmologyParams, EpochTable};
    use cosmos_physics::CosmologyEngine;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("cosmos_storage_{}", Uuid::new_v4()))
            .join(name)
    }

    fn sample() -> Checkpoint {
        let mut engine = CosmologyEngine::new(CosmologyParams::default(), EpochTable::standard());
        engine.jump_to_time(1e16);
        let mut particles = ParticleSet::new();
        particles.push([1.0, 2.0, 3.0], [0.1, 0.0, -0.1], 2.0, 300.0);
        particles.push([-1.0, 0.0, 0.5], [0.0; 3], 1.0, 0.0);
        particles.kill(1);
        Checkpoint::new(SimConfig::default(), engine.state().clone(), particles)
    }

    #[test]
    fn test_save_and_load() {
        let path = scratch_path("nested/run.bin");
        let checkpoint = sample();
        save_checkpoint(&checkpoint, &path).unwrap();
        let loaded = load_checkpoint(&path).unwrap();
        assert_eq!(loaded, checkpoint);
        assert!(!loaded.particles.is_alive(1));
        if let Some(dir) = path.parent().and_then(Path::parent) {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_rejects_other_format_version() {
        let mut checkpoint = sample();
        checkpoint.format_version = FORMAT_VERSION + 1;
        let bytes = checkpoint.to_bytes().unwrap();
        assert!(matches!(
            Checkpoint::from_bytes(&bytes),
            Err(StorageError::VersionMismatch { found, expected })
                if found == FORMAT_VERSION + 1 && expected == FORMAT_VERSION
        ));
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        let path = scratch_path("missing.bin");
        assert!(matches!(load_checkpoint(&path), Err(StorageError::Io { .. })));
        assert!(matches!(Checkpoint::from_bytes(&[1, 2, 3]), Err(StorageError::Decode(_))));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(sample().id, sample().id);
    }
}
