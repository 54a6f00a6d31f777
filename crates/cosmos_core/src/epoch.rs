//! Epochs of cosmic history.
//!
//! The table is plain reference data: built once, handed to the cosmology
//! engine, never mutated. There is no process-wide instance.

use serde::{Deserialize, Serialize};

use crate::error::EpochTableError;

/// Presentation hints the renderer reads for an epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochHint {
    /// Dominant tint [r, g, b, a]
    pub color: [f32; 4],
    /// Sprite size multiplier
    pub particle_scale: f32,
    /// Overall exposure
    pub brightness: f32,
}

impl Default for EpochHint {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0, 1.0],
            particle_scale: 1.0,
            brightness: 1.0,
        }
    }
}

/// A named interval of cosmic time, in seconds since the Big Bang
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epoch {
    pub name: String,
    pub start: f64,
    pub end: f64,
    pub description: String,
    pub hint: EpochHint,
}

impl Epoch {
    pub fn new(name: &str, start: f64, end: f64, description: &str, hint: EpochHint) -> Self {
        Self {
            name: name.to_string(),
            start,
            end,
            description: description.to_string(),
            hint,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Linear progress of `time` through this epoch, 0 for zero-length epochs
    pub fn progress(&self, time: f64) -> f64 {
        let duration = self.duration();
        if !(duration > 0.0) || !duration.is_finite() {
            return 0.0;
        }
        ((time - self.start) / duration).clamp(0.0, 1.0)
    }
}

/// Epochs ordered by start time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochTable {
    epochs: Vec<Epoch>,
}

impl EpochTable {
    pub fn new(epochs: Vec<Epoch>) -> Result<Self, EpochTableError> {
        if epochs.is_empty() {
            return Err(EpochTableError::Empty);
        }
        for (index, epoch) in epochs.iter().enumerate() {
            let name = || epoch.name.clone();
            if !epoch.start.is_finite() {
                return Err(EpochTableError::NonFiniteStart { index, name: name() });
            }
            if epoch.end < epoch.start {
                return Err(EpochTableError::EndBeforeStart { index, name: name() });
            }
            if index > 0 && epoch.start < epochs[index - 1].start {
                return Err(EpochTableError::OutOfOrder { index, name: name() });
            }
        }
        Ok(Self { epochs })
    }

    /// Index of the epoch containing `time`: the last epoch whose start is
    /// <= time. Negative, NaN, or pre-table times map to the first epoch.
    pub fn active_index(&self, time: f64) -> usize {
        self.epochs
            .iter()
            .rposition(|e| e.start <= time)
            .unwrap_or(0)
    }

    pub fn get(&self, index: usize) -> Option<&Epoch> {
        self.epochs.get(index)
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Epoch> {
        self.epochs.iter()
    }

    /// Standard history from the Planck epoch to the far future
    pub fn standard() -> Self {
        let hint = |color: [f32; 4], particle_scale: f32, brightness: f32| EpochHint {
            color,
            particle_scale,
            brightness,
        };
        let epochs = vec![
            Epoch::new(
                "Planck Epoch",
                0.0,
                5.39e-44,
                "All four forces unified; known physics breaks down.",
                hint([1.0, 1.0, 1.0, 1.0], 3.0, 4.0),
            ),
            Epoch::new(
                "Grand Unification Epoch",
                5.39e-44,
                1e-36,
                "Gravity separates; strong and electroweak forces remain unified.",
                hint([1.0, 0.95, 0.9, 1.0], 2.8, 3.5),
            ),
            Epoch::new(
                "Inflationary Epoch",
                1e-36,
                1e-32,
                "Exponential expansion by at least 60 e-folds smooths space.",
                hint([1.0, 0.85, 0.6, 1.0], 2.5, 3.0),
            ),
            Epoch::new(
                "Electroweak Epoch",
                1e-32,
                1e-12,
                "Strong force separates; reheating fills space with hot plasma.",
                hint([1.0, 0.7, 0.4, 1.0], 2.2, 2.6),
            ),
            Epoch::new(
                "Quark Epoch",
                1e-12,
                1e-6,
                "Quarks, leptons and gluons form a quark-gluon plasma.",
                hint([1.0, 0.5, 0.3, 1.0], 2.0, 2.2),
            ),
            Epoch::new(
                "Hadron Epoch",
                1e-6,
                1.0,
                "Quarks bind into protons and neutrons.",
                hint([1.0, 0.55, 0.2, 1.0], 1.8, 1.9),
            ),
            Epoch::new(
                "Lepton Epoch",
                1.0,
                10.0,
                "Leptons dominate the mass of the universe; neutrinos decouple.",
                hint([0.9, 0.6, 0.3, 1.0], 1.6, 1.7),
            ),
            Epoch::new(
                "Big Bang Nucleosynthesis",
                10.0,
                1200.0,
                "Protons and neutrons fuse into helium, deuterium and lithium.",
                hint([1.0, 0.8, 0.3, 1.0], 1.5, 1.6),
            ),
            Epoch::new(
                "Photon Epoch",
                1200.0,
                1.1e13,
                "Photons dominate the energy budget of an opaque plasma.",
                hint([1.0, 0.65, 0.35, 1.0], 1.4, 1.4),
            ),
            Epoch::new(
                "Recombination",
                1.1e13,
                1.2e13,
                "Electrons bind to nuclei and the universe turns transparent.",
                hint([1.0, 0.45, 0.25, 1.0], 1.3, 1.2),
            ),
            Epoch::new(
                "Dark Ages",
                1.2e13,
                3.2e15,
                "No stars yet; dark matter halos slowly collapse.",
                hint([0.15, 0.1, 0.2, 1.0], 1.0, 0.3),
            ),
            Epoch::new(
                "Cosmic Dawn",
                3.2e15,
                3.2e16,
                "First stars ignite and reionize the intergalactic medium.",
                hint([0.5, 0.6, 1.0, 1.0], 1.0, 0.8),
            ),
            Epoch::new(
                "Galaxy Formation",
                3.2e16,
                2.9e17,
                "Galaxies merge and grow along the cosmic web.",
                hint([0.8, 0.85, 1.0, 1.0], 0.9, 1.0),
            ),
            Epoch::new(
                "Present Day",
                2.9e17,
                4.7e17,
                "Dark energy dominates and expansion accelerates.",
                hint([1.0, 1.0, 0.95, 1.0], 0.8, 1.0),
            ),
            Epoch::new(
                "Far Future",
                4.7e17,
                1e18,
                "Galaxy clusters drift apart; star formation winds down.",
                hint([0.6, 0.4, 0.4, 1.0], 0.7, 0.6),
            ),
        ];
        Self { epochs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(name: &str, start: f64, end: f64) -> Epoch {
        Epoch::new(name, start, end, "", EpochHint::default())
    }

    #[test]
    fn test_standard_table_is_valid() {
        let table = EpochTable::standard();
        let rebuilt = EpochTable::new(table.iter().cloned().collect());
        assert_eq!(rebuilt, Ok(table));
    }

    #[test]
    fn test_active_index_reverse_scan() {
        let table = EpochTable::new(vec![
            epoch("a", 0.0, 1.0),
            epoch("b", 1.0, 5.0),
            epoch("c", 5.0, 5.0),
            epoch("d", 5.0, 10.0),
        ])
        .unwrap();
        assert_eq!(table.active_index(0.5), 0);
        assert_eq!(table.active_index(1.0), 1);
        assert_eq!(table.active_index(4.99), 1);
        // Equal starts resolve to the later epoch
        assert_eq!(table.active_index(5.0), 3);
        assert_eq!(table.active_index(1e9), 3);
        assert_eq!(table.active_index(-1.0), 0);
        assert_eq!(table.active_index(f64::NAN), 0);
    }

    #[test]
    fn test_rejects_malformed_tables() {
        assert_eq!(EpochTable::new(Vec::new()), Err(EpochTableError::Empty));
        assert!(matches!(
            EpochTable::new(vec![epoch("a", 2.0, 1.0)]),
            Err(EpochTableError::EndBeforeStart { index: 0, .. })
        ));
        assert!(matches!(
            EpochTable::new(vec![epoch("a", 2.0, 3.0), epoch("b", 1.0, 3.0)]),
            Err(EpochTableError::OutOfOrder { index: 1, .. })
        ));
        assert!(matches!(
            EpochTable::new(vec![epoch("a", f64::NAN, 3.0)]),
            Err(EpochTableError::NonFiniteStart { index: 0, .. })
        ));
    }

    #[test]
    fn test_progress_guards_zero_duration() {
        assert_eq!(epoch("instant", 5.0, 5.0).progress(5.0), 0.0);
        assert_eq!(epoch("open", 0.0, f64::INFINITY).progress(10.0), 0.0);
        let e = epoch("span", 10.0, 20.0);
        assert!((e.progress(15.0) - 0.5).abs() < 1e-12);
        assert_eq!(e.progress(30.0), 1.0);
    }
}
