//! Uniform spatial hash grid for short-range neighbour queries.
//!
//! Cells are keyed by the floored cell coordinates of a position. The grid is
//! rebuilt from scratch every query cycle; there is no incremental update.
//! Every query looks at the 3x3x3 block of cells around the query point, so
//! anything farther than one cell away is invisible to it.

use std::collections::HashMap;

use cosmos_core::vector::{self, Vec3};
use cosmos_core::{GridConfig, ParticleSet, GRID_SPACING_FACTOR};
use tracing::debug;

pub type CellKey = (i32, i32, i32);

pub struct SpatialGrid {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<CellKey, Vec<u32>>,
    indexed: usize,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        let mut grid = Self {
            cell_size: 1.0,
            inv_cell_size: 1.0,
            cells: HashMap::new(),
            indexed: 0,
        };
        grid.set_cell_size(cell_size);
        grid
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(config.cell_size)
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Ignored unless finite and positive. Takes effect on the next build.
    pub fn set_cell_size(&mut self, cell_size: f32) {
        if cell_size.is_finite() && cell_size > 0.0 {
            self.cell_size = cell_size;
            self.inv_cell_size = 1.0 / cell_size;
        }
    }

    #[inline]
    pub fn cell_of(&self, pos: Vec3) -> CellKey {
        (
            (pos[0] * self.inv_cell_size).floor() as i32,
            (pos[1] * self.inv_cell_size).floor() as i32,
            (pos[2] * self.inv_cell_size).floor() as i32,
        )
    }

    /// Bucket every live particle with a finite position
    pub fn build(&mut self, particles: &ParticleSet) {
        self.cells.clear();
        self.indexed = 0;
        for i in particles.active_indices() {
            let pos = particles.position(i);
            if !vector::is_finite(pos) {
                continue;
            }
            let key = self.cell_of(pos);
            self.cells.entry(key).or_default().push(i as u32);
            self.indexed += 1;
        }
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn indexed_count(&self) -> usize {
        self.indexed
    }

    pub fn cell(&self, key: CellKey) -> &[u32] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate over all non-empty cells
    pub fn cells(&self) -> impl Iterator<Item = (CellKey, &[u32])> {
        self.cells.iter().map(|(&k, v)| (k, v.as_slice()))
    }

    /// Visit every particle in the 27 cells around `pos`
    pub fn for_each_neighbor(&self, pos: Vec3, mut f: impl FnMut(u32)) {
        let (cx, cy, cz) = self.cell_of(pos);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = (cx.wrapping_add(dx), cy.wrapping_add(dy), cz.wrapping_add(dz));
                    if let Some(bucket) = self.cells.get(&key) {
                        bucket.iter().copied().for_each(&mut f);
                    }
                }
            }
        }
    }

    /// Candidate neighbours: a superset of everything within one cell size
    pub fn neighbors(&self, pos: Vec3) -> Vec<u32> {
        let mut out = Vec::new();
        self.for_each_neighbor(pos, |i| out.push(i));
        out
    }

    /// Particles within `radius` of `pos`, with their squared distance.
    /// Radii larger than the cell size are cut short by the search window.
    pub fn query_radius(&self, particles: &ParticleSet, pos: Vec3, radius: f32) -> Vec<(u32, f32)> {
        let r2 = radius * radius;
        let mut out = Vec::new();
        self.for_each_neighbor(pos, |i| {
            let d2 = vector::distance_sq(particles.position(i as usize), pos);
            if d2 <= r2 {
                out.push((i, d2));
            }
        });
        out
    }

    /// Up to `n` closest particles in the search window, nearest first.
    ///
    /// Only the 3x3x3 window is searched, so sparse regions can return fewer
    /// than `n` results, or miss a closer particle just outside the window.
    pub fn find_nearest_n(
        &self,
        particles: &ParticleSet,
        pos: Vec3,
        n: usize,
        exclude: Option<u32>,
    ) -> Vec<(u32, f32)> {
        let mut candidates = Vec::new();
        self.for_each_neighbor(pos, |i| {
            if Some(i) != exclude {
                candidates.push((i, vector::distance_sq(particles.position(i as usize), pos)));
            }
        });
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        candidates.truncate(n);
        candidates
    }

    /// Estimate mean nearest-neighbour spacing from a bounded sample and set
    /// the cell size to a multiple of it. Returns the new cell size; the
    /// current one is kept when no spacing could be measured.
    pub fn optimize_cell_size(&mut self, particles: &ParticleSet, config: &GridConfig) -> f32 {
        let active: Vec<usize> = particles
            .active_indices()
            .filter(|&i| vector::is_finite(particles.position(i)))
            .collect();
        if active.len() < 2 || config.tune_sample_limit == 0 {
            return self.cell_size;
        }

        let stride = (active.len() / config.tune_sample_limit).max(1);
        let half_window = (config.tune_window / 2).max(1);

        let mut total = 0.0f64;
        let mut samples = 0usize;
        for s in (0..active.len()).step_by(stride).take(config.tune_sample_limit) {
            let pos = particles.position(active[s]);
            let lo = s.saturating_sub(half_window);
            let hi = (s + half_window + 1).min(active.len());

            let nearest_sq = active[lo..hi]
                .iter()
                .filter(|&&j| j != active[s])
                .map(|&j| vector::distance_sq(particles.position(j), pos))
                .filter(|&d2| d2 > 0.0)
                .fold(f32::INFINITY, f32::min);

            if nearest_sq.is_finite() {
                total += (nearest_sq as f64).sqrt();
                samples += 1;
            }
        }

        if samples == 0 {
            return self.cell_size;
        }
        let spacing = (total / samples as f64) as f32;
        let previous = self.cell_size;
        self.set_cell_size(spacing * GRID_SPACING_FACTOR);
        debug!(
            samples,
            spacing,
            previous,
            cell_size = self.cell_size,
            "grid cell size tuned"
        );
        self.cell_size
    }
}
