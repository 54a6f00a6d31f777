use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::vector::Vec3;

/// Structure-of-arrays particle storage.
///
/// Every array has the same length. A particle keeps its index for its whole
/// lifetime; killing it only clears `alive`, the other fields go stale.
/// Indices are only reassigned by [`ParticleSet::reset`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleSet {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub vx: Vec<f32>,
    pub vy: Vec<f32>,
    pub vz: Vec<f32>,
    pub mass: Vec<f32>,
    /// Kelvin
    pub temperature: Vec<f32>,
    /// Seconds since the particle was created
    pub age: Vec<f32>,
    pub alive: Vec<bool>,
}

impl ParticleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
            vx: Vec::with_capacity(capacity),
            vy: Vec::with_capacity(capacity),
            vz: Vec::with_capacity(capacity),
            mass: Vec::with_capacity(capacity),
            temperature: Vec::with_capacity(capacity),
            age: Vec::with_capacity(capacity),
            alive: Vec::with_capacity(capacity),
        }
    }

    /// Append a live particle and return its index
    pub fn push(&mut self, pos: Vec3, vel: Vec3, mass: f32, temperature: f32) -> usize {
        let index = self.len();
        self.x.push(pos[0]);
        self.y.push(pos[1]);
        self.z.push(pos[2]);
        self.vx.push(vel[0]);
        self.vy.push(vel[1]);
        self.vz.push(vel[2]);
        self.mass.push(mass);
        self.temperature.push(temperature);
        self.age.push(0.0);
        self.alive.push(true);
        index
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.alive.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        [self.x[i], self.y[i], self.z[i]]
    }

    #[inline]
    pub fn velocity(&self, i: usize) -> Vec3 {
        [self.vx[i], self.vy[i], self.vz[i]]
    }

    #[inline]
    pub fn is_alive(&self, i: usize) -> bool {
        self.alive[i]
    }

    pub fn kill(&mut self, i: usize) {
        self.alive[i] = false;
    }

    pub fn set_position(&mut self, i: usize, pos: Vec3) {
        self.x[i] = pos[0];
        self.y[i] = pos[1];
        self.z[i] = pos[2];
    }

    pub fn set_velocity(&mut self, i: usize, vel: Vec3) {
        self.vx[i] = vel[0];
        self.vy[i] = vel[1];
        self.vz[i] = vel[2];
    }

    /// Indices of live particles, ascending
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter_map(|(i, &alive)| alive.then_some(i))
    }

    pub fn count_alive(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// Drop dead particles and renumber the survivors. Any index held by a
    /// spatial structure or scheduler is invalid afterwards.
    pub fn reset(&mut self) {
        let keep: Vec<usize> = self.active_indices().collect();
        if keep.len() == self.len() {
            return;
        }
        fn compact<T: Copy>(v: &mut Vec<T>, keep: &[usize]) {
            let kept: Vec<T> = keep.iter().map(|&i| v[i]).collect();
            *v = kept;
        }
        compact(&mut self.x, &keep);
        compact(&mut self.y, &keep);
        compact(&mut self.z, &keep);
        compact(&mut self.vx, &keep);
        compact(&mut self.vy, &keep);
        compact(&mut self.vz, &keep);
        compact(&mut self.mass, &keep);
        compact(&mut self.temperature, &keep);
        compact(&mut self.age, &keep);
        compact(&mut self.alive, &keep);
    }

    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        self.z.clear();
        self.vx.clear();
        self.vy.clear();
        self.vz.clear();
        self.mass.clear();
        self.temperature.clear();
        self.age.clear();
        self.alive.clear();
    }

    /// Interleaved per-instance data for the renderer, live particles only
    pub fn pack_instances(&self) -> Vec<ParticleInstance> {
        self.active_indices()
            .map(|i| ParticleInstance {
                position: [self.x[i], self.y[i], self.z[i], self.mass[i]],
                velocity: [self.vx[i], self.vy[i], self.vz[i], self.temperature[i]],
            })
            .collect()
    }
}

/// GPU-compatible instance record.
/// Must be repr(C) and Pod for buffer upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    /// Position (x, y, z) + mass packed in w
    pub position: [f32; 4],
    /// Velocity (x, y, z) + temperature packed in w
    pub velocity: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParticleSet {
        let mut p = ParticleSet::new();
        p.push([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], 1.0, 10.0);
        p.push([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], 2.0, 20.0);
        p.push([4.0, 5.0, 6.0], [0.0, 0.0, 1.0], 3.0, 30.0);
        p
    }

    #[test]
    fn test_kill_keeps_indices() {
        let mut p = sample();
        p.kill(1);
        assert_eq!(p.len(), 3);
        assert_eq!(p.count_alive(), 2);
        assert_eq!(p.active_indices().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(p.position(2), [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_reset_compacts_all_arrays() {
        let mut p = sample();
        p.kill(0);
        p.reset();
        assert_eq!(p.len(), 2);
        assert_eq!(p.mass, vec![2.0, 3.0]);
        assert_eq!(p.vz, vec![0.0, 1.0]);
        assert!(p.alive.iter().all(|&a| a));
    }

    #[test]
    fn test_pack_instances_layout() {
        let mut p = sample();
        p.kill(2);
        let packed = p.pack_instances();
        assert_eq!(packed.len(), 2);
        assert_eq!(packed[1].position, [1.0, 2.0, 3.0, 2.0]);
        assert_eq!(packed[1].velocity, [0.0, 1.0, 0.0, 20.0]);
        let bytes: &[u8] = bytemuck::cast_slice(&packed);
        assert_eq!(bytes.len(), 2 * 32);
    }
}
