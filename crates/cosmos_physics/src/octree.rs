//! Barnes-Hut octree over the particle arrays.
//!
//! Nodes live in a pool owned by the tree and are addressed by [`NodeId`].
//! A rebuild rewinds the pool cursor and reuses the existing nodes (and their
//! leaf index buffers); the pool only ever grows.
//!
//! Build order matters for aggregation: children are always allocated after
//! their parent, so walking the used part of the pool backwards visits every
//! child before its parent.

use cosmos_core::vector::{self, Aabb, Octant, Vec3};
use cosmos_core::{GravityConfig, ParticleSet};
use tracing::{debug, trace};

/// Minimum padding added around the particle bounds
const MIN_BOUNDS_PADDING: f32 = 1e-3;

/// Separations below this are treated as self-interaction
const SELF_DISTANCE_SQ: f32 = 1e-12;

/// Handle into the node pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(u32);

impl NodeId {
    fn new(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize, "NodeId overflow");
        NodeId(index as u32)
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct Node {
    bounds: Aabb,
    /// Squared side length, compared against theta² · d²
    size_sq: f32,
    depth: u32,
    mass: f32,
    /// Valid only when mass > 0
    com: Vec3,
    children: Option<[NodeId; 8]>,
    /// Member particle indices, leaves only
    particles: Vec<u32>,
}

impl Node {
    fn new(bounds: Aabb, depth: u32) -> Self {
        let side = bounds.max_extent();
        Self {
            bounds,
            size_sq: side * side,
            depth,
            mass: 0.0,
            com: bounds.center(),
            children: None,
            particles: Vec::new(),
        }
    }

    /// Reinitialise a pooled node, keeping its index buffer allocation
    fn reset(&mut self, bounds: Aabb, depth: u32) {
        let side = bounds.max_extent();
        self.bounds = bounds;
        self.size_sq = side * side;
        self.depth = depth;
        self.mass = 0.0;
        self.com = bounds.center();
        self.children = None;
        self.particles.clear();
    }
}

/// Shape of the most recent build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctreeStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: u32,
    pub particles: usize,
    /// Allocated pool size, >= nodes
    pub pool_capacity: usize,
}

pub struct Octree {
    config: GravityConfig,
    theta_sq: f32,
    cutoff_sq: Option<f32>,
    softening_sq: f32,
    nodes: Vec<Node>,
    /// Pool cursor: nodes[..used] belong to the current tree
    used: usize,
    root: Option<NodeId>,
    indexed: usize,
    max_depth_reached: u32,
}

impl Default for Octree {
    fn default() -> Self {
        Self::new(GravityConfig::default())
    }
}

impl Octree {
    pub fn new(config: GravityConfig) -> Self {
        let mut tree = Self {
            config,
            theta_sq: 0.0,
            cutoff_sq: None,
            softening_sq: 0.0,
            nodes: Vec::new(),
            used: 0,
            root: None,
            indexed: 0,
            max_depth_reached: 0,
        };
        tree.refresh_cached();
        tree
    }

    pub fn config(&self) -> &GravityConfig {
        &self.config
    }

    /// Replace the configuration. Leaf capacity and depth changes only take
    /// effect on the next build.
    pub fn set_config(&mut self, config: GravityConfig) {
        self.config = config;
        self.config.theta = self.config.theta.clamp(0.0, 1.0);
        self.refresh_cached();
    }

    pub fn theta(&self) -> f32 {
        self.config.theta
    }

    /// Clamp theta to [0, 1]. NaN leaves the current value in place.
    pub fn set_theta(&mut self, theta: f32) {
        if theta.is_nan() {
            return;
        }
        self.config.theta = theta.clamp(0.0, 1.0);
        self.refresh_cached();
    }

    fn refresh_cached(&mut self) {
        self.theta_sq = self.config.theta * self.config.theta;
        self.softening_sq = self.config.softening * self.config.softening;
        self.cutoff_sq = self.config.max_interaction_distance.map(|d| d * d);
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Rebuild the tree from every live particle with a finite position.
    ///
    /// Positions must not change until the caller is done querying.
    pub fn build(&mut self, particles: &ParticleSet) {
        self.used = 0;
        self.root = None;
        self.indexed = 0;
        self.max_depth_reached = 0;

        let bounds = Aabb::from_points(particles.active_indices().map(|i| particles.position(i)));
        let Some(bounds) = bounds else {
            trace!("octree build skipped: no finite particle positions");
            return;
        };

        let root = self.alloc(
            bounds
                .padded(self.config.bounds_padding, MIN_BOUNDS_PADDING)
                .cubed(),
            0,
        );
        self.root = Some(root);

        for i in particles.active_indices() {
            let pos = particles.position(i);
            if !vector::is_finite(pos) {
                continue;
            }
            self.insert(root, i as u32, pos, particles);
            self.indexed += 1;
        }

        self.aggregate(particles);

        debug!(
            nodes = self.used,
            particles = self.indexed,
            depth = self.max_depth_reached,
            "octree built"
        );
    }

    fn alloc(&mut self, bounds: Aabb, depth: u32) -> NodeId {
        let id = NodeId::new(self.used);
        if self.used < self.nodes.len() {
            self.nodes[self.used].reset(bounds, depth);
        } else {
            self.nodes.push(Node::new(bounds, depth));
        }
        self.used += 1;
        self.max_depth_reached = self.max_depth_reached.max(depth);
        id
    }

    fn insert(&mut self, start: NodeId, index: u32, pos: Vec3, particles: &ParticleSet) {
        let mut id = start;
        while let Some(children) = self.nodes[id.index()].children {
            let center = self.nodes[id.index()].bounds.center();
            id = children[Octant::of(pos, center).index()];
        }

        let node = &mut self.nodes[id.index()];
        node.particles.push(index);
        if node.particles.len() > self.config.max_particles_per_leaf
            && node.depth < self.config.max_depth
        {
            self.subdivide(id, particles);
        }
    }

    /// Turn a leaf into an internal node and push its members down one level
    fn subdivide(&mut self, id: NodeId, particles: &ParticleSet) {
        let bounds = self.nodes[id.index()].bounds;
        let depth = self.nodes[id.index()].depth;

        let mut children = [NodeId(0); 8];
        for octant in Octant::ALL {
            children[octant.index()] = self.alloc(bounds.octant_bounds(octant), depth + 1);
        }

        let mut members = std::mem::take(&mut self.nodes[id.index()].particles);
        self.nodes[id.index()].children = Some(children);

        let center = bounds.center();
        for &index in &members {
            let pos = particles.position(index as usize);
            let child = children[Octant::of(pos, center).index()];
            self.insert(child, index, pos, particles);
        }

        // Hand the emptied buffer back so the pool keeps its allocation
        members.clear();
        self.nodes[id.index()].particles = members;
    }

    /// Bottom-up mass and center of mass
    fn aggregate(&mut self, particles: &ParticleSet) {
        for i in (0..self.used).rev() {
            let mut mass = 0.0f64;
            let mut weighted = [0.0f64; 3];

            match self.nodes[i].children {
                Some(children) => {
                    for child in children {
                        let c = &self.nodes[child.index()];
                        if c.mass > 0.0 {
                            let m = c.mass as f64;
                            mass += m;
                            weighted[0] += c.com[0] as f64 * m;
                            weighted[1] += c.com[1] as f64 * m;
                            weighted[2] += c.com[2] as f64 * m;
                        }
                    }
                }
                None => {
                    for &j in &self.nodes[i].particles {
                        let j = j as usize;
                        let m = particles.mass[j] as f64;
                        mass += m;
                        weighted[0] += particles.x[j] as f64 * m;
                        weighted[1] += particles.y[j] as f64 * m;
                        weighted[2] += particles.z[j] as f64 * m;
                    }
                }
            }

            let node = &mut self.nodes[i];
            node.mass = mass as f32;
            if mass > 0.0 {
                node.com = [
                    (weighted[0] / mass) as f32,
                    (weighted[1] / mass) as f32,
                    (weighted[2] / mass) as f32,
                ];
            }
        }
    }

    /// Softened gravitational force on particle `index`.
    ///
    /// Returns zero for an empty tree. `index` must be in range for the
    /// particle set the tree was built from.
    pub fn force(&self, particles: &ParticleSet, index: usize) -> Vec3 {
        vector::scale(self.acceleration(particles, index), particles.mass[index])
    }

    /// Gravitational acceleration (force per unit mass) on particle `index`
    pub fn acceleration(&self, particles: &ParticleSet, index: usize) -> Vec3 {
        let Some(root) = self.root else {
            return [0.0; 3];
        };
        let pos = particles.position(index);
        if !vector::is_finite(pos) {
            return [0.0; 3];
        }
        let mut field = [0.0f32; 3];
        self.accumulate(root, index, pos, particles, &mut field);
        vector::scale(field, self.config.g)
    }

    /// Forces for a working set, in the order given
    pub fn forces_for(&self, particles: &ParticleSet, indices: &[u32]) -> Vec<Vec3> {
        indices
            .iter()
            .map(|&i| self.force(particles, i as usize))
            .collect()
    }

    fn accumulate(
        &self,
        id: NodeId,
        index: usize,
        pos: Vec3,
        particles: &ParticleSet,
        field: &mut Vec3,
    ) {
        let node = &self.nodes[id.index()];
        if node.mass <= 0.0 {
            return;
        }
        if let Some(cutoff_sq) = self.cutoff_sq {
            if box_distance_sq(&node.bounds, pos) > cutoff_sq {
                return;
            }
        }

        let Some(children) = node.children else {
            for &j in &node.particles {
                let j = j as usize;
                if j == index {
                    continue;
                }
                let d = vector::sub(particles.position(j), pos);
                self.add_point_mass(field, d, particles.mass[j]);
            }
            return;
        };

        let d = vector::sub(node.com, pos);
        let dist_sq = vector::length_sq(d);
        if node.size_sq < self.theta_sq * dist_sq {
            self.add_point_mass(field, d, node.mass);
        } else {
            for child in children {
                self.accumulate(child, index, pos, particles, field);
            }
        }
    }

    #[inline]
    fn add_point_mass(&self, field: &mut Vec3, d: Vec3, mass: f32) {
        let r2 = vector::length_sq(d);
        if r2 < SELF_DISTANCE_SQ {
            return;
        }
        if let Some(cutoff_sq) = self.cutoff_sq {
            if r2 > cutoff_sq {
                return;
            }
        }
        let s = r2 + self.softening_sq;
        let f = mass / (s * s.sqrt());
        field[0] += f * d[0];
        field[1] += f * d[1];
        field[2] += f * d[2];
    }

    /// Total mass of indexed particles
    pub fn total_mass(&self) -> f32 {
        self.root.map_or(0.0, |r| self.nodes[r.index()].mass)
    }

    pub fn center_of_mass(&self) -> Option<Vec3> {
        let root = &self.nodes[self.root?.index()];
        (root.mass > 0.0).then_some(root.com)
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.root.map(|r| self.nodes[r.index()].bounds)
    }

    pub fn stats(&self) -> OctreeStats {
        let nodes = &self.nodes[..self.used];
        OctreeStats {
            nodes: self.used,
            leaves: nodes.iter().filter(|n| n.children.is_none()).count(),
            max_depth: self.max_depth_reached,
            particles: self.indexed,
            pool_capacity: self.nodes.len(),
        }
    }

    /// Largest leaf occupancy in the current tree
    pub fn max_leaf_occupancy(&self) -> usize {
        self.nodes[..self.used]
            .iter()
            .filter(|n| n.children.is_none())
            .map(|n| n.particles.len())
            .max()
            .unwrap_or(0)
    }
}

/// Squared distance from `p` to the closest point of `b` (0 inside)
#[inline]
fn box_distance_sq(b: &Aabb, p: Vec3) -> f32 {
    let mut d2 = 0.0;
    for axis in 0..3 {
        let v = p[axis];
        let excess = if v < b.min[axis] {
            b.min[axis] - v
        } else if v > b.max[axis] {
            v - b.max[axis]
        } else {
            0.0
        };
        d2 += excess * excess;
    }
    d2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(theta: f32, leaf: usize, softening: f32) -> GravityConfig {
        GravityConfig {
            theta,
            max_particles_per_leaf: leaf,
            softening,
            ..GravityConfig::default()
        }
    }

    fn line_of(n: usize) -> ParticleSet {
        let mut p = ParticleSet::new();
        for i in 0..n {
            p.push([i as f32, (i % 3) as f32, (i % 5) as f32], [0.0; 3], 1.0, 0.0);
        }
        p
    }

    #[test]
    fn test_empty_tree_returns_zero() {
        let mut tree = Octree::default();
        let mut particles = ParticleSet::new();
        tree.build(&particles);
        assert!(tree.is_empty());
        assert_eq!(tree.total_mass(), 0.0);

        // Query particle added after the (empty) build
        particles.push([1.0, 2.0, 3.0], [0.0; 3], 1.0, 0.0);
        assert_eq!(tree.force(&particles, 0), [0.0; 3]);
    }

    #[test]
    fn test_all_non_finite_is_empty() {
        let mut particles = ParticleSet::new();
        particles.push([f32::NAN, 0.0, 0.0], [0.0; 3], 1.0, 0.0);
        particles.push([0.0, f32::INFINITY, 0.0], [0.0; 3], 1.0, 0.0);
        let mut tree = Octree::default();
        tree.build(&particles);
        assert!(tree.is_empty());
        assert_eq!(tree.force(&particles, 0), [0.0; 3]);
        assert_eq!(tree.force(&particles, 1), [0.0; 3]);
    }

    #[test]
    fn test_two_body_matches_softened_formula() {
        let mut particles = ParticleSet::new();
        particles.push([0.0, 0.0, 0.0], [0.0; 3], 2.0, 0.0);
        particles.push([3.0, 0.0, 0.0], [0.0; 3], 5.0, 0.0);
        let eps = 0.5f32;
        let mut tree = Octree::new(config(0.5, 16, eps));
        tree.build(&particles);

        let f = tree.force(&particles, 0);
        let expected = 2.0 * 5.0 / (9.0f32 + eps * eps).powf(1.5) * 3.0;
        assert!((f[0] - expected).abs() < 1e-5, "{} vs {}", f[0], expected);
        assert_eq!(f[1], 0.0);
        let g = tree.force(&particles, 1);
        assert!((f[0] + g[0]).abs() < 1e-5);
    }

    #[test]
    fn test_dead_and_non_finite_particles_are_ignored() {
        let mut particles = line_of(4);
        particles.push([f32::NAN, 0.0, 0.0], [0.0; 3], 100.0, 0.0);
        particles.push([2.0, 2.0, 2.0], [0.0; 3], 100.0, 0.0);
        particles.kill(5);
        let mut tree = Octree::default();
        tree.build(&particles);
        assert_eq!(tree.stats().particles, 4);
        assert!((tree.total_mass() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_leaf_capacity_respected() {
        let particles = line_of(200);
        let mut tree = Octree::new(config(0.5, 4, 0.01));
        tree.build(&particles);
        let stats = tree.stats();
        assert!(stats.nodes > 1);
        assert_eq!(stats.particles, 200);
        assert!(tree.max_leaf_occupancy() <= 4);
        assert!((tree.total_mass() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_depth_ceiling_retains_coincident_particles() {
        let mut particles = ParticleSet::new();
        for _ in 0..10 {
            particles.push([1.0, 1.0, 1.0], [0.0; 3], 1.0, 0.0);
        }
        particles.push([5.0, 5.0, 5.0], [0.0; 3], 1.0, 0.0);
        let mut tree = Octree::new(GravityConfig {
            max_particles_per_leaf: 2,
            max_depth: 6,
            ..GravityConfig::default()
        });
        tree.build(&particles);
        let stats = tree.stats();
        assert_eq!(stats.max_depth, 6);
        assert_eq!(stats.particles, 11);
        assert_eq!(tree.max_leaf_occupancy(), 10);

        // Coincident particles do not pull on each other
        let f = tree.force(&particles, 0);
        assert!(f.iter().all(|c| c.is_finite()));
        assert!(f[0] > 0.0);
    }

    #[test]
    fn test_pool_is_reused_and_never_shrinks() {
        let mut tree = Octree::new(config(0.5, 2, 0.01));
        tree.build(&line_of(300));
        let big = tree.stats();
        tree.build(&line_of(10));
        let small = tree.stats();
        assert!(small.nodes < big.nodes);
        assert_eq!(small.pool_capacity, big.pool_capacity);
    }

    #[test]
    fn test_set_theta_clamps() {
        let mut tree = Octree::default();
        tree.set_theta(3.0);
        assert_eq!(tree.theta(), 1.0);
        tree.set_theta(-1.0);
        assert_eq!(tree.theta(), 0.0);
        tree.set_theta(f32::NAN);
        assert_eq!(tree.theta(), 0.0);
        tree.set_theta(0.7);
        assert_eq!(tree.theta(), 0.7);
    }

    #[test]
    fn test_theta_change_affects_next_query() {
        let mut particles = ParticleSet::new();
        particles.push([0.0, 0.0, 0.0], [0.0; 3], 1.0, 0.0);
        for i in 0..20 {
            let a = i as f32 * 0.3;
            particles.push([40.0 + a.cos(), a.sin(), (a * 2.0).sin()], [0.0; 3], 1.0, 0.0);
        }
        let mut tree = Octree::new(config(0.0, 1, 0.0));
        tree.build(&particles);
        let exact = tree.force(&particles, 0);
        tree.set_theta(1.0);
        let approx = tree.force(&particles, 0);
        assert_ne!(exact, approx);
        assert!((exact[0] - approx[0]).abs() / exact[0].abs() < 0.05);
    }

    #[test]
    fn test_interaction_cutoff_skips_far_mass() {
        let mut particles = ParticleSet::new();
        particles.push([0.0, 0.0, 0.0], [0.0; 3], 1.0, 0.0);
        particles.push([1.0, 0.0, 0.0], [0.0; 3], 1.0, 0.0);
        particles.push([-50.0, 0.0, 0.0], [0.0; 3], 1000.0, 0.0);
        let mut tree = Octree::new(GravityConfig {
            max_particles_per_leaf: 1,
            softening: 0.0,
            max_interaction_distance: Some(10.0),
            ..GravityConfig::default()
        });
        tree.build(&particles);
        let f = tree.force(&particles, 0);
        assert!((f[0] - 1.0).abs() < 1e-5, "far mass leaked into {:?}", f);
    }
}
