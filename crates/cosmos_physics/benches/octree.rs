//! Octree build and force evaluation.
//!
//! Run with: `cargo bench -p cosmos_physics`

use cosmos_core::{GravityConfig, SimConfig};
use cosmos_physics::procgen::{generate_big_bang, seeded_rng};
use cosmos_physics::{Octree, SpatialGrid};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn universe(particle_count: u32) -> cosmos_core::ParticleSet {
    let config = SimConfig {
        particle_count,
        ..SimConfig::default()
    };
    generate_big_bang(&config, &mut seeded_rng(config.seed))
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("octree_build");
    for n in [1_000u32, 10_000, 50_000] {
        let particles = universe(n);
        let mut tree = Octree::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &particles, |b, p| {
            b.iter(|| tree.build(black_box(p)))
        });
    }
    group.finish();
}

fn bench_forces(c: &mut Criterion) {
    let mut group = c.benchmark_group("octree_forces");
    let particles = universe(10_000);
    let indices: Vec<u32> = (0..particles.len() as u32).step_by(10).collect();
    for theta in [0.3f32, 0.5, 0.8] {
        let mut tree = Octree::new(GravityConfig {
            theta,
            ..GravityConfig::default()
        });
        tree.build(&particles);
        group.bench_with_input(BenchmarkId::from_parameter(theta), &indices, |b, idx| {
            b.iter(|| black_box(tree.forces_for(&particles, idx)))
        });
    }
    group.finish();
}

fn bench_grid(c: &mut Criterion) {
    let particles = universe(10_000);
    let mut grid = SpatialGrid::new(2.0);
    c.bench_function("grid_build_10k", |b| b.iter(|| grid.build(black_box(&particles))));
}

criterion_group!(benches, bench_build, bench_forces, bench_grid);
criterion_main!(benches);
