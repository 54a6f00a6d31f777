use cosmos_core::{ParticleSet, SimConfig};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Mass of a baryonic tracer relative to a dark-matter one
const BARYON_MASS: f32 = 0.2;
const DARK_MATTER_MASS: f32 = 1.0;
/// Initial baryon temperature (K); dark matter carries none
const BARYON_TEMPERATURE: f32 = 1.0e4;

/// Seeded generator used for every reproducible initial condition
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Initial particle distribution: a uniform ball of radius
/// `initial_radius` expanding in a Hubble-like flow, dark matter first.
pub fn generate_big_bang(config: &SimConfig, rng: &mut impl Rng) -> ParticleSet {
    let n = config.particle_count as usize;
    let n_dark = ((n as f32 * config.dark_matter_fraction.clamp(0.0, 1.0)).round() as usize).min(n);
    let mut particles = ParticleSet::with_capacity(n);

    for i in 0..n {
        let dark = i < n_dark;
        let (pos, vel) = sample_particle(config.initial_radius, config.initial_velocity, rng);
        let (mass, temperature) = if dark {
            (DARK_MATTER_MASS, 0.0)
        } else {
            (BARYON_MASS, BARYON_TEMPERATURE)
        };
        let mass = mass * rng.gen_range(0.5..1.5f32);
        particles.push(pos, vel, mass, temperature);
    }

    debug!(particles = n, dark_matter = n_dark, "big bang generated");
    particles
}

fn sample_particle(radius: f32, max_speed: f32, rng: &mut impl Rng) -> ([f32; 3], [f32; 3]) {
    // Uniform direction on the sphere
    let theta = rng.gen_range(0.0..std::f32::consts::TAU);
    let cos_phi = rng.gen_range(-1.0..1.0f32);
    let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
    let dir = [sin_phi * theta.cos(), sin_phi * theta.sin(), cos_phi];

    // Cube root keeps the ball uniform in volume
    let fraction = rng.gen_range(0.0..1.0f32).cbrt();
    let r = radius.max(0.0) * fraction;

    // Outward speed grows with radius, plus a little thermal scatter
    let speed = max_speed.max(0.0) * fraction;
    let jitter = 0.05 * max_speed.max(0.0);
    let mut vel = [dir[0] * speed, dir[1] * speed, dir[2] * speed];
    if jitter > 0.0 {
        for v in &mut vel {
            *v += rng.gen_range(-jitter..jitter);
        }
    }

    ([dir[0] * r, dir[1] * r, dir[2] * r], vel)
}
