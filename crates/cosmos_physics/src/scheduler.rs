use cosmos_core::vector::{self, Vec3};
use cosmos_core::{ParticleSet, SchedulerConfig};

/// Update priority by camera distance, nearest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateTier {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
    Minimal = 4,
}

impl UpdateTier {
    pub const ALL: [UpdateTier; 5] = [
        UpdateTier::Critical,
        UpdateTier::High,
        UpdateTier::Medium,
        UpdateTier::Low,
        UpdateTier::Minimal,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Minimal => "minimal",
        }
    }

    /// Update period in frames; a zero cadence runs every frame
    #[inline]
    pub fn cadence(self, cadences: &[u32; 5]) -> u64 {
        cadences[self.index()].max(1) as u64
    }

    /// Tier for a squared camera distance
    pub fn from_distance_sq(d2: f32, breakpoints_sq: &[f32; 4]) -> Self {
        // NaN distances fall through to Minimal
        match breakpoints_sq.iter().position(|&b| d2 < b) {
            Some(i) => Self::ALL[i],
            None => Self::Minimal,
        }
    }
}

/// Splits live particles into distance tiers and picks which tiers run on
/// each frame.
///
/// Tier assignment is rebuilt from scratch whenever the caller asks; the only
/// state carried between frames is the frame counter.
pub struct UpdateScheduler {
    config: SchedulerConfig,
    tiers: [Vec<u32>; 5],
    selected: Vec<u32>,
    frame: u64,
    assigned: usize,
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl UpdateScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            tiers: Default::default(),
            selected: Vec::new(),
            frame: 0,
            assigned: 0,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Replace breakpoints and cadences. Current tiers stay as assigned.
    pub fn set_config(&mut self, config: SchedulerConfig) {
        self.config = config;
    }

    /// Bucket every live particle by squared distance to `camera`
    pub fn assign_tiers(&mut self, particles: &ParticleSet, camera: Vec3) {
        for tier in &mut self.tiers {
            tier.clear();
        }
        for i in particles.active_indices() {
            let d2 = vector::distance_sq(particles.position(i), camera);
            let tier = UpdateTier::from_distance_sq(d2, &self.config.breakpoints_sq);
            self.tiers[tier.index()].push(i as u32);
        }
        self.assigned = self.tiers.iter().map(Vec::len).sum();
    }

    /// Whether `tier` runs on frame `frame`
    pub fn is_due(&self, tier: UpdateTier, frame: u64) -> bool {
        frame % tier.cadence(&self.config.cadences) == 0
    }

    /// Particles to update this frame, then advance the frame counter.
    ///
    /// Call at most once per rendered frame, or the cadences drift.
    pub fn select_for_update(&mut self) -> &[u32] {
        self.selected.clear();
        let frame = self.frame;
        for tier in UpdateTier::ALL {
            if tier == UpdateTier::Critical || self.is_due(tier, frame) {
                self.selected.extend_from_slice(&self.tiers[tier.index()]);
            }
        }
        self.frame = self.frame.wrapping_add(1);
        &self.selected
    }

    /// The most recent selection
    pub fn selected(&self) -> &[u32] {
        &self.selected
    }

    pub fn tier(&self, tier: UpdateTier) -> &[u32] {
        &self.tiers[tier.index()]
    }

    pub fn tier_counts(&self) -> [usize; 5] {
        std::array::from_fn(|i| self.tiers[i].len())
    }

    /// Tier of particle `index` in the current assignment
    pub fn tier_of(&self, index: u32) -> Option<UpdateTier> {
        UpdateTier::ALL
            .into_iter()
            .find(|t| self.tiers[t.index()].binary_search(&index).is_ok())
    }

    /// Frame counter value the next selection will use
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned
    }

    /// Fraction of assigned particles left out of the last selection.
    /// Diagnostic only.
    pub fn skip_ratio(&self) -> f32 {
        if self.assigned == 0 {
            return 0.0;
        }
        1.0 - self.selected.len() as f32 / self.assigned as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One particle per tier along the x axis
    fn tiered_particles() -> ParticleSet {
        let mut p = ParticleSet::new();
        for x in [5.0, 15.0, 30.0, 60.0, 200.0] {
            p.push([x, 0.0, 0.0], [0.0; 3], 1.0, 0.0);
        }
        p
    }

    #[test]
    fn test_breakpoints() {
        let b = cosmos_core::TIER_BREAKPOINTS_SQ;
        assert_eq!(UpdateTier::from_distance_sq(0.0, &b), UpdateTier::Critical);
        assert_eq!(UpdateTier::from_distance_sq(99.9, &b), UpdateTier::Critical);
        assert_eq!(UpdateTier::from_distance_sq(100.0, &b), UpdateTier::High);
        assert_eq!(UpdateTier::from_distance_sq(1999.0, &b), UpdateTier::Medium);
        assert_eq!(UpdateTier::from_distance_sq(9999.0, &b), UpdateTier::Low);
        assert_eq!(UpdateTier::from_distance_sq(1e9, &b), UpdateTier::Minimal);
        assert_eq!(UpdateTier::from_distance_sq(f32::NAN, &b), UpdateTier::Minimal);
        assert_eq!(UpdateTier::Low.cadence(&cosmos_core::TIER_CADENCES), 8);
        assert_eq!(UpdateTier::High.cadence(&[1, 0, 1, 1, 1]), 1);
    }

    #[test]
    fn test_assign_tiers() {
        let mut particles = tiered_particles();
        particles.push([1.0, 1.0, 1.0], [0.0; 3], 1.0, 0.0);
        particles.kill(5);
        let mut scheduler = UpdateScheduler::default();
        scheduler.assign_tiers(&particles, [0.0; 3]);
        assert_eq!(scheduler.tier_counts(), [1, 1, 1, 1, 1]);
        assert_eq!(scheduler.tier_of(3), Some(UpdateTier::Low));
        assert_eq!(scheduler.tier_of(5), None);
    }

    #[test]
    fn test_cadence_over_sixteen_frames() {
        let particles = tiered_particles();
        let mut scheduler = UpdateScheduler::default();
        scheduler.assign_tiers(&particles, [0.0; 3]);

        let counts: Vec<usize> = (0..16).map(|_| scheduler.select_for_update().len()).collect();
        // frame 0 runs everything; odd frames only the critical tier
        assert_eq!(counts[0], 5);
        assert_eq!(counts[1], 1);
        assert_eq!(counts[2], 2);
        assert_eq!(counts[4], 3);
        assert_eq!(counts[8], 4);
        assert_eq!(counts[12], 3);
        assert_eq!(counts.iter().sum::<usize>(), 16 + 8 + 4 + 2 + 1);
        assert_eq!(scheduler.frame(), 16);
    }

    #[test]
    fn test_skip_ratio() {
        let particles = tiered_particles();
        let mut scheduler = UpdateScheduler::default();
        assert_eq!(scheduler.skip_ratio(), 0.0);
        scheduler.assign_tiers(&particles, [0.0; 3]);
        scheduler.select_for_update();
        assert_eq!(scheduler.skip_ratio(), 0.0);
        scheduler.select_for_update();
        assert!((scheduler.skip_ratio() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_reassignment_keeps_frame_counter() {
        let particles = tiered_particles();
        let mut scheduler = UpdateScheduler::default();
        scheduler.assign_tiers(&particles, [0.0; 3]);
        scheduler.select_for_update();
        scheduler.select_for_update();
        scheduler.assign_tiers(&particles, [200.0, 0.0, 0.0]);
        assert_eq!(scheduler.frame(), 2);
        assert_eq!(scheduler.tier(UpdateTier::Critical), &[4]);
    }
}
