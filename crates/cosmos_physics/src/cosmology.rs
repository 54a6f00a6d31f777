//! Prescribed cosmological background.
//!
//! Cosmic time is in seconds since the Big Bang. The scale factor follows a
//! piecewise model (inflation, radiation, matter, dark energy) normalised so
//! that a = 1 at the present age. Everything else (redshift, temperature,
//! Hubble rate, epoch) is derived from time and the scale factor.

use std::collections::VecDeque;

use cosmos_core::constants::*;
use cosmos_core::{CosmologyParams, EpochTable};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest exponent handed to `exp` by the exponential regimes
const MAX_EXPONENT: f64 = 700.0;

/// Expansion regime of the scale-factor model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CosmicStage {
    Inflation,
    RadiationDominated,
    MatterDominated,
    DarkEnergyDominated,
}

impl CosmicStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inflation => "Inflation",
            Self::RadiationDominated => "Radiation Dominated",
            Self::MatterDominated => "Matter Dominated",
            Self::DarkEnergyDominated => "Dark Energy Dominated",
        }
    }
}

/// Hubble parameter H(z) in km/s/Mpc.
///
/// Non-finite or extreme redshifts, and any overflowing term, fall back to the
/// radiation-only form. A negative radicand is clamped to zero.
pub fn hubble_parameter(params: &CosmologyParams, z: f64) -> f64 {
    if !z.is_finite() || z > HUBBLE_FALLBACK_REDSHIFT {
        return radiation_hubble(params, z);
    }
    let x = (1.0 + z).max(0.0);
    let terms = density_terms(params, x);
    if terms.iter().any(|t| !t.is_finite()) {
        return radiation_hubble(params, z);
    }
    let e2: f64 = terms.iter().sum();
    if !e2.is_finite() {
        return radiation_hubble(params, z);
    }
    params.h0 * e2.max(0.0).sqrt()
}

/// H(z) in 1/s
pub fn hubble_parameter_si(params: &CosmologyParams, z: f64) -> f64 {
    hubble_parameter(params, z) / KM_PER_MPC
}

/// [matter, radiation, curvature, dark energy] contributions to E(z)^2
fn density_terms(params: &CosmologyParams, x: f64) -> [f64; 4] {
    [
        params.omega_m * x.powi(3),
        params.omega_r * x.powi(4),
        params.omega_k * x.powi(2),
        params.omega_lambda * x.powf(3.0 * (1.0 + params.w)),
    ]
}

fn radiation_hubble(params: &CosmologyParams, z: f64) -> f64 {
    let z = if z.is_nan() {
        HUBBLE_FALLBACK_REDSHIFT
    } else {
        z.clamp(0.0, HUBBLE_FALLBACK_REDSHIFT)
    };
    let x = 1.0 + z;
    params.h0 * params.omega_r.max(0.0).sqrt() * x * x
}

/// Share of each component in the expansion rate at redshift z
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DensityFractions {
    pub matter: f64,
    pub radiation: f64,
    pub curvature: f64,
    pub dark_energy: f64,
}

pub fn density_fractions(params: &CosmologyParams, z: f64) -> DensityFractions {
    let z = if z.is_finite() { z.min(HUBBLE_FALLBACK_REDSHIFT) } else { HUBBLE_FALLBACK_REDSHIFT };
    let terms = density_terms(params, (1.0 + z).max(0.0));
    let e2: f64 = terms.iter().sum();
    if !(e2 > 0.0) || !e2.is_finite() || terms.iter().any(|t| !t.is_finite()) {
        return DensityFractions::default();
    }
    DensityFractions {
        matter: terms[0] / e2,
        radiation: terms[1] / e2,
        curvature: terms[2] / e2,
        dark_energy: terms[3] / e2,
    }
}

/// Redshift for a scale factor, capped at MAX_REDSHIFT
pub fn redshift_from_scale_factor(a: f64) -> f64 {
    if !(a > 0.0) {
        return MAX_REDSHIFT;
    }
    (1.0 / a - 1.0).min(MAX_REDSHIFT)
}

/// Radiation temperature T = T0 / a, kept between today's CMB temperature and
/// the Planck temperature
pub fn temperature_from_scale_factor(a: f64) -> f64 {
    if !(a > 0.0) {
        return PLANCK_TEMPERATURE;
    }
    (T_CMB_0 / a).clamp(T_CMB_0, PLANCK_TEMPERATURE)
}

/// Piecewise scale factor a(t).
///
/// Regime boundaries are matched by value: each earlier regime is anchored to
/// the value of the next one at the shared boundary, working back from
/// a(present) = 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactorModel {
    inflation_end: f64,
    recombination: f64,
    dark_energy_onset: f64,
    /// Inflationary e-folding rate (1/s)
    inflation_rate: f64,
    /// Dark-energy e-folding rate (1/s)
    dark_energy_rate: f64,
    a_inflation_end: f64,
    a_recombination: f64,
    a_dark_energy_onset: f64,
}

impl ScaleFactorModel {
    pub fn new(params: &CosmologyParams) -> Self {
        let onset = DARK_ENERGY_ONSET * AGE_OF_UNIVERSE;
        let dark_energy_rate = params.h0 / KM_PER_MPC * params.omega_lambda.max(0.0).sqrt();

        let a_dark_energy_onset =
            (-(dark_energy_rate * (AGE_OF_UNIVERSE - onset)).min(MAX_EXPONENT)).exp();
        let a_recombination = a_dark_energy_onset * (RECOMBINATION_TIME / onset).powf(2.0 / 3.0);
        let a_inflation_end = a_recombination * (INFLATION_END / RECOMBINATION_TIME).sqrt();

        Self {
            inflation_end: INFLATION_END,
            recombination: RECOMBINATION_TIME,
            dark_energy_onset: onset,
            inflation_rate: INFLATION_EFOLDS / INFLATION_END,
            dark_energy_rate,
            a_inflation_end,
            a_recombination,
            a_dark_energy_onset,
        }
    }

    /// Scale factor at cosmic time `t` (s). Negative or NaN times read as 0.
    pub fn at(&self, t: f64) -> f64 {
        let t = if t > 0.0 { t } else { 0.0 };
        if t < self.inflation_end {
            // Capped at INFLATION_EFOLDS so t = 0 stays finite and non-zero
            let efolds = (self.inflation_rate * (self.inflation_end - t)).min(INFLATION_EFOLDS);
            self.a_inflation_end * (-efolds).exp()
        } else if t < self.recombination {
            self.a_recombination * (t / self.recombination).sqrt()
        } else if t < self.dark_energy_onset {
            self.a_dark_energy_onset * (t / self.dark_energy_onset).powf(2.0 / 3.0)
        } else {
            let exponent = (self.dark_energy_rate * (t - self.dark_energy_onset)).min(MAX_EXPONENT);
            self.a_dark_energy_onset * exponent.exp()
        }
    }

    pub fn stage(&self, t: f64) -> CosmicStage {
        if t < self.inflation_end {
            CosmicStage::Inflation
        } else if t < self.recombination {
            CosmicStage::RadiationDominated
        } else if t < self.dark_energy_onset {
            CosmicStage::MatterDominated
        } else {
            CosmicStage::DarkEnergyDominated
        }
    }

    /// Regime boundaries in seconds: inflation end, recombination, dark-energy onset
    pub fn boundaries(&self) -> [f64; 3] {
        [self.inflation_end, self.recombination, self.dark_energy_onset]
    }
}

/// Scale factor at `time` for the given parameters
pub fn scale_factor(params: &CosmologyParams, time: f64) -> f64 {
    ScaleFactorModel::new(params).at(time)
}

/// Redshift at `time` for the given parameters
pub fn redshift_at(params: &CosmologyParams, time: f64) -> f64 {
    redshift_from_scale_factor(scale_factor(params, time))
}

/// Derived background quantities after an update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CosmologySnapshot {
    /// Seconds since the Big Bang
    pub time: f64,
    pub scale_factor: f64,
    /// Capped at MAX_REDSHIFT independently of `temperature`
    pub redshift: f64,
    /// Kelvin, from T0 / a with its own clamp; do not rebuild it from `redshift`
    pub temperature: f64,
    /// km/s/Mpc
    pub hubble: f64,
    /// 1/s
    pub hubble_si: f64,
    pub stage: CosmicStage,
    pub epoch_index: usize,
    pub epoch_changed: bool,
    /// 0..1 through the active epoch
    pub epoch_progress: f64,
}

impl CosmologySnapshot {
    pub fn time_years(&self) -> f64 {
        self.time / SECONDS_PER_YEAR
    }
}

/// Mutable engine state, serializable for checkpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosmologyState {
    pub time: f64,
    pub scale_factor: f64,
    pub redshift: f64,
    pub temperature: f64,
    pub hubble: f64,
    pub epoch_index: usize,
    pub epoch_progress: f64,
    pub stage: CosmicStage,
    /// log10 of the scale factor, oldest first
    pub log_scale_history: VecDeque<f64>,
    /// log10 of the temperature, oldest first
    pub log_temperature_history: VecDeque<f64>,
}

impl Default for CosmologyState {
    fn default() -> Self {
        Self {
            time: 0.0,
            scale_factor: 0.0,
            redshift: MAX_REDSHIFT,
            temperature: PLANCK_TEMPERATURE,
            hubble: 0.0,
            epoch_index: 0,
            epoch_progress: 0.0,
            stage: CosmicStage::Inflation,
            log_scale_history: VecDeque::with_capacity(HISTORY_LEN),
            log_temperature_history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }
}

fn push_bounded(history: &mut VecDeque<f64>, value: f64) {
    if history.len() == HISTORY_LEN {
        history.pop_front();
    }
    history.push_back(value);
}

/// Advances cosmic time and derives the background quantities.
/// Performs no I/O; the caller reacts to the returned snapshot.
pub struct CosmologyEngine {
    params: CosmologyParams,
    model: ScaleFactorModel,
    epochs: EpochTable,
    state: CosmologyState,
}

impl CosmologyEngine {
    pub fn new(params: CosmologyParams, epochs: EpochTable) -> Self {
        let mut engine = Self {
            model: ScaleFactorModel::new(&params),
            params,
            epochs,
            state: CosmologyState::default(),
        };
        engine.update(0.0, false);
        engine
    }

    /// Restore from a saved state. History and time are taken as-is, derived
    /// values are recomputed for the current parameters.
    pub fn from_state(params: CosmologyParams, epochs: EpochTable, state: CosmologyState) -> Self {
        let mut engine = Self {
            model: ScaleFactorModel::new(&params),
            params,
            epochs,
            state,
        };
        engine.refresh();
        engine
    }

    pub fn params(&self) -> &CosmologyParams {
        &self.params
    }

    pub fn epochs(&self) -> &EpochTable {
        &self.epochs
    }

    pub fn state(&self) -> &CosmologyState {
        &self.state
    }

    pub fn model(&self) -> &ScaleFactorModel {
        &self.model
    }

    pub fn time(&self) -> f64 {
        self.state.time
    }

    /// Swap in a whole new parameter set and resynchronise
    pub fn set_params(&mut self, params: CosmologyParams) -> CosmologySnapshot {
        self.params = params;
        self.model = ScaleFactorModel::new(&self.params);
        self.update(0.0, false)
    }

    /// Advance time by `dt` seconds, backwards when `reversed`. Time never
    /// goes below zero.
    pub fn update(&mut self, dt: f64, reversed: bool) -> CosmologySnapshot {
        let dt = if dt.is_finite() { dt.abs() } else { 0.0 };
        let time = if reversed {
            self.state.time - dt
        } else {
            self.state.time + dt
        };
        self.state.time = time.max(0.0);

        let epoch_changed = self.refresh();
        push_bounded(&mut self.state.log_scale_history, self.state.scale_factor.log10());
        push_bounded(&mut self.state.log_temperature_history, self.state.temperature.log10());
        self.snapshot(epoch_changed)
    }

    /// Recompute derived values from time; reports whether the epoch changed
    fn refresh(&mut self) -> bool {
        let time = self.state.time;
        let a = self.model.at(time);
        let raw_z = if a > 0.0 { 1.0 / a - 1.0 } else { f64::INFINITY };

        self.state.scale_factor = a;
        self.state.redshift = redshift_from_scale_factor(a);
        self.state.temperature = temperature_from_scale_factor(a);
        self.state.hubble = hubble_parameter(&self.params, raw_z);
        self.state.stage = self.model.stage(time);

        let index = self.epochs.active_index(time);
        let changed = index != self.state.epoch_index;
        if changed {
            debug!(
                from = self.state.epoch_index,
                to = index,
                time,
                "epoch transition"
            );
        }
        self.state.epoch_index = index;
        self.state.epoch_progress = self.epochs.get(index).map_or(0.0, |e| e.progress(time));
        changed
    }

    fn snapshot(&self, epoch_changed: bool) -> CosmologySnapshot {
        CosmologySnapshot {
            time: self.state.time,
            scale_factor: self.state.scale_factor,
            redshift: self.state.redshift,
            temperature: self.state.temperature,
            hubble: self.state.hubble,
            hubble_si: self.state.hubble / KM_PER_MPC,
            stage: self.state.stage,
            epoch_index: self.state.epoch_index,
            epoch_changed,
            epoch_progress: self.state.epoch_progress,
        }
    }

    /// Current values without advancing time
    pub fn current(&self) -> CosmologySnapshot {
        self.snapshot(false)
    }

    /// Jump to the start of epoch `index`. Returns `None` for an unknown index.
    pub fn jump_to_epoch(&mut self, index: usize) -> Option<CosmologySnapshot> {
        let start = self.epochs.get(index)?.start;
        Some(self.jump_to_time(start))
    }

    /// Jump to an arbitrary time. Non-finite times leave the clock unchanged.
    pub fn jump_to_time(&mut self, time: f64) -> CosmologySnapshot {
        if time.is_finite() {
            self.state.time = time;
        }
        self.update(0.0, false)
    }

    /// Back to t = 0 with empty history
    pub fn reset(&mut self) -> CosmologySnapshot {
        self.state = CosmologyState::default();
        self.update(0.0, false)
    }

    /// a(t + dt) / a(t), for comoving expansion of particle positions
    pub fn expansion_ratio(&self, dt: f64, reversed: bool) -> f64 {
        let a = self.state.scale_factor;
        if !(a > 0.0) || !dt.is_finite() {
            return 1.0;
        }
        let next = if reversed {
            (self.state.time - dt.abs()).max(0.0)
        } else {
            self.state.time + dt.abs()
        };
        let ratio = self.model.at(next) / a;
        if ratio.is_finite() { ratio } else { 1.0 }
    }

    pub fn density_fractions(&self) -> DensityFractions {
        density_fractions(&self.params, self.state.redshift)
    }

    pub fn history_log_scale_factor(&self) -> impl Iterator<Item = f64> + '_ {
        self.state.log_scale_history.iter().copied()
    }

    pub fn history_log_temperature(&self) -> impl Iterator<Item = f64> + '_ {
        self.state.log_temperature_history.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmos_core::epoch::{Epoch, EpochHint};

    fn engine() -> CosmologyEngine {
        CosmologyEngine::new(CosmologyParams::default(), EpochTable::standard())
    }

    #[test]
    fn test_hubble_today_equals_h0() {
        let p = CosmologyParams::flat_lcdm(70.0, 0.25);
        assert_eq!(hubble_parameter(&p, 0.0), 70.0);

        let planck = CosmologyParams::default();
        assert!((hubble_parameter(&planck, 0.0) - planck.h0).abs() < 1e-2);
    }

    #[test]
    fn test_hubble_grows_with_redshift() {
        let p = CosmologyParams::default();
        let mut last = 0.0;
        for z in [0.0, 0.5, 1.0, 10.0, 1100.0, 1e6] {
            let h = hubble_parameter(&p, z);
            assert!(h > last, "H({}) = {}", z, h);
            last = h;
        }
    }

    #[test]
    fn test_hubble_fallbacks_stay_finite() {
        let p = CosmologyParams::default();
        for z in [f64::INFINITY, f64::NAN, 1e300, 1e13] {
            let h = hubble_parameter(&p, z);
            assert!(h.is_finite() && h > 0.0, "H({}) = {}", z, h);
        }
        // Just below the switch the full form is used and also finite
        assert!(hubble_parameter(&p, 1e11).is_finite());

        // Overflowing dark-energy term triggers the radiation form
        let phantom = CosmologyParams { w: 200.0, ..p };
        assert_eq!(hubble_parameter(&phantom, 1e9), radiation_hubble(&phantom, 1e9));
    }

    #[test]
    fn test_hubble_negative_radicand_clamps_to_zero() {
        let closed = CosmologyParams {
            omega_m: 0.0,
            omega_r: 0.0,
            omega_lambda: 0.1,
            omega_k: -5.0,
            ..CosmologyParams::default()
        };
        assert_eq!(hubble_parameter(&closed, 1.0), 0.0);
    }

    #[test]
    fn test_hubble_si_conversion() {
        let p = CosmologyParams::flat_lcdm(70.0, 0.3);
        let h = hubble_parameter_si(&p, 0.0);
        assert!((h - 2.2685e-18).abs() < 1e-21, "H0 = {} 1/s", h);
    }

    #[test]
    fn test_scale_factor_today_is_one() {
        let p = CosmologyParams::default();
        let a = scale_factor(&p, AGE_OF_UNIVERSE);
        assert!((a - 1.0).abs() < 1e-9, "a(t0) = {}", a);
    }

    #[test]
    fn test_scale_factor_regimes() {
        let model = ScaleFactorModel::new(&CosmologyParams::default());
        let a0 = model.at(0.0);
        assert!(a0 > 0.0 && a0.is_finite());
        assert_eq!(model.at(-5.0), a0);
        assert_eq!(model.at(f64::NAN), a0);

        // Radiation: doubling time multiplies a by sqrt(2)
        let r = model.at(2e6) / model.at(1e6);
        assert!((r - 2f64.sqrt()).abs() < 1e-9);
        // Matter: doubling time multiplies a by 2^(2/3)
        let r = model.at(2e16) / model.at(1e16);
        assert!((r - 2f64.powf(2.0 / 3.0)).abs() < 1e-9);

        // Far future stays finite
        assert!(model.at(1e30).is_finite());
        assert_eq!(model.stage(1e-40), CosmicStage::Inflation);
        assert_eq!(model.stage(1e5), CosmicStage::RadiationDominated);
        assert_eq!(model.stage(1e16), CosmicStage::MatterDominated);
        assert_eq!(model.stage(AGE_OF_UNIVERSE), CosmicStage::DarkEnergyDominated);
    }

    #[test]
    fn test_redshift_and_temperature_clamps() {
        assert_eq!(redshift_from_scale_factor(1e-40), MAX_REDSHIFT);
        assert_eq!(redshift_from_scale_factor(0.0), MAX_REDSHIFT);
        assert!((redshift_from_scale_factor(0.5) - 1.0).abs() < 1e-12);
        assert_eq!(temperature_from_scale_factor(1e-60), PLANCK_TEMPERATURE);
        assert_eq!(temperature_from_scale_factor(10.0), T_CMB_0);
        assert!((temperature_from_scale_factor(1.0 / 1100.0) - T_CMB_0 * 1100.0).abs() < 1e-6);
    }

    #[test]
    fn test_reverse_update_stops_at_big_bang() {
        let mut e = engine();
        e.update(100.0, false);
        let snap = e.update(1e9, true);
        assert_eq!(snap.time, 0.0);
        assert_eq!(snap.epoch_index, 0);
        assert_eq!(snap.temperature, PLANCK_TEMPERATURE);
        // Both quantities clamp on their own; temperature is not T0 * (1 + z)
        assert_eq!(snap.redshift, MAX_REDSHIFT);
        assert!(snap.temperature > T_CMB_0 * (1.0 + MAX_REDSHIFT));
    }

    #[test]
    fn test_epoch_change_flag() {
        let mut e = engine();
        assert_eq!(e.current().epoch_index, 0);
        let snap = e.update(1e-50, false);
        assert!(!snap.epoch_changed);
        let snap = e.update(1e-43, false);
        assert!(snap.epoch_changed);
        assert_eq!(snap.epoch_index, 1);
        let snap = e.update(0.0, false);
        assert!(!snap.epoch_changed);
    }

    #[test]
    fn test_zero_length_epoch_progress() {
        let table = EpochTable::new(vec![
            Epoch::new("start", 0.0, 10.0, "", EpochHint::default()),
            Epoch::new("instant", 10.0, 10.0, "", EpochHint::default()),
        ])
        .unwrap();
        let mut e = CosmologyEngine::new(CosmologyParams::default(), table);
        let snap = e.update(5.0, false);
        assert!((snap.epoch_progress - 0.5).abs() < 1e-12);
        let snap = e.update(5.0, false);
        assert_eq!(snap.epoch_index, 1);
        assert_eq!(snap.epoch_progress, 0.0);
    }

    #[test]
    fn test_jump_matches_organic_advance() {
        let mut organic = engine();
        organic.update(3e15, false);
        let a = organic.update(1e16, false);

        let mut jumped = engine();
        let b = jumped.jump_to_time(1.3e16);
        assert_eq!(a.scale_factor, b.scale_factor);
        assert_eq!(a.redshift, b.redshift);
        assert_eq!(a.temperature, b.temperature);
        assert_eq!(a.epoch_index, b.epoch_index);
        assert_eq!(a.epoch_progress, b.epoch_progress);
        assert!(b.epoch_changed);

        // Negative jumps clamp like reversed updates do
        assert_eq!(jumped.jump_to_time(-1.0).time, 0.0);
        assert_eq!(jumped.jump_to_time(f64::NAN).time, 0.0);
    }

    #[test]
    fn test_jump_to_epoch() {
        let mut e = engine();
        let target = e.epochs().len() - 2;
        let start = e.epochs().get(target).unwrap().start;
        let snap = e.jump_to_epoch(target).unwrap();
        assert_eq!(snap.time, start);
        assert_eq!(snap.epoch_index, target);
        assert_eq!(snap.epoch_progress, 0.0);
        assert!(e.jump_to_epoch(999).is_none());
        assert_eq!(e.time(), start);
    }

    #[test]
    fn test_history_is_fixed_length() {
        let mut e = engine();
        for _ in 0..(HISTORY_LEN * 2) {
            e.update(1e10, false);
        }
        let scale: Vec<f64> = e.history_log_scale_factor().collect();
        assert_eq!(scale.len(), HISTORY_LEN);
        assert_eq!(e.history_log_temperature().count(), HISTORY_LEN);
        assert!(scale.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*scale.last().unwrap(), e.current().scale_factor.log10());
    }

    #[test]
    fn test_density_fractions() {
        let p = CosmologyParams::default();
        let today = density_fractions(&p, 0.0);
        let sum = today.matter + today.radiation + today.curvature + today.dark_energy;
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(today.dark_energy > today.matter);

        let early = density_fractions(&p, 1e5);
        assert!(early.radiation > early.matter);
        assert!(early.dark_energy < 1e-10);
    }

    #[test]
    fn test_expansion_ratio() {
        let mut e = engine();
        e.jump_to_time(AGE_OF_UNIVERSE);
        let forward = e.expansion_ratio(1e15, false);
        let backward = e.expansion_ratio(1e15, true);
        assert!(forward > 1.0);
        assert!(backward < 1.0);
        assert_eq!(e.expansion_ratio(f64::NAN, false), 1.0);
    }

    #[test]
    fn test_set_params_resyncs() {
        let mut e = engine();
        e.jump_to_time(AGE_OF_UNIVERSE);
        let snap = e.set_params(CosmologyParams::flat_lcdm(70.0, 0.25));
        assert_eq!(snap.time, AGE_OF_UNIVERSE);
        assert!((snap.scale_factor - 1.0).abs() < 1e-9);
        assert_eq!(e.params().h0, 70.0);
    }

    #[test]
    fn test_restore_from_state() {
        let mut e = engine();
        e.jump_to_time(1e17);
        let saved = e.state().clone();
        let restored = CosmologyEngine::from_state(
            CosmologyParams::default(),
            EpochTable::standard(),
            saved.clone(),
        );
        assert_eq!(restored.state(), &saved);
    }
}
