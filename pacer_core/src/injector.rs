//! Failure-mode injector.
//!
//! Steers the long-run share of time spent in abnormal actuator conditions
//! toward `failure_probability`. Each time the current mode's dwell expires
//! the realized failure ratio is compared with the target: below it, a
//! random failure preset is entered for a random duration; otherwise the
//! controller returns to NORMAL for a fixed duration.
//!
//! All randomness goes through `RandomSource` so tests can script it.

use std::time::Duration;

use pacer_traits::{Actuator, Clock, HwResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bounds::DerivedBounds;
use crate::config::InjectorCfg;
use crate::state::{ControllerState, Mode};
use crate::telemetry::ModeTransition;
use crate::util::millis;

/// Source of the two random draws the injector needs.
pub trait RandomSource {
    /// Uniform index in `0..len`; `len` is at least 1.
    fn pick(&mut self, len: usize) -> usize;
    /// Uniform integer in `[lo, hi]`.
    fn between_ms(&mut self, lo: u64, hi: u64) -> u64;
}

impl RandomSource for StdRng {
    fn pick(&mut self, len: usize) -> usize {
        self.gen_range(0..len.max(1))
    }

    fn between_ms(&mut self, lo: u64, hi: u64) -> u64 {
        if lo >= hi { lo } else { self.gen_range(lo..=hi) }
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn pick(&mut self, len: usize) -> usize {
        (**self).pick(len)
    }

    fn between_ms(&mut self, lo: u64, hi: u64) -> u64 {
        (**self).between_ms(lo, hi)
    }
}

/// Seeded when a seed is given, otherwise from OS entropy.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// A failure condition and the speed it forces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailurePreset {
    pub mode: Mode,
    pub speed: f64,
}

/// JAM stops the wheel, STARVATION runs at half the minimum speed, BURST at
/// twice the maximum.
pub fn presets(bounds: &DerivedBounds) -> [FailurePreset; 3] {
    [
        FailurePreset {
            mode: Mode::Jam,
            speed: 0.0,
        },
        FailurePreset {
            mode: Mode::Starvation,
            speed: bounds.min_speed / 2.0,
        },
        FailurePreset {
            mode: Mode::Burst,
            speed: bounds.max_speed * 2.0,
        },
    ]
}

/// The preset backing `mode`, `None` for NORMAL.
pub fn preset_for(mode: Mode, bounds: &DerivedBounds) -> Option<FailurePreset> {
    presets(bounds).into_iter().find(|p| p.mode == mode)
}

#[derive(Debug, Clone, Copy)]
pub struct FailureInjector {
    cfg: InjectorCfg,
}

impl FailureInjector {
    pub fn new(cfg: InjectorCfg) -> Self {
        Self { cfg }
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.cfg.enabled()
    }

    pub fn cfg(&self) -> &InjectorCfg {
        &self.cfg
    }

    /// Switch mode once the current dwell has run out. Resets the mode timer.
    pub fn poll(
        &self,
        state: &mut ControllerState,
        bounds: &DerivedBounds,
        rng: &mut dyn RandomSource,
        clock: &dyn Clock,
    ) -> Option<ModeTransition> {
        if !self.enabled() || state.mode_elapsed(clock) < state.next_mode_duration {
            return None;
        }
        let spent = state.timers.mode.lap(clock);
        Some(self.transition(state, spent, bounds, rng))
    }

    /// Close the current mode after `spent` and choose the next one.
    ///
    /// Does not touch the actuator or the mode timer; see `apply_effect`.
    pub fn transition(
        &self,
        state: &mut ControllerState,
        spent: Duration,
        bounds: &DerivedBounds,
        rng: &mut dyn RandomSource,
    ) -> ModeTransition {
        let from = state.mode;
        state.mode_stats.record(from, spent);
        if from.is_failure() {
            state.failure_time = state.failure_time.saturating_add(spent);
        } else {
            state.normal_time = state.normal_time.saturating_add(spent);
        }
        let failure_ratio = state.failure_ratio();

        if failure_ratio < self.cfg.failure_probability {
            let options = presets(bounds);
            let preset = options[rng.pick(options.len()).min(options.len() - 1)];
            let ms = rng.between_ms(
                millis(self.cfg.failure_min),
                millis(self.cfg.failure_max),
            );
            state.mode = preset.mode;
            state.commanded_speed = preset.speed;
            state.next_mode_duration = Duration::from_millis(ms);
        } else {
            state.mode = Mode::Normal;
            state.commanded_speed = state.last_normal_speed;
            state.next_mode_duration = self.cfg.normal_duration;
        }

        ModeTransition {
            from,
            to: state.mode,
            spent,
            next_duration: state.next_mode_duration,
            failure_ratio,
            stats: state.mode_stats,
        }
    }
}

/// Drive the actuator to the current mode's speed: stopped in JAM, the
/// commanded speed otherwise.
pub fn apply_effect<A: Actuator + ?Sized>(
    state: &ControllerState,
    actuator: &mut A,
) -> HwResult<()> {
    match state.mode {
        Mode::Jam => actuator.stop(),
        _ => actuator.run(state.commanded_speed),
    }
}
