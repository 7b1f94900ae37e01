//! Derived operating bounds.
//!
//! Everything the controller compares against is a pure function of the
//! current `Tuning`. Recompute after every target change; never patch fields
//! individually.

use crate::config::{RateCfg, Tuning};

/// Values derived from the target rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedBounds {
    pub target: f64,
    /// target × (1 − tolerance)
    pub lower: f64,
    /// target × (1 + tolerance)
    pub upper: f64,
    pub speed_step: f64,
    pub initial_speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
}

impl DerivedBounds {
    /// Clamp a speed into `[min_speed, max_speed]`.
    #[inline]
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        speed.clamp(self.min_speed, self.max_speed)
    }

    /// Whether `rate` lies inside the inclusive dead band.
    #[inline]
    pub fn in_band(&self, rate: f64) -> bool {
        rate >= self.lower && rate <= self.upper
    }
}

/// Compute all derived values from the tuning.
pub fn recompute_derived(tuning: &Tuning) -> DerivedBounds {
    let target = tuning.rate.target;
    let tol = tuning.rate.tolerance;
    let initial_speed = tuning.speed.initial.resolve(target);
    let min_speed = tuning.speed.min.resolve(initial_speed);
    // Fixed and scaled limits can cross at small targets.
    let max_speed = tuning.speed.max.resolve(initial_speed).max(min_speed);
    DerivedBounds {
        target,
        lower: target * (1.0 - tol),
        upper: target * (1.0 + tol),
        speed_step: tuning.speed.step.resolve(target),
        initial_speed: initial_speed.clamp(min_speed, max_speed),
        min_speed,
        max_speed,
    }
}

/// Direction of an operator target change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetChange {
    Increase,
    Decrease,
}

/// Move the target one step, saturating at the configured limits.
/// Returns `true` when the target actually changed.
pub fn step_target(rate: &mut RateCfg, change: TargetChange) -> bool {
    let next = match change {
        TargetChange::Increase => (rate.target + rate.step).min(rate.max_target),
        TargetChange::Decrease => (rate.target - rate.step).max(rate.min_target),
    };
    // Round away accumulated binary drift so repeated steps land on the grid.
    let next = (next * 10_000.0).round() / 10_000.0;
    if (next - rate.target).abs() < f64::EPSILON {
        return false;
    }
    rate.target = next;
    true
}
