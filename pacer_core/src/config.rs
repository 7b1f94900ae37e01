//! Configuration types for the rate controller.
//!
//! These are the runtime configuration structs used by `PacerCore`.
//! They are separate from the TOML-deserialized config in `pacer_config`.

use std::time::Duration;

/// Target rate and how far the operator may move it.
#[derive(Debug, Clone, PartialEq)]
pub struct RateCfg {
    /// Balls per second.
    pub target: f64,
    /// Fractional half-width of the acceptance band (0.05 = ±5 %).
    pub tolerance: f64,
    /// Operator button increment.
    pub step: f64,
    pub min_target: f64,
    pub max_target: f64,
}

impl Default for RateCfg {
    fn default() -> Self {
        Self {
            target: 0.95,
            tolerance: 0.05,
            step: 0.05,
            min_target: 0.05,
            max_target: 10.0,
        }
    }
}

/// A speed quantity expressed either per unit of target rate or absolutely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    PerRate(f64),
    Fixed(f64),
}

impl Scalar {
    #[inline]
    pub fn resolve(self, target: f64) -> f64 {
        match self {
            Self::PerRate(k) => k * target,
            Self::Fixed(v) => v,
        }
    }
}

/// A speed limit expressed either relative to the initial speed or absolutely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    OfInitial(f64),
    Fixed(f64),
}

impl Limit {
    #[inline]
    pub fn resolve(self, initial: f64) -> f64 {
        match self {
            Self::OfInitial(k) => k * initial,
            Self::Fixed(v) => v,
        }
    }
}

/// How actuator speeds derive from the target rate (deg/s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedRule {
    pub initial: Scalar,
    pub step: Scalar,
    pub min: Limit,
    pub max: Limit,
}

impl Default for SpeedRule {
    fn default() -> Self {
        Self {
            initial: Scalar::PerRate(125.0),
            step: Scalar::PerRate(5.0),
            min: Limit::OfInitial(0.5),
            max: Limit::OfInitial(2.0),
        }
    }
}

/// Target rate plus speed rule: everything `DerivedBounds` is computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tuning {
    pub rate: RateCfg,
    pub speed: SpeedRule,
}

#[derive(Debug, Clone, Copy)]
pub struct TimingCfg {
    /// Rate windows are folded at most this often.
    pub check_interval: Duration,
    /// Cycle window length; the speed controller runs once per cycle.
    pub cycle_window: Duration,
    /// Long window driving the status light.
    pub window60: Duration,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_millis(100),
            cycle_window: Duration::from_secs(5),
            window60: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DetectorCfg {
    /// Raw readings strictly above this count as a ball.
    pub threshold: i32,
    /// Minimum spacing between two counted events.
    pub cooldown: Duration,
}

impl Default for DetectorCfg {
    fn default() -> Self {
        Self {
            threshold: 8,
            cooldown: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AntiBlockCfg {
    pub check_interval: Duration,
    /// Progress below this many degrees per interval means blocked.
    pub threshold_deg: u32,
    pub reverse_deg: u32,
    /// Signed deg/s for the reverse move; negative turns backwards.
    pub unblock_speed: f64,
}

impl Default for AntiBlockCfg {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_millis(1000),
            threshold_deg: 5,
            reverse_deg: 20,
            unblock_speed: -200.0,
        }
    }
}

impl AntiBlockCfg {
    /// Worst-case duration of one reverse maneuver; the control loop stalls this long.
    pub fn worst_case_unblock(&self) -> Duration {
        let speed = self.unblock_speed.abs();
        if speed > 0.0 && speed.is_finite() {
            crate::util::secs(f64::from(self.reverse_deg) / speed)
        } else {
            Duration::ZERO
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InjectorCfg {
    /// Chance that a NORMAL period ends in a failure mode. 0 disables injection.
    pub failure_probability: f64,
    pub failure_min: Duration,
    pub failure_max: Duration,
    pub normal_duration: Duration,
}

impl Default for InjectorCfg {
    fn default() -> Self {
        Self {
            failure_probability: 0.0,
            failure_min: Duration::from_millis(3000),
            failure_max: Duration::from_millis(10_000),
            normal_duration: Duration::from_millis(15_000),
        }
    }
}

impl InjectorCfg {
    #[inline]
    pub fn enabled(&self) -> bool {
        self.failure_probability > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_case_unblock_is_reverse_over_speed() {
        let cfg = AntiBlockCfg::default();
        assert_eq!(cfg.worst_case_unblock(), Duration::from_millis(100));
    }

    #[test]
    fn worst_case_unblock_saturates_for_vanishing_speed() {
        let cfg = AntiBlockCfg {
            unblock_speed: -1e-30,
            ..AntiBlockCfg::default()
        };
        assert_eq!(cfg.worst_case_unblock(), Duration::MAX);
    }

    #[test]
    fn scalar_and_limit_resolve() {
        assert!((Scalar::PerRate(125.0).resolve(0.95) - 118.75).abs() < 1e-9);
        assert_eq!(Scalar::Fixed(10.0).resolve(3.0), 10.0);
        assert_eq!(Limit::OfInitial(0.5).resolve(100.0), 50.0);
        assert_eq!(Limit::Fixed(500.0).resolve(100.0), 500.0);
    }
}
