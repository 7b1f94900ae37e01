//! Dead-band, fixed-step speed controller.

use crate::bounds::DerivedBounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedDecision {
    Increase,
    Decrease,
    Hold,
}

impl SpeedDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::Hold => "hold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedAdjustment {
    pub decision: SpeedDecision,
    pub speed: f64,
}

/// Stateless; everything it needs is in the bounds and the current speed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpeedController;

impl SpeedController {
    pub fn decide(cycle_rate: f64, bounds: &DerivedBounds) -> SpeedDecision {
        if cycle_rate > bounds.upper {
            SpeedDecision::Decrease
        } else if cycle_rate < bounds.lower {
            SpeedDecision::Increase
        } else {
            SpeedDecision::Hold
        }
    }

    /// One step toward the band, clamped into `[min_speed, max_speed]`.
    pub fn adjust(&self, current: f64, cycle_rate: f64, bounds: &DerivedBounds) -> SpeedAdjustment {
        let decision = Self::decide(cycle_rate, bounds);
        let speed = match decision {
            SpeedDecision::Decrease => (current - bounds.speed_step).max(bounds.min_speed),
            SpeedDecision::Increase => (current + bounds.speed_step).min(bounds.max_speed),
            SpeedDecision::Hold => current,
        };
        SpeedAdjustment { decision, speed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::recompute_derived;
    use crate::config::{RateCfg, Tuning};

    fn bounds(target: f64, tolerance: f64) -> DerivedBounds {
        recompute_derived(&Tuning {
            rate: RateCfg {
                target,
                tolerance,
                ..RateCfg::default()
            },
            ..Tuning::default()
        })
    }

    #[test]
    fn four_events_in_five_seconds_raises_speed_one_step() {
        let b = bounds(1.0, 0.1);
        assert!((b.lower - 0.9).abs() < 1e-12);
        assert!((b.upper - 1.1).abs() < 1e-12);
        let adj = SpeedController.adjust(b.initial_speed, 4.0 / 5.0, &b);
        assert_eq!(adj.decision, SpeedDecision::Increase);
        assert!((adj.speed - (b.initial_speed + b.speed_step)).abs() < 1e-12);
    }

    #[test]
    fn band_edges_hold() {
        let b = bounds(1.0, 0.1);
        assert_eq!(SpeedController::decide(b.lower, &b), SpeedDecision::Hold);
        assert_eq!(SpeedController::decide(b.upper, &b), SpeedDecision::Hold);
    }
}
