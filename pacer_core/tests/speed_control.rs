use pacer_core::{DerivedBounds, RateCfg, SpeedController, SpeedDecision, Tuning, recompute_derived};
use proptest::prelude::*;

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
fn sustained_high_rate_walks_down_to_floor_and_stays() {
    let b = bounds(0.95, 0.05);
    let mut speed = b.initial_speed;
    let mut reached_floor = false;
    for _ in 0..40 {
        let adj = SpeedController.adjust(speed, 2.0, &b);
        assert_eq!(adj.decision, SpeedDecision::Decrease);
        if reached_floor {
            assert_eq!(adj.speed, speed);
        } else if adj.speed == b.min_speed {
            reached_floor = true;
        } else {
            assert!(adj.speed < speed);
        }
        speed = adj.speed;
    }
    assert!(reached_floor);
    assert_eq!(speed, b.min_speed);
}

#[test]
fn sustained_low_rate_walks_up_to_ceiling_and_stays() {
    let b = bounds(0.95, 0.05);
    let mut speed = b.initial_speed;
    let mut previous = speed;
    for _ in 0..40 {
        speed = SpeedController.adjust(speed, 0.1, &b).speed;
        assert!(speed > previous || speed == b.max_speed);
        previous = speed;
    }
    assert_eq!(speed, b.max_speed);
}

proptest! {
    #[test]
    fn speed_never_leaves_limits(
        target in 0.1f64..5.0,
        rates in prop::collection::vec(0.0f64..20.0, 1..100),
    ) {
        let b = bounds(target, 0.05);
        let mut speed = b.initial_speed;
        for r in rates {
            speed = SpeedController.adjust(speed, r, &b).speed;
            prop_assert!(speed >= b.min_speed && speed <= b.max_speed);
        }
    }

    #[test]
    fn rates_inside_band_never_move_speed(
        target in 0.1f64..5.0,
        fractions in prop::collection::vec(0.001f64..0.999, 1..50),
    ) {
        let b = bounds(target, 0.1);
        let start = b.initial_speed;
        let mut speed = start;
        for f in fractions {
            let rate = b.lower + f * (b.upper - b.lower);
            let adj = SpeedController.adjust(speed, rate, &b);
            prop_assert_eq!(adj.decision, SpeedDecision::Hold);
            speed = adj.speed;
        }
        prop_assert_eq!(speed, start);
    }
}
