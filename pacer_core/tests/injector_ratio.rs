use pacer_core::{
    ControllerState, FailureInjector, InjectorCfg, Mode, Tuning, recompute_derived, rng_from_seed,
};
use pacer_traits::ManualClock;
use rstest::rstest;
use std::time::Duration;

#[rstest]
#[case(0.1)]
#[case(0.3)]
#[case(0.5)]
#[case(0.8)]
fn failure_share_converges_to_probability(#[case] p: f64) {
    let clock = ManualClock::new();
    let bounds = recompute_derived(&Tuning::default());
    let cfg = InjectorCfg {
        failure_probability: p,
        ..InjectorCfg::default()
    };
    let injector = FailureInjector::new(cfg);
    let mut state = ControllerState::new(&bounds, cfg.normal_duration, &clock);
    let mut rng = rng_from_seed(Some(42));

    let mut total = Duration::ZERO;
    for _ in 0..2_000 {
        let spent = state.next_mode_duration;
        total += spent;
        injector.transition(&mut state, spent, &bounds, &mut rng);
    }

    let ratio = state.failure_time.as_secs_f64() / total.as_secs_f64();
    // within one longest dwell of the target share
    let slack = cfg.normal_duration.max(cfg.failure_max).as_secs_f64() / total.as_secs_f64();
    assert!(
        (ratio - p).abs() <= slack.max(0.01),
        "ratio {ratio} vs target {p}"
    );

    let entries: u32 = state.mode_stats.iter().map(|(_, s)| s.entries).sum();
    assert_eq!(entries, 2_000);
    let cumulative: Duration = state.mode_stats.iter().map(|(_, s)| s.cumulative).sum();
    assert_eq!(cumulative, total);
}

#[test]
fn presets_are_all_used_and_durations_stay_in_bounds() {
    let clock = ManualClock::new();
    let bounds = recompute_derived(&Tuning::default());
    let cfg = InjectorCfg {
        failure_probability: 0.5,
        ..InjectorCfg::default()
    };
    let injector = FailureInjector::new(cfg);
    let mut state = ControllerState::new(&bounds, cfg.normal_duration, &clock);
    let mut rng = rng_from_seed(Some(9));

    for _ in 0..500 {
        let spent = state.next_mode_duration;
        let t = injector.transition(&mut state, spent, &bounds, &mut rng);
        match t.to {
            Mode::Normal => assert_eq!(t.next_duration, cfg.normal_duration),
            Mode::Jam => assert_eq!(state.commanded_speed, 0.0),
            Mode::Starvation => assert_eq!(state.commanded_speed, bounds.min_speed / 2.0),
            Mode::Burst => assert_eq!(state.commanded_speed, bounds.max_speed * 2.0),
        }
        if t.to.is_failure() {
            assert!(t.next_duration >= cfg.failure_min && t.next_duration <= cfg.failure_max);
        }
    }
    for mode in [Mode::Jam, Mode::Starvation, Mode::Burst] {
        assert!(state.mode_stats.get(mode).entries > 0, "{mode} never chosen");
    }
}
