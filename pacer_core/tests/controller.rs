mod support;

use std::time::Duration;

use pacer_core::mocks::ScriptedRandom;
use pacer_core::{
    ChannelSink, InjectorCfg, Mode, NullSink, PacerParams, RateCfg, SpeedDecision, TelemetryEvent,
    Tuning, preset_for, telemetry,
};
use pacer_hardware::SimRigCfg;
use pacer_traits::{Buttons, LightPattern};
use support::Harness;

fn target_one() -> PacerParams {
    PacerParams {
        tuning: Tuning {
            rate: RateCfg {
                target: 1.0,
                tolerance: 0.1,
                ..RateCfg::default()
            },
            ..Tuning::default()
        },
        ..PacerParams::default()
    }
}

#[test]
fn four_events_in_five_seconds_raise_speed_one_step() {
    let mut h = Harness::new(target_one(), SimRigCfg::default());
    let b = *h.pacer.bounds();
    assert!((b.lower - 0.9).abs() < 1e-12);
    assert!((b.upper - 1.1).abs() < 1e-12);

    let mut last = None;
    for i in 1..=50 {
        h.clock.advance_ms(100);
        let raw = if [1, 11, 21, 31].contains(&i) { 40 } else { 2 };
        let report = h.pacer.tick_with_reading(raw).expect("tick");
        if i < 50 {
            assert!(report.cycle.is_none(), "early rollover at tick {i}");
        }
        last = Some(report);
    }
    let cycle = last.and_then(|r| r.cycle).expect("rollover at 5 s");
    assert!((cycle.cycle_rate - 0.8).abs() < 1e-12);
    assert_eq!(cycle.decision, SpeedDecision::Increase);
    assert!((h.pacer.commanded_speed() - (b.initial_speed + b.speed_step)).abs() < 1e-9);
    assert!((h.rig.speed() - h.pacer.commanded_speed()).abs() < 1e-9);
}

#[test]
fn pause_twice_restores_speed() {
    let mut h = Harness::new(PacerParams::default(), SimRigCfg::default());
    h.run_ms(7_000);
    let before = h.pacer.commanded_speed();

    assert!(h.pacer.toggle_pause().expect("pause"));
    assert_eq!(h.rig.speed(), 0.0);
    h.run_ms(2_000);
    assert!(!h.pacer.toggle_pause().expect("resume"));

    assert!(!h.pacer.is_paused());
    assert_eq!(h.pacer.commanded_speed(), before);
    assert_eq!(h.rig.speed(), before);
    let texts = h.indicator.texts();
    assert!(texts.iter().any(|t| t.starts_with("R:")));
    assert_eq!(texts.last().map(String::as_str), Some("T:0.95"));
}

#[test]
fn speed_computed_while_paused_is_applied_on_resume() {
    // far too many balls per degree: every cycle asks for less speed
    let mut h = Harness::new(
        PacerParams::default(),
        SimRigCfg {
            degrees_per_ball: 30.0,
            ..SimRigCfg::default()
        },
    );
    h.run_ms(1_000);
    h.pacer.toggle_pause().expect("pause");
    let paused_at = h.pacer.commanded_speed();
    // injected readings keep the cycle rate high while the wheel stands still
    for i in 0..1_200 {
        h.clock.advance_ms(5);
        let raw = if i % 40 == 0 { 40 } else { 2 };
        h.pacer.tick_with_reading(raw).expect("tick");
    }
    assert_eq!(h.rig.speed(), 0.0);
    assert!(h.pacer.commanded_speed() < paused_at);
    h.pacer.toggle_pause().expect("resume");
    assert_eq!(h.rig.speed(), h.pacer.commanded_speed());
}

#[test]
fn target_change_recomputes_bounds_and_clamps_speed() {
    let mut h = Harness::new(PacerParams::default(), SimRigCfg::default());

    h.panel.tap(Buttons {
        increase: true,
        ..Buttons::default()
    });
    h.run_ms(20);
    let b = *h.pacer.bounds();
    assert!((b.target - 1.0).abs() < 1e-12);
    assert!((b.lower - 0.95).abs() < 1e-12);
    assert!((b.upper - 1.05).abs() < 1e-12);
    assert!((b.min_speed - 62.5).abs() < 1e-9);
    assert!((b.max_speed - 250.0).abs() < 1e-9);
    // still inside the new range, so untouched
    assert!((h.pacer.commanded_speed() - 118.75).abs() < 1e-9);
    assert_eq!(h.indicator.texts().last().map(String::as_str), Some("1.00"));

    while h.pacer.decrease_target().expect("decrease") {}
    let b = *h.pacer.bounds();
    assert!((b.target - 0.05).abs() < 1e-12);
    assert!((h.pacer.commanded_speed() - b.max_speed).abs() < 1e-9);
    assert!((h.rig.speed() - b.max_speed).abs() < 1e-9);
    assert_eq!(h.indicator.texts().last().map(String::as_str), Some("0.05"));
}

#[test]
fn held_button_moves_target_once() {
    let mut h = Harness::new(PacerParams::default(), SimRigCfg::default());
    let held = Buttons {
        decrease: true,
        ..Buttons::default()
    };
    for _ in 0..10 {
        h.panel.push(held);
    }
    h.run_ms(100);
    assert!((h.pacer.bounds().target - 0.9).abs() < 1e-12);
}

#[test]
fn high_rate_walks_speed_down_to_floor() {
    let mut h = Harness::new(
        PacerParams::default(),
        SimRigCfg {
            degrees_per_ball: 30.0,
            ..SimRigCfg::default()
        },
    );
    let speeds: Vec<f64> = h
        .run_ms(120_000)
        .iter()
        .filter_map(|r| r.cycle)
        .map(|c| c.commanded_speed)
        .collect();
    // rollovers at 5 s, 10 s, ... 115 s
    assert_eq!(speeds.len(), 23);
    assert!(speeds.windows(2).all(|w| w[1] <= w[0]));
    assert_eq!(h.pacer.commanded_speed(), h.pacer.bounds().min_speed);
}

#[test]
fn low_rate_walks_speed_up_to_ceiling() {
    let mut h = Harness::new(
        PacerParams::default(),
        SimRigCfg {
            degrees_per_ball: 1_000.0,
            ..SimRigCfg::default()
        },
    );
    h.run_ms(180_000);
    assert_eq!(h.pacer.commanded_speed(), h.pacer.bounds().max_speed);
}

#[test]
fn cycle_records_reach_the_telemetry_channel() {
    let (sink, rx): (ChannelSink, _) = telemetry::channel(16);
    let mut h = Harness::with_parts(
        PacerParams::default(),
        SimRigCfg::default(),
        Box::new(sink),
        None,
    );
    h.run_ms(11_000);
    let cycles: Vec<_> = rx
        .try_iter()
        .filter_map(|e| match e {
            TelemetryEvent::Cycle(c) => Some(c),
            TelemetryEvent::Mode(_) => None,
        })
        .collect();
    assert_eq!(cycles.len(), 2);
    assert!(cycles[1].total_elapsed > cycles[0].total_elapsed);
    assert!(cycles.iter().all(|c| c.window60_rate.is_none()));
}

#[test]
fn status_light_waits_for_first_minute_then_dedupes() {
    let mut h = Harness::new(PacerParams::default(), SimRigCfg::default());
    let early = h.run_ms(59_000);
    assert!(early.iter().all(|r| r.status.is_none()));
    assert!(h.indicator.lights().is_empty());

    let late = h.run_ms(10_000);
    let status = late
        .iter()
        .rev()
        .find_map(|r| r.status)
        .expect("status after 60 s");
    let lights = h.indicator.lights();
    assert_eq!(lights.last(), Some(&status.light()));
    assert!(lights.windows(2).all(|w| w[0] != w[1]));
    assert!(!lights.contains(&LightPattern::Off));
}

#[test]
fn target_change_during_burst_rescales_preset_speed() {
    let params = PacerParams {
        injector: InjectorCfg {
            failure_probability: 1.0,
            normal_duration: Duration::from_millis(100),
            ..InjectorCfg::default()
        },
        ..PacerParams::default()
    };
    let rng = ScriptedRandom::new([2], [5_000]);
    let mut h = Harness::with_parts(
        params,
        SimRigCfg::default(),
        Box::new(NullSink),
        Some(Box::new(rng)),
    );
    h.run_ms(200);
    assert_eq!(h.pacer.mode(), Mode::Burst);
    let before = h.pacer.commanded_speed();

    assert!(h.pacer.increase_target().expect("increase"));
    let burst = preset_for(Mode::Burst, h.pacer.bounds()).expect("burst preset").speed;
    assert!((h.pacer.commanded_speed() - burst).abs() < 1e-9);
    assert!(h.pacer.commanded_speed() > before);
    assert!((h.rig.speed() - burst).abs() < 1e-9);
    assert_eq!(h.pacer.mode(), Mode::Burst);
}
