use pacer_core::error::BuildError;
use pacer_core::{AntiBlockCfg, InjectorCfg, Pacer, RateCfg, TimingCfg};
use pacer_hardware::{SimRig, SimRigCfg};
use pacer_traits::ManualClock;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

fn rig() -> SimRig {
    SimRig::new(SimRigCfg::default(), Arc::new(ManualClock::new()))
}

#[rstest]
fn missing_sensor_yields_typed_build_error() {
    let err = Pacer::builder()
        .with_actuator(rig().actuator())
        .try_build()
        .expect_err("should fail with MissingSensor");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingSensor) => {}
        other => panic!("expected MissingSensor, got: {other:?}"),
    }
}

#[rstest]
fn missing_actuator_yields_typed_build_error() {
    let err = Pacer::builder()
        .with_sensor(rig().sensor())
        .try_build()
        .expect_err("should fail with MissingActuator");

    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingActuator)
    ));
}

#[rstest]
#[case::zero_target(
    RateCfg { target: 0.0, ..RateCfg::default() },
    TimingCfg::default(),
    AntiBlockCfg::default(),
    InjectorCfg::default(),
)]
#[case::full_tolerance(
    RateCfg { tolerance: 1.0, ..RateCfg::default() },
    TimingCfg::default(),
    AntiBlockCfg::default(),
    InjectorCfg::default(),
)]
#[case::target_outside_limits(
    RateCfg { target: 12.0, ..RateCfg::default() },
    TimingCfg::default(),
    AntiBlockCfg::default(),
    InjectorCfg::default(),
)]
#[case::zero_check_interval(
    RateCfg::default(),
    TimingCfg { check_interval: Duration::ZERO, ..TimingCfg::default() },
    AntiBlockCfg::default(),
    InjectorCfg::default(),
)]
#[case::zero_unblock_speed(
    RateCfg::default(),
    TimingCfg::default(),
    AntiBlockCfg { unblock_speed: 0.0, ..AntiBlockCfg::default() },
    InjectorCfg::default(),
)]
#[case::vanishing_unblock_speed(
    RateCfg::default(),
    TimingCfg::default(),
    AntiBlockCfg { unblock_speed: -1e-30, ..AntiBlockCfg::default() },
    InjectorCfg::default(),
)]
#[case::probability_above_one(
    RateCfg::default(),
    TimingCfg::default(),
    AntiBlockCfg::default(),
    InjectorCfg { failure_probability: 1.5, ..InjectorCfg::default() },
)]
#[case::failure_bounds_crossed(
    RateCfg::default(),
    TimingCfg::default(),
    AntiBlockCfg::default(),
    InjectorCfg {
        failure_min: Duration::from_secs(9),
        failure_max: Duration::from_secs(1),
        ..InjectorCfg::default()
    },
)]
fn degenerate_parameters_are_rejected(
    #[case] rate: RateCfg,
    #[case] timing: TimingCfg,
    #[case] antiblock: AntiBlockCfg,
    #[case] injector: InjectorCfg,
) {
    let rig = rig();
    let err = Pacer::builder()
        .with_sensor(rig.sensor())
        .with_actuator(rig.actuator())
        .with_rate(rate)
        .with_timing(timing)
        .with_antiblock(antiblock)
        .with_injector(injector)
        .build()
        .expect_err("should be rejected");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[test]
fn defaults_build_and_report_worst_case_unblock() {
    let rig = rig();
    let pacer = Pacer::builder()
        .with_sensor(rig.sensor())
        .with_actuator(rig.actuator())
        .with_seed(1)
        .build()
        .expect("defaults are valid");
    assert_eq!(pacer.worst_case_unblock(), Duration::from_millis(100));
    assert!((pacer.commanded_speed() - 118.75).abs() < 1e-9);
}
