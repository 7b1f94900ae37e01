use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use pacer_core::{
    Collaborators, PacerParams, RateCfg, SpeedController, Tuning, build_pacer, recompute_derived,
};
use pacer_hardware::{SimRig, SimRigCfg};
use pacer_traits::ManualClock;

fn bench_tick(c: &mut Criterion) {
    c.bench_function("tick_sim_rig_5ms", |b| {
        b.iter_batched(
            || {
                let clock = ManualClock::new();
                let rig = SimRig::new(
                    SimRigCfg {
                        seed: Some(1),
                        ..SimRigCfg::default()
                    },
                    Arc::new(clock.clone()),
                );
                let parts = Collaborators {
                    seed: Some(1),
                    clock: Some(Arc::new(clock.clone())),
                    ..Collaborators::default()
                };
                let pacer = build_pacer(rig.sensor(), rig.actuator(), PacerParams::default(), parts)
                    .expect("valid params");
                (pacer, clock)
            },
            |(mut pacer, clock)| {
                // one simulated second of control loop
                for _ in 0..200 {
                    black_box(pacer.tick().expect("tick"));
                    clock.advance_ms(5);
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_speed_adjust(c: &mut Criterion) {
    let bounds = recompute_derived(&Tuning {
        rate: RateCfg {
            target: 1.0,
            tolerance: 0.1,
            ..RateCfg::default()
        },
        ..Tuning::default()
    });
    c.bench_function("speed_adjust", |b| {
        let mut speed = bounds.initial_speed;
        let mut i = 0u32;
        b.iter(|| {
            i = i.wrapping_add(1);
            let rate = f64::from(i % 25) / 10.0;
            speed = SpeedController
                .adjust(black_box(speed), black_box(rate), &bounds)
                .speed;
            speed
        })
    });
}

criterion_group!(benches, bench_tick, bench_speed_adjust);
criterion_main!(benches);
