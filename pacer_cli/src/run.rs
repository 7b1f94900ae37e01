//! Assembly of rig, peripherals and controller for the `run` and `self-check` commands.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use pacer_core::{Pacer, PacerParams, RunParams, RunSummary};
use pacer_hardware::{LogIndicator, SimRig, SimRigCfg};
use pacer_traits::{Clock, Indicator, MonotonicClock, OperatorInput};

use crate::cli::{RtLock, RunArgs};
use crate::panel::StdinPanel;
use crate::rt::{RtOptions, setup_rt_once};
use crate::telemetry_csv;

/// Outcome of a run plus what the CLI reports next to it.
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub csv_rows: Option<u64>,
    pub dropped: u64,
}

/// Fold command-line overrides into the loaded config and re-validate.
pub fn apply_overrides(cfg: &mut pacer_config::Config, args: &RunArgs) -> eyre::Result<()> {
    if let Some(t) = args.target_rate {
        cfg.rate.target = t;
    }
    if let Some(p) = args.failure_probability {
        cfg.injector.failure_probability = p;
    }
    if let Some(seed) = args.seed {
        cfg.injector.seed = Some(seed);
        if cfg.sim.seed.is_none() {
            cfg.sim.seed = Some(seed);
        }
    }
    if let Some(path) = &args.telemetry_csv {
        cfg.telemetry.csv = Some(path.display().to_string());
    }
    pacer_core::conversions::validate_config(cfg)
}

fn sim_rig(cfg: &pacer_config::SimCfg, clock: Arc<dyn Clock + Send + Sync>) -> SimRig {
    SimRig::new(
        SimRigCfg {
            degrees_per_ball: cfg.degrees_per_ball,
            ball_pass: Duration::from_millis(cfg.ball_pass_ms),
            reflect_low: cfg.reflect_low,
            reflect_high: cfg.reflect_high,
            jam_chance_per_s: cfg.jam_chance_per_s,
            seed: cfg.seed,
        },
        clock,
    )
}

fn make_panel(cfg: &pacer_config::Config, stdin: bool) -> eyre::Result<Box<dyn OperatorInput>> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let p = &cfg.pins;
        if let (Some(inc), Some(dec), Some(pause)) =
            (p.button_increase, p.button_decrease, p.button_pause)
        {
            let panel = pacer_hardware::gpio::GpioPanel::new(
                inc,
                dec,
                pause,
                p.active_low.unwrap_or(true),
            )
            .wrap_err("open button pins")?;
            return Ok(Box::new(panel));
        }
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    let _ = cfg;
    if stdin {
        Ok(Box::new(StdinPanel::spawn()))
    } else {
        Ok(Box::new(pacer_core::mocks::NoopPanel))
    }
}

fn make_indicator(cfg: &pacer_config::Config) -> eyre::Result<Box<dyn Indicator>> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let p = &cfg.pins;
        if let (Some(r), Some(g), Some(b)) = (p.led_red, p.led_green, p.led_blue) {
            let light = pacer_hardware::gpio::GpioLight::new(r, g, b).wrap_err("open led pins")?;
            return Ok(Box::new(light));
        }
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    let _ = cfg;
    Ok(Box::new(LogIndicator::new()))
}

/// Build the controller against the simulated rig with the configured peripherals.
fn assemble(
    cfg: &pacer_config::Config,
    stdin_panel: bool,
    clock: Arc<dyn Clock + Send + Sync>,
) -> eyre::Result<pacer_core::PacerBuilder<pacer_core::Set, pacer_core::Set>> {
    let rig = sim_rig(&cfg.sim, clock.clone());
    let mut builder = Pacer::builder()
        .with_sensor(rig.sensor())
        .with_actuator(rig.actuator())
        .with_params(PacerParams::from(cfg))
        .with_clock(clock);
    if let Some(seed) = cfg.injector.seed {
        builder = builder.with_seed(seed);
    }
    let panel = make_panel(cfg, stdin_panel)?;
    let indicator = make_indicator(cfg)?;
    Ok(builder.with_panel(panel).with_indicator(indicator))
}

pub fn run_pacer(
    cfg: &pacer_config::Config,
    args: &RunArgs,
    shutdown: &AtomicBool,
) -> eyre::Result<RunOutcome> {
    if args.rt {
        setup_rt_once(RtOptions {
            prio: args.rt_prio,
            lock: args.rt_lock.unwrap_or_else(RtLock::os_default),
            cpu: args.rt_cpu,
        });
    }

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let mut builder = assemble(cfg, args.stdin_panel, clock)?;

    let mut writer = None;
    let mut dropped = None;
    if let Some(path) = cfg.telemetry.csv.as_deref() {
        let (sink, rx) = pacer_core::telemetry::channel(cfg.telemetry.channel_capacity);
        dropped = Some(sink.dropped_counter());
        writer = Some(telemetry_csv::spawn(std::path::Path::new(path), rx)?);
        builder = builder.with_sink(sink);
    }

    let mut pacer = builder.build()?;
    let mut params = RunParams::from(&cfg.timing);
    params.max_run = args.duration_ms.map(Duration::from_millis);

    tracing::info!(
        target_rate = pacer.bounds().target,
        speed = pacer.commanded_speed(),
        failure_probability = cfg.injector.failure_probability,
        "run start"
    );
    let result = pacer.run(params, shutdown);
    // Dropping the controller closes the telemetry channel so the writer can finish.
    drop(pacer);

    let csv_rows = match writer {
        Some(handle) => {
            let written = handle
                .join()
                .map_err(|_| eyre::eyre!("telemetry writer panicked"))?;
            match written {
                Ok(n) => Some(n),
                Err(e) => {
                    tracing::warn!(error = %e, "telemetry csv incomplete");
                    None
                }
            }
        }
        None => None,
    };
    let dropped = dropped.map_or(0, |c| c.load(std::sync::atomic::Ordering::Relaxed));
    if dropped > 0 {
        tracing::warn!(dropped, "telemetry records dropped");
    }

    let summary = result?;
    tracing::info!(
        events = summary.total_events,
        cycles = summary.cycles,
        unblocks = summary.unblocks,
        final_speed = summary.final_speed,
        "run complete"
    );
    Ok(RunOutcome {
        summary,
        csv_rows,
        dropped,
    })
}

/// Build everything a run needs, spin the loop briefly and stop the wheel.
pub fn self_check(cfg: &pacer_config::Config) -> eyre::Result<()> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let mut pacer = assemble(cfg, false, clock.clone())?.build()?;
    pacer.begin().wrap_err("start wheel")?;
    for _ in 0..3 {
        pacer.tick().wrap_err("control tick")?;
        clock.sleep(Duration::from_millis(1));
    }
    pacer.shutdown().wrap_err("stop wheel")?;
    tracing::info!(
        worst_case_unblock_ms = pacer_core::util::millis(pacer.worst_case_unblock()),
        "self-check passed"
    );
    Ok(())
}
