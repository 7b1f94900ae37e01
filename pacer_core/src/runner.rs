//! Run loop: tick at a fixed period until asked to stop.
//!
//! Sleeping goes through the controller's clock, so a `ManualClock` turns a
//! multi-minute run into a fast, deterministic simulation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use pacer_traits::{Actuator, ReflectanceSensor};

use crate::controller::PacerCore;
use crate::error::Result;
use crate::state::ModeStats;

#[derive(Debug, Clone, Copy)]
pub struct RunParams {
    /// Loop period.
    pub tick: Duration,
    /// Stop after this long; `None` runs until shutdown is requested.
    pub max_run: Option<Duration>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(5),
            max_run: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub cycles: u64,
    pub transitions: u64,
    pub unblocks: u64,
    pub total_events: u64,
    pub total_elapsed: Duration,
    pub total_rate: Option<f64>,
    pub target: f64,
    pub final_speed: f64,
    pub failure_ratio: f64,
    pub mode_stats: ModeStats,
}

/// Drive `core` until `shutdown` is set or `params.max_run` has elapsed.
///
/// The wheel is stopped on every exit path; a stop failure after a tick
/// error is logged and the tick error is returned.
pub fn run<S, A>(
    core: &mut PacerCore<S, A>,
    params: RunParams,
    shutdown: &AtomicBool,
) -> Result<RunSummary>
where
    S: ReflectanceSensor,
    A: Actuator,
{
    core.begin()?;
    let clock = core.clock().clone();
    let started = clock.now();
    let mut ticks = 0u64;
    let mut cycles = 0u64;
    let mut transitions = 0u64;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        if let Some(max) = params.max_run
            && clock.now().saturating_duration_since(started) >= max
        {
            tracing::info!(max_run_ms = crate::util::millis(max), "run time reached");
            break;
        }

        match core.tick() {
            Ok(report) => {
                ticks += 1;
                cycles += u64::from(report.cycle.is_some());
                transitions += u64::from(report.transition.is_some());
            }
            Err(e) => {
                if let Err(stop_err) = core.shutdown() {
                    tracing::warn!(error = %stop_err, "actuator stop failed after error");
                }
                return Err(e);
            }
        }
        clock.sleep(params.tick);
    }

    core.shutdown()?;

    let st = core.state();
    Ok(RunSummary {
        ticks,
        cycles,
        transitions,
        unblocks: st.unblocks,
        total_events: st.windows.total.events,
        total_elapsed: st.windows.total.elapsed,
        total_rate: st.windows.total.rate(),
        target: core.bounds().target,
        final_speed: st.last_normal_speed,
        failure_ratio: st.failure_ratio(),
        mode_stats: st.mode_stats,
    })
}
