//! The rate control loop (`PacerCore`).
//!
//! One `tick` runs every component in a fixed order against the single
//! `ControllerState`: event detection, operator input, the rate windows (and
//! on rollover the speed controller and the status light), the anti-blocking
//! supervisor and finally the failure injector.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use pacer_traits::{Actuator, Clock, Indicator, OperatorInput, ReflectanceSensor};

use crate::antiblock::{AntiBlockSupervisor, BlockCheck};
use crate::bounds::{DerivedBounds, TargetChange, recompute_derived, step_target};
use crate::config::Tuning;
use crate::detector::EventDetector;
use crate::error::Result;
use crate::hw_error::hw_report;
use crate::injector::{FailureInjector, RandomSource, apply_effect, preset_for};
use crate::input::ButtonEdges;
use crate::rate::{CycleRollover, RateEstimator};
use crate::speed::SpeedController;
use crate::state::{ControllerState, Mode};
use crate::status::{self, RateStatus};
use crate::telemetry::{CycleRecord, ModeTransition, TelemetryEvent, TelemetrySink};
use crate::util::millis;

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// A ball was counted.
    pub event: bool,
    /// Set when a cycle window completed.
    pub cycle: Option<CycleRecord>,
    /// Set on check ticks once a 60 s rate exists.
    pub status: Option<RateStatus>,
    pub block: BlockCheck,
    pub transition: Option<ModeTransition>,
}

/// Unified core for both dynamic (boxed) and generic (static dispatch) variants.
pub struct PacerCore<S: ReflectanceSensor, A: Actuator> {
    pub(crate) sensor: S,
    pub(crate) actuator: A,
    pub(crate) panel: Box<dyn OperatorInput>,
    pub(crate) indicator: Box<dyn Indicator>,
    pub(crate) sink: Box<dyn TelemetrySink>,
    pub(crate) rng: Box<dyn RandomSource>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,

    pub(crate) tuning: Tuning,
    pub(crate) bounds: DerivedBounds,
    pub(crate) detector: EventDetector,
    pub(crate) estimator: RateEstimator,
    pub(crate) speed: SpeedController,
    pub(crate) antiblock: AntiBlockSupervisor,
    pub(crate) injector: FailureInjector,

    pub(crate) state: ControllerState,
    pub(crate) edges: ButtonEdges,
    pub(crate) started: bool,
}

impl<S: ReflectanceSensor, A: Actuator> std::fmt::Debug for PacerCore<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacerCore")
            .field("bounds", &self.bounds)
            .field("mode", &self.state.mode)
            .field("commanded_speed", &self.state.commanded_speed)
            .field("paused", &self.state.paused)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl<S: ReflectanceSensor, A: Actuator> PacerCore<S, A> {
    /// Reset per-run state, show the target and start the wheel.
    pub fn begin(&mut self) -> Result<()> {
        let clock = self.clock.clone();
        let clock = &*clock;
        self.state = ControllerState::new(
            &self.bounds,
            self.injector.cfg().normal_duration,
            clock,
        );
        self.epoch = clock.now();
        self.edges = ButtonEdges::default();
        self.state.last_actuator_position = self
            .actuator
            .angle()
            .map_err(hw_report)
            .wrap_err("actuator angle")?;
        status::display(&mut *self.indicator, &status::target_text(self.bounds.target));
        self.actuator
            .run(self.state.commanded_speed)
            .map_err(hw_report)
            .wrap_err("actuator start")?;
        self.started = true;
        tracing::info!(
            target_rate = self.bounds.target,
            lower = self.bounds.lower,
            upper = self.bounds.upper,
            speed = self.state.commanded_speed,
            min_speed = self.bounds.min_speed,
            max_speed = self.bounds.max_speed,
            injector = self.injector.enabled(),
            "pacer started"
        );
        Ok(())
    }

    /// One iteration of the control loop. Calls `begin` on first use.
    pub fn tick(&mut self) -> Result<TickReport> {
        if !self.started {
            self.begin()?;
        }
        let raw = self
            .sensor
            .reflection()
            .map_err(hw_report)
            .wrap_err("reading sensor")?;
        self.tick_with_reading(raw)
    }

    /// Process an externally sampled raw reading.
    pub fn tick_with_reading(&mut self, raw: i32) -> Result<TickReport> {
        if !self.started {
            self.begin()?;
        }
        let clock = self.clock.clone();
        let clock = &*clock;

        let event = self
            .detector
            .observe(raw, &mut self.state.timers.cooldown, clock);
        if event {
            self.state.windows.record_event();
            tracing::trace!(raw, "ball detected");
        }

        self.handle_operator()?;

        let mut cycle = None;
        let mut rate_status = None;
        if let Some(fold) =
            self.estimator
                .poll(&mut self.state.windows, &mut self.state.timers.check, clock)
        {
            if let Some(rollover) = fold.cycle {
                cycle = Some(self.on_cycle(rollover)?);
            }
            if let Some(rate) = fold.window60_rate {
                tracing::debug!(rate, "60 s window completed");
            }
            rate_status = status::report(self.state.windows.last_window60_rate, &self.bounds);
            if let Some(s) = rate_status {
                status::show(&mut *self.indicator, &mut self.state.last_light, s.light());
            }
        }

        let block = self.antiblock.check(
            &mut self.state,
            &mut self.actuator,
            &mut *self.indicator,
            clock,
        )?;

        let transition = self.poll_injector()?;

        Ok(TickReport {
            event,
            cycle,
            status: rate_status,
            block,
            transition,
        })
    }

    fn handle_operator(&mut self) -> Result<()> {
        let levels = match self.panel.poll() {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "operator input poll failed");
                return Ok(());
            }
        };
        let pressed = self.edges.rising(levels);
        if pressed.decrease {
            self.change_target(TargetChange::Decrease)?;
        }
        if pressed.increase {
            self.change_target(TargetChange::Increase)?;
        }
        if pressed.pause {
            self.toggle_pause()?;
        }
        Ok(())
    }

    fn on_cycle(&mut self, rollover: CycleRollover) -> Result<CycleRecord> {
        let adjustment = if self.state.mode == Mode::Normal {
            let adj = self
                .speed
                .adjust(self.state.commanded_speed, rollover.rate, &self.bounds);
            self.state.commanded_speed = adj.speed;
            self.state.last_normal_speed = adj.speed;
            if !self.state.paused {
                self.actuator
                    .run(adj.speed)
                    .map_err(hw_report)
                    .wrap_err("actuator run")?;
            }
            adj
        } else {
            let adj = self
                .speed
                .adjust(self.state.last_normal_speed, rollover.rate, &self.bounds);
            tracing::debug!(
                mode = %self.state.mode,
                decision = adj.decision.as_str(),
                "failure mode owns the setpoint; speed decision discarded"
            );
            adj
        };

        let total = self.state.windows.total;
        let total_secs = total.elapsed.as_secs_f64();
        let angle = self
            .actuator
            .angle()
            .map_err(hw_report)
            .wrap_err("actuator angle")?;
        let average_speed = if total_secs > 0.0 {
            angle as f64 / total_secs
        } else {
            0.0
        };

        let record = CycleRecord {
            uptime: self.clock.now().saturating_duration_since(self.epoch),
            cycle_rate: rollover.rate,
            window60_rate: self.state.windows.last_window60_rate,
            total_rate: total.rate().unwrap_or(0.0),
            target: self.bounds.target,
            lower: self.bounds.lower,
            upper: self.bounds.upper,
            commanded_speed: self.state.commanded_speed,
            average_speed,
            total_elapsed: total.elapsed,
            total_events: total.events,
            mode: self.state.mode,
            paused: self.state.paused,
            decision: adjustment.decision,
        };
        tracing::info!(
            cycle_rate = record.cycle_rate,
            total_rate = record.total_rate,
            speed = record.commanded_speed,
            decision = record.decision.as_str(),
            mode = %record.mode,
            "{record}"
        );
        self.sink.publish(TelemetryEvent::Cycle(record));
        Ok(record)
    }

    fn poll_injector(&mut self) -> Result<Option<ModeTransition>> {
        let clock = self.clock.clone();
        let clock = &*clock;
        let Some(t) = self
            .injector
            .poll(&mut self.state, &self.bounds, &mut *self.rng, clock)
        else {
            return Ok(None);
        };
        if !self.state.paused {
            apply_effect(&self.state, &mut self.actuator)
                .map_err(hw_report)
                .wrap_err("applying mode speed")?;
            if t.from == Mode::Jam {
                self.antiblock
                    .rearm(&mut self.state, &mut self.actuator, clock)?;
            }
        }
        tracing::info!(
            from = %t.from,
            to = %t.to,
            spent_ms = millis(t.spent),
            failure_ratio = t.failure_ratio,
            "{t}"
        );
        self.sink.publish(TelemetryEvent::Mode(t));
        Ok(Some(t))
    }

    /// Move the target rate one step and recompute every derived bound.
    /// Returns `false` when the target is already at its limit.
    pub fn change_target(&mut self, change: TargetChange) -> Result<bool> {
        if !step_target(&mut self.tuning.rate, change) {
            tracing::debug!(target_rate = self.tuning.rate.target, ?change, "target at limit");
            return Ok(false);
        }
        self.bounds = recompute_derived(&self.tuning);

        let clamped = self.bounds.clamp_speed(self.state.last_normal_speed);
        self.state.last_normal_speed = clamped;
        // Failure presets scale with the new speed range too.
        let next = preset_for(self.state.mode, &self.bounds).map_or(clamped, |p| p.speed);
        if (self.state.commanded_speed - next).abs() > f64::EPSILON {
            self.state.commanded_speed = next;
            if !self.state.paused {
                apply_effect(&self.state, &mut self.actuator)
                    .map_err(hw_report)
                    .wrap_err("actuator run")?;
            }
        }
        status::display(&mut *self.indicator, &status::target_text(self.bounds.target));
        tracing::info!(
            target_rate = self.bounds.target,
            lower = self.bounds.lower,
            upper = self.bounds.upper,
            min_speed = self.bounds.min_speed,
            max_speed = self.bounds.max_speed,
            "target rate changed"
        );
        Ok(true)
    }

    pub fn increase_target(&mut self) -> Result<bool> {
        self.change_target(TargetChange::Increase)
    }

    pub fn decrease_target(&mut self) -> Result<bool> {
        self.change_target(TargetChange::Decrease)
    }

    /// Flip the pause state; returns the new state.
    pub fn toggle_pause(&mut self) -> Result<bool> {
        let paused = !self.state.paused;
        self.set_paused(paused)?;
        Ok(paused)
    }

    /// Pausing stops the wheel and shows the running totals. Resuming
    /// restores the current mode's speed and re-arms the stall check.
    pub fn set_paused(&mut self, paused: bool) -> Result<()> {
        if self.state.paused == paused {
            return Ok(());
        }
        self.state.paused = paused;
        if paused {
            self.actuator
                .stop()
                .map_err(hw_report)
                .wrap_err("actuator stop")?;
            let total = self.state.windows.total;
            status::display(
                &mut *self.indicator,
                &status::paused_text(total.rate().unwrap_or(0.0), total.events),
            );
            tracing::info!(total_events = total.events, "paused");
        } else {
            status::display(&mut *self.indicator, &status::resumed_text(self.bounds.target));
            apply_effect(&self.state, &mut self.actuator)
                .map_err(hw_report)
                .wrap_err("actuator resume")?;
            let clock = self.clock.clone();
            self.antiblock
                .rearm(&mut self.state, &mut self.actuator, &*clock)?;
            tracing::info!(speed = self.state.commanded_speed, mode = %self.state.mode, "resumed");
        }
        Ok(())
    }

    /// Stop the wheel and log the per-mode totals.
    pub fn shutdown(&mut self) -> Result<()> {
        let res = self
            .actuator
            .stop()
            .map_err(hw_report)
            .wrap_err("actuator stop");
        status::signal(
            &mut *self.indicator,
            &mut self.state.last_light,
            pacer_traits::LightPattern::Off,
        );
        if self.injector.enabled() {
            for (mode, stat) in self.state.mode_stats.iter() {
                tracing::info!(
                    mode = %mode,
                    entries = stat.entries,
                    cumulative_s = stat.cumulative.as_secs_f64(),
                    "mode totals"
                );
            }
        }
        tracing::info!(
            total_events = self.state.windows.total.events,
            total_s = self.state.windows.total.elapsed.as_secs_f64(),
            unblocks = self.state.unblocks,
            failure_ratio = self.state.failure_ratio(),
            "pacer stopped"
        );
        self.started = false;
        res
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn bounds(&self) -> &DerivedBounds {
        &self.bounds
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn commanded_speed(&self) -> f64 {
        self.state.commanded_speed
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    /// Time since `begin`.
    pub fn uptime(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.epoch)
    }

    /// Longest the loop can stall inside one unblock maneuver.
    pub fn worst_case_unblock(&self) -> Duration {
        self.antiblock.worst_case_duration()
    }
}
