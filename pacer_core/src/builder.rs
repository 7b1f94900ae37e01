//! Type-state builder for `Pacer` and generic `build_pacer` constructor.
//!
//! The builder enforces at compile time that a sensor and an actuator are
//! provided before `build()` is available. `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use pacer_traits::{Actuator, Clock, Indicator, MonotonicClock, OperatorInput, ReflectanceSensor};

use crate::antiblock::AntiBlockSupervisor;
use crate::bounds::{DerivedBounds, recompute_derived};
use crate::config::*;
use crate::controller::{PacerCore, TickReport};
use crate::detector::EventDetector;
use crate::error::{BuildError, Result};
use crate::injector::{FailureInjector, RandomSource, rng_from_seed};
use crate::input::ButtonEdges;
use crate::mocks::{NoopPanel, NullIndicator};
use crate::rate::RateEstimator;
use crate::runner::{RunParams, RunSummary};
use crate::speed::SpeedController;
use crate::state::{ControllerState, Mode};
use crate::telemetry::{NullSink, TelemetrySink};

/// All numeric parameters of the controller.
#[derive(Debug, Clone, Default)]
pub struct PacerParams {
    pub tuning: Tuning,
    pub timing: TimingCfg,
    pub detector: DetectorCfg,
    pub antiblock: AntiBlockCfg,
    pub injector: InjectorCfg,
}

/// Peripheral collaborators; every one has a do-nothing default.
pub struct Collaborators {
    pub panel: Box<dyn OperatorInput>,
    pub indicator: Box<dyn Indicator>,
    pub sink: Box<dyn TelemetrySink>,
    /// `None` builds a `StdRng` from `seed`.
    pub rng: Option<Box<dyn RandomSource>>,
    /// `None` seeds from OS entropy.
    pub seed: Option<u64>,
    pub clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            panel: Box::new(NoopPanel),
            indicator: Box::new(NullIndicator),
            sink: Box::new(NullSink),
            rng: None,
            seed: None,
            clock: None,
        }
    }
}

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

/// Public dynamic (boxed) controller.
pub struct Pacer {
    pub(crate) inner: PacerCore<Box<dyn ReflectanceSensor>, Box<dyn Actuator>>,
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer").field("inner", &self.inner).finish()
    }
}

impl Pacer {
    /// Start building a Pacer.
    pub fn builder() -> PacerBuilder<Missing, Missing> {
        PacerBuilder::default()
    }

    /// Reset per-run state and start the wheel.
    pub fn begin(&mut self) -> Result<()> {
        self.inner.begin()
    }

    /// One iteration of the control loop.
    pub fn tick(&mut self) -> Result<TickReport> {
        self.inner.tick()
    }

    /// Process a pre-sampled raw reading.
    pub fn tick_with_reading(&mut self, raw: i32) -> Result<TickReport> {
        self.inner.tick_with_reading(raw)
    }

    pub fn increase_target(&mut self) -> Result<bool> {
        self.inner.increase_target()
    }

    pub fn decrease_target(&mut self) -> Result<bool> {
        self.inner.decrease_target()
    }

    pub fn toggle_pause(&mut self) -> Result<bool> {
        self.inner.toggle_pause()
    }

    /// Run until `shutdown` is raised or `params.max_run` elapses.
    pub fn run(&mut self, params: RunParams, shutdown: &AtomicBool) -> Result<RunSummary> {
        crate::runner::run(&mut self.inner, params, shutdown)
    }

    /// Stop the wheel (best-effort).
    pub fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown()
    }

    pub fn state(&self) -> &ControllerState {
        self.inner.state()
    }

    pub fn bounds(&self) -> &DerivedBounds {
        self.inner.bounds()
    }

    pub fn mode(&self) -> Mode {
        self.inner.mode()
    }

    pub fn commanded_speed(&self) -> f64 {
        self.inner.commanded_speed()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.is_paused()
    }

    pub fn worst_case_unblock(&self) -> Duration {
        self.inner.worst_case_unblock()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Pacer`. All fields are validated on `build()`.
pub struct PacerBuilder<S, A> {
    sensor: Option<Box<dyn ReflectanceSensor>>,
    actuator: Option<Box<dyn Actuator>>,
    params: PacerParams,
    parts: Collaborators,
    _s: PhantomData<S>,
    _a: PhantomData<A>,
}

impl Default for PacerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            sensor: None,
            actuator: None,
            params: PacerParams::default(),
            parts: Collaborators::default(),
            _s: PhantomData,
            _a: PhantomData,
        }
    }
}

/// Slowest reverse move accepted, in deg/s.
pub const MIN_UNBLOCK_SPEED: f64 = 1.0;

#[inline]
fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(p: &PacerParams) -> Result<()> {
    let rate = &p.tuning.rate;
    if !(rate.target.is_finite() && rate.target > 0.0) {
        return Err(invalid("target rate must be > 0"));
    }
    if !(0.0..1.0).contains(&rate.tolerance) {
        return Err(invalid("tolerance must be in [0, 1)"));
    }
    if !(rate.step.is_finite() && rate.step > 0.0) {
        return Err(invalid("target step must be > 0"));
    }
    if !(rate.min_target > 0.0 && rate.min_target <= rate.max_target) {
        return Err(invalid("target limits must satisfy 0 < min <= max"));
    }
    if rate.target < rate.min_target || rate.target > rate.max_target {
        return Err(invalid("target rate outside its limits"));
    }
    let bounds = recompute_derived(&p.tuning);
    if !(bounds.min_speed.is_finite() && bounds.min_speed > 0.0) {
        return Err(invalid("min speed must be > 0"));
    }
    if !(bounds.speed_step.is_finite() && bounds.speed_step > 0.0) {
        return Err(invalid("speed step must be > 0"));
    }
    if p.timing.check_interval.is_zero() {
        return Err(invalid("check interval must be >= 1 ms"));
    }
    if p.timing.cycle_window.is_zero() || p.timing.window60.is_zero() {
        return Err(invalid("rate windows must be non-empty"));
    }
    if p.antiblock.check_interval.is_zero() {
        return Err(invalid("block check interval must be >= 1 ms"));
    }
    if !(p.antiblock.unblock_speed.is_finite()
        && p.antiblock.unblock_speed.abs() >= MIN_UNBLOCK_SPEED)
    {
        return Err(invalid("unblock speed magnitude must be >= 1 deg/s"));
    }
    if !(0.0..=1.0).contains(&p.injector.failure_probability) {
        return Err(invalid("failure probability must be in [0, 1]"));
    }
    if p.injector.failure_min > p.injector.failure_max {
        return Err(invalid("failure min duration exceeds max"));
    }
    if p.injector.enabled() && (p.injector.normal_duration.is_zero() || p.injector.failure_max.is_zero())
    {
        return Err(invalid("mode durations must be > 0"));
    }
    Ok(())
}

/// Validate parameters and construct a `PacerCore`.
///
/// This is the single source of truth for validation and construction,
/// used by both `PacerBuilder::try_build()` and `build_pacer()`.
fn validate_and_build<S: ReflectanceSensor, A: Actuator>(
    sensor: S,
    actuator: A,
    params: PacerParams,
    parts: Collaborators,
) -> Result<PacerCore<S, A>> {
    validate(&params)?;

    let clock: Arc<dyn Clock + Send + Sync> = match parts.clock {
        Some(c) => c,
        None => Arc::new(MonotonicClock::new()),
    };
    let rng: Box<dyn RandomSource> = match parts.rng {
        Some(r) => r,
        None => Box::new(rng_from_seed(parts.seed)),
    };
    let bounds = recompute_derived(&params.tuning);
    let state = ControllerState::new(&bounds, params.injector.normal_duration, &*clock);
    let epoch = clock.now();

    Ok(PacerCore {
        sensor,
        actuator,
        panel: parts.panel,
        indicator: parts.indicator,
        sink: parts.sink,
        rng,
        clock,
        epoch,
        tuning: params.tuning,
        bounds,
        detector: EventDetector::new(&params.detector),
        estimator: RateEstimator::new(&params.timing),
        speed: SpeedController,
        antiblock: AntiBlockSupervisor::new(params.antiblock),
        injector: FailureInjector::new(params.injector),
        state,
        edges: ButtonEdges::default(),
        started: false,
    })
}

/// Generic, statically-dispatched alias using the unified core.
pub type PacerG<S, A> = PacerCore<S, A>;

/// Build a generic, statically-dispatched `PacerG` from concrete sensor and actuator.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_pacer<S: ReflectanceSensor, A: Actuator>(
    sensor: S,
    actuator: A,
    params: PacerParams,
    parts: Collaborators,
) -> Result<PacerG<S, A>> {
    validate_and_build(sensor, actuator, params, parts)
}

impl<S, A> PacerBuilder<S, A> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Pacer> {
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        let inner = validate_and_build(sensor, actuator, self.params, self.parts)?;
        Ok(Pacer { inner })
    }

    fn retype<S2, A2>(self) -> PacerBuilder<S2, A2> {
        PacerBuilder {
            sensor: self.sensor,
            actuator: self.actuator,
            params: self.params,
            parts: self.parts,
            _s: PhantomData,
            _a: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<S, A> PacerBuilder<S, A> {
    pub fn with_params(mut self, params: PacerParams) -> Self {
        self.params = params;
        self
    }
    pub fn with_rate(mut self, rate: RateCfg) -> Self {
        self.params.tuning.rate = rate;
        self
    }
    pub fn with_target_rate(mut self, target: f64) -> Self {
        self.params.tuning.rate.target = target;
        self
    }
    pub fn with_speed_rule(mut self, speed: SpeedRule) -> Self {
        self.params.tuning.speed = speed;
        self
    }
    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.params.timing = timing;
        self
    }
    pub fn with_detector(mut self, detector: DetectorCfg) -> Self {
        self.params.detector = detector;
        self
    }
    pub fn with_antiblock(mut self, antiblock: AntiBlockCfg) -> Self {
        self.params.antiblock = antiblock;
        self
    }
    pub fn with_injector(mut self, injector: InjectorCfg) -> Self {
        self.params.injector = injector;
        self
    }
    pub fn with_panel(mut self, panel: impl OperatorInput + 'static) -> Self {
        self.parts.panel = Box::new(panel);
        self
    }
    pub fn with_indicator(mut self, indicator: impl Indicator + 'static) -> Self {
        self.parts.indicator = Box::new(indicator);
        self
    }
    pub fn with_sink(mut self, sink: impl TelemetrySink + 'static) -> Self {
        self.parts.sink = Box::new(sink);
        self
    }
    /// Replace the injector's randomness; takes precedence over `with_seed`.
    pub fn with_random(mut self, rng: impl RandomSource + 'static) -> Self {
        self.parts.rng = Some(Box::new(rng));
        self
    }
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.parts.seed = Some(seed);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.parts.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<A> PacerBuilder<Missing, A> {
    pub fn with_sensor(
        mut self,
        sensor: impl ReflectanceSensor + 'static,
    ) -> PacerBuilder<Set, A> {
        self.sensor = Some(Box::new(sensor));
        self.retype()
    }
}

impl<S> PacerBuilder<S, Missing> {
    pub fn with_actuator(mut self, actuator: impl Actuator + 'static) -> PacerBuilder<S, Set> {
        self.actuator = Some(Box::new(actuator));
        self.retype()
    }
}

impl PacerBuilder<Set, Set> {
    /// Build when both hardware handles are set.
    pub fn build(self) -> Result<Pacer> {
        self.try_build()
    }
}
