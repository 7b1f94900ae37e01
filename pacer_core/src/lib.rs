#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core rate-control logic (hardware-agnostic).
//!
//! This crate holds the closed-loop ball-rate controller. All hardware
//! interactions go through the `pacer_traits` sensor, actuator, operator
//! input and indicator traits.
//!
//! ## Architecture
//!
//! - **Detection**: level-triggered event detector with cooldown (`detector`)
//! - **Estimation**: cycle, 60 s and total rate windows (`rate`)
//! - **Control**: dead-band fixed-step speed controller (`speed`)
//! - **Safety**: stall detection with a bounded reverse maneuver (`antiblock`)
//! - **Stress**: failure-mode injector steering a failure time ratio (`injector`)
//! - **Status**: light and display mapping (`status`)
//!
//! `PacerCore` owns the single `ControllerState` and runs every component
//! once per tick. Derived bounds are recomputed as a whole whenever the
//! operator moves the target rate.

pub mod antiblock;
pub mod bounds;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod controller;
pub mod detector;
pub mod error;
pub mod hw_error;
pub mod injector;
pub mod input;
pub mod mocks;
pub mod rate;
pub mod runner;
pub mod speed;
pub mod state;
pub mod status;
pub mod telemetry;
pub mod timer;
pub mod util;

pub use crate::antiblock::{AntiBlockSupervisor, BlockCheck};
pub use crate::bounds::{DerivedBounds, TargetChange, recompute_derived};
pub use crate::builder::{
    Collaborators, Missing, Pacer, PacerBuilder, PacerG, PacerParams, Set, build_pacer,
};
pub use crate::config::{
    AntiBlockCfg, DetectorCfg, InjectorCfg, Limit, RateCfg, Scalar, SpeedRule, TimingCfg, Tuning,
};
pub use crate::controller::{PacerCore, TickReport};
pub use crate::error::{BuildError, PacerError, Result};
pub use crate::injector::{FailureInjector, FailurePreset, RandomSource, preset_for, rng_from_seed};
pub use crate::runner::{RunParams, RunSummary, run};
pub use crate::speed::{SpeedController, SpeedDecision};
pub use crate::state::{ControllerState, Mode, ModeStat, ModeStats};
pub use crate::status::RateStatus;
pub use crate::telemetry::{
    ChannelSink, CycleRecord, ModeTransition, NullSink, TelemetryEvent, TelemetrySink,
};
