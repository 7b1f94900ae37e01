//! `From` implementations bridging `pacer_config` types to `pacer_core` types.

use std::time::Duration;

use crate::builder::PacerParams;
use crate::error::{PacerError, Result};
use crate::config::{
    AntiBlockCfg, DetectorCfg, InjectorCfg, Limit, RateCfg, Scalar, SpeedRule, TimingCfg, Tuning,
};
use crate::runner::RunParams;
use crate::util::secs;

/// Run `Config::validate`, reporting failures as `PacerError::Config`.
pub fn validate_config(cfg: &pacer_config::Config) -> Result<()> {
    cfg.validate()
        .map_err(|e| eyre::Report::new(PacerError::Config(format!("{e:#}"))))
}

// ── RateCfg ──────────────────────────────────────────────────────────────────

impl From<&pacer_config::RateCfg> for RateCfg {
    fn from(c: &pacer_config::RateCfg) -> Self {
        Self {
            target: c.target,
            tolerance: c.tolerance,
            step: c.step,
            min_target: c.min_target,
            max_target: c.max_target,
        }
    }
}

// ── SpeedRule ────────────────────────────────────────────────────────────────

impl From<&pacer_config::SpeedCfg> for SpeedRule {
    fn from(c: &pacer_config::SpeedCfg) -> Self {
        Self {
            initial: c
                .initial
                .map_or(Scalar::PerRate(c.initial_per_rate), Scalar::Fixed),
            step: c.step.map_or(Scalar::PerRate(c.step_per_rate), Scalar::Fixed),
            min: c.min.map_or(Limit::OfInitial(c.min_factor), Limit::Fixed),
            max: c.max.map_or(Limit::OfInitial(c.max_factor), Limit::Fixed),
        }
    }
}

// ── TimingCfg ────────────────────────────────────────────────────────────────

impl From<&pacer_config::TimingCfg> for TimingCfg {
    fn from(c: &pacer_config::TimingCfg) -> Self {
        Self {
            check_interval: Duration::from_millis(c.check_interval_ms),
            cycle_window: secs(c.cycle_window_s),
            window60: secs(c.window60_s),
        }
    }
}

impl From<&pacer_config::DetectorCfg> for DetectorCfg {
    fn from(c: &pacer_config::DetectorCfg) -> Self {
        Self {
            threshold: c.threshold,
            cooldown: Duration::from_millis(c.cooldown_ms),
        }
    }
}

impl From<&pacer_config::AntiBlockCfg> for AntiBlockCfg {
    fn from(c: &pacer_config::AntiBlockCfg) -> Self {
        Self {
            check_interval: Duration::from_millis(c.check_interval_ms),
            threshold_deg: c.threshold_deg,
            reverse_deg: c.reverse_deg,
            unblock_speed: c.unblock_speed,
        }
    }
}

impl From<&pacer_config::InjectorCfg> for InjectorCfg {
    fn from(c: &pacer_config::InjectorCfg) -> Self {
        Self {
            failure_probability: c.failure_probability,
            failure_min: Duration::from_millis(c.failure_min_ms),
            failure_max: Duration::from_millis(c.failure_max_ms),
            normal_duration: Duration::from_millis(c.normal_duration_ms),
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&pacer_config::Config> for PacerParams {
    fn from(c: &pacer_config::Config) -> Self {
        Self {
            tuning: Tuning {
                rate: RateCfg::from(&c.rate),
                speed: SpeedRule::from(&c.speed),
            },
            timing: TimingCfg::from(&c.timing),
            detector: DetectorCfg::from(&c.detector),
            antiblock: AntiBlockCfg::from(&c.antiblock),
            injector: InjectorCfg::from(&c.injector),
        }
    }
}

impl From<&pacer_config::TimingCfg> for RunParams {
    fn from(c: &pacer_config::TimingCfg) -> Self {
        Self {
            tick: Duration::from_millis(c.tick_ms),
            max_run: None,
        }
    }
}
