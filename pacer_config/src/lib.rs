#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the ball pacer.
//!
//! - `Config` and its sections are deserialized from TOML; every section has
//!   defaults so a partial file is enough.
//! - `Config::for_profile` yields the bundled machine variants when no file
//!   is present.
//! - `Config::validate` rejects values that would give a degenerate band or
//!   zero-length intervals.
use serde::Deserialize;

/// Target rate and operator adjustment.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateCfg {
    /// Balls per second.
    pub target: f64,
    /// Dead-band half width as a fraction of the target (0.05 = ±5%).
    pub tolerance: f64,
    /// Change applied by one press of increase/decrease.
    pub step: f64,
    pub min_target: f64,
    pub max_target: f64,
}

impl Default for RateCfg {
    fn default() -> Self {
        Self {
            target: 0.95,
            tolerance: 0.05,
            step: 0.05,
            min_target: 0.05,
            max_target: 10.0,
        }
    }
}

/// Speed limits in deg/s. The `*_per_rate` / `*_factor` forms scale with the
/// target rate; setting the absolute form (`initial`, `step`, `min`, `max`)
/// pins that value instead.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SpeedCfg {
    pub initial: Option<f64>,
    pub initial_per_rate: f64,
    pub step: Option<f64>,
    pub step_per_rate: f64,
    pub min: Option<f64>,
    /// Fraction of the initial speed.
    pub min_factor: f64,
    pub max: Option<f64>,
    /// Multiple of the initial speed.
    pub max_factor: f64,
}

impl Default for SpeedCfg {
    fn default() -> Self {
        Self {
            initial: None,
            initial_per_rate: 125.0,
            step: None,
            step_per_rate: 5.0,
            min: None,
            min_factor: 0.5,
            max: None,
            max_factor: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimingCfg {
    /// Idle sleep between loop ticks.
    pub tick_ms: u64,
    pub check_interval_ms: u64,
    /// Length of the window the speed decision is made on.
    pub cycle_window_s: f64,
    pub window60_s: f64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            tick_ms: 5,
            check_interval_ms: 100,
            cycle_window_s: 5.0,
            window60_s: 60.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DetectorCfg {
    /// Readings strictly above this count as a ball.
    pub threshold: i32,
    pub cooldown_ms: u64,
}

impl Default for DetectorCfg {
    fn default() -> Self {
        Self {
            threshold: 8,
            cooldown_ms: 100,
        }
    }
}

/// Slowest accepted reverse move, deg/s in magnitude.
pub const MIN_UNBLOCK_SPEED: f64 = 1.0;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AntiBlockCfg {
    pub check_interval_ms: u64,
    /// Less movement than this between checks counts as a stall.
    pub threshold_deg: u32,
    pub reverse_deg: u32,
    /// Negative: reverse.
    pub unblock_speed: f64,
}

impl Default for AntiBlockCfg {
    fn default() -> Self {
        Self {
            check_interval_ms: 1000,
            threshold_deg: 5,
            reverse_deg: 20,
            unblock_speed: -200.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InjectorCfg {
    /// Target fraction of time spent in failure modes; 0 disables injection.
    pub failure_probability: f64,
    pub failure_min_ms: u64,
    pub failure_max_ms: u64,
    pub normal_duration_ms: u64,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for InjectorCfg {
    fn default() -> Self {
        Self {
            failure_probability: 0.0,
            failure_min_ms: 3_000,
            failure_max_ms: 10_000,
            normal_duration_ms: 15_000,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryCfg {
    /// Write one CSV row per cycle window to this path.
    pub csv: Option<String>,
    /// Records buffered before new ones are dropped.
    pub channel_capacity: usize,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            csv: None,
            channel_capacity: 64,
        }
    }
}

/// Simulated ball run used when no hardware backend is compiled in.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimCfg {
    /// Wheel rotation that releases one ball.
    pub degrees_per_ball: f64,
    /// How long a released ball stays in front of the sensor.
    pub ball_pass_ms: u64,
    pub reflect_low: i32,
    pub reflect_high: i32,
    /// Chance per second that the wheel jams on its own.
    pub jam_chance_per_s: f64,
    pub seed: Option<u64>,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            degrees_per_ball: 125.0,
            ball_pass_ms: 40,
            reflect_low: 2,
            reflect_high: 40,
            jam_chance_per_s: 0.0,
            seed: None,
        }
    }
}

/// GPIO pins for the operator panel and RGB status LED (hardware builds).
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Pins {
    pub button_increase: Option<u8>,
    pub button_decrease: Option<u8>,
    pub button_pause: Option<u8>,
    pub led_red: Option<u8>,
    pub led_green: Option<u8>,
    pub led_blue: Option<u8>,
    /// Buttons pull the line low when pressed.
    pub active_low: Option<bool>,
}

/// Bundled machine variants.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Operator buttons, speeds scaled from the target, failure injection available.
    #[default]
    Prime,
    /// Fixed adjustment step, 10% tolerance.
    Essential,
    /// Fixed speed range, lower threshold, faster stall checks.
    Classic,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub rate: RateCfg,
    pub speed: SpeedCfg,
    pub timing: TimingCfg,
    pub detector: DetectorCfg,
    pub antiblock: AntiBlockCfg,
    pub injector: InjectorCfg,
    pub logging: Logging,
    pub telemetry: TelemetryCfg,
    pub sim: SimCfg,
    pub pins: Pins,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))
}

impl Config {
    /// Defaults for a bundled variant.
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Prime => Self::default(),
            Profile::Essential => Self {
                rate: RateCfg {
                    target: 1.0,
                    tolerance: 0.10,
                    ..RateCfg::default()
                },
                speed: SpeedCfg {
                    step: Some(10.0),
                    ..SpeedCfg::default()
                },
                ..Self::default()
            },
            Profile::Classic => Self {
                rate: RateCfg {
                    target: 1.0,
                    tolerance: 0.10,
                    ..RateCfg::default()
                },
                speed: SpeedCfg {
                    initial: Some(245.0),
                    step: Some(10.0),
                    min: Some(10.0),
                    max: Some(500.0),
                    ..SpeedCfg::default()
                },
                detector: DetectorCfg {
                    threshold: 5,
                    ..DetectorCfg::default()
                },
                antiblock: AntiBlockCfg {
                    check_interval_ms: 300,
                    ..AntiBlockCfg::default()
                },
                ..Self::default()
            },
        }
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Rate
        if !(self.rate.target.is_finite() && self.rate.target > 0.0) {
            eyre::bail!("rate.target must be > 0");
        }
        if !(0.0..1.0).contains(&self.rate.tolerance) {
            eyre::bail!("rate.tolerance must be in [0.0, 1.0)");
        }
        if !(self.rate.step.is_finite() && self.rate.step > 0.0) {
            eyre::bail!("rate.step must be > 0");
        }
        if self.rate.min_target <= 0.0 || self.rate.min_target > self.rate.max_target {
            eyre::bail!("rate.min_target must be > 0 and <= rate.max_target");
        }
        if self.rate.target < self.rate.min_target || self.rate.target > self.rate.max_target {
            eyre::bail!("rate.target must lie within [rate.min_target, rate.max_target]");
        }

        // Speed
        let positive = |v: Option<f64>, fallback: f64| v.unwrap_or(fallback) > 0.0;
        if !positive(self.speed.initial, self.speed.initial_per_rate) {
            eyre::bail!("speed.initial / speed.initial_per_rate must be > 0");
        }
        if !positive(self.speed.step, self.speed.step_per_rate) {
            eyre::bail!("speed.step / speed.step_per_rate must be > 0");
        }
        if !positive(self.speed.min, self.speed.min_factor) {
            eyre::bail!("speed.min / speed.min_factor must be > 0");
        }
        if let (Some(min), Some(max)) = (self.speed.min, self.speed.max)
            && min > max
        {
            eyre::bail!("speed.min must be <= speed.max");
        }
        if self.speed.min.is_none() && self.speed.max.is_none()
            && self.speed.min_factor > self.speed.max_factor
        {
            eyre::bail!("speed.min_factor must be <= speed.max_factor");
        }

        // Timing
        if self.timing.check_interval_ms == 0 {
            eyre::bail!("timing.check_interval_ms must be >= 1");
        }
        if !(self.timing.cycle_window_s.is_finite() && self.timing.cycle_window_s > 0.0) {
            eyre::bail!("timing.cycle_window_s must be > 0");
        }
        if !(self.timing.window60_s.is_finite() && self.timing.window60_s > 0.0) {
            eyre::bail!("timing.window60_s must be > 0");
        }
        if self.timing.tick_ms > self.timing.check_interval_ms {
            eyre::bail!("timing.tick_ms must be <= timing.check_interval_ms");
        }

        // Anti-blocking
        if self.antiblock.check_interval_ms == 0 {
            eyre::bail!("antiblock.check_interval_ms must be >= 1");
        }
        let unblock = self.antiblock.unblock_speed;
        if !(unblock.is_finite() && unblock.abs() >= MIN_UNBLOCK_SPEED) {
            eyre::bail!("antiblock.unblock_speed magnitude must be >= {MIN_UNBLOCK_SPEED} deg/s");
        }

        // Injector
        let p = self.injector.failure_probability;
        if !(0.0..=1.0).contains(&p) {
            eyre::bail!("injector.failure_probability must be in [0.0, 1.0]");
        }
        if self.injector.failure_min_ms > self.injector.failure_max_ms {
            eyre::bail!("injector.failure_min_ms must be <= injector.failure_max_ms");
        }
        if p > 0.0 && (self.injector.failure_min_ms == 0 || self.injector.normal_duration_ms == 0)
        {
            eyre::bail!("injector durations must be >= 1 ms when injection is enabled");
        }

        // Telemetry
        if self.telemetry.channel_capacity == 0 {
            eyre::bail!("telemetry.channel_capacity must be >= 1");
        }

        // Sim
        if !(self.sim.degrees_per_ball.is_finite() && self.sim.degrees_per_ball > 0.0) {
            eyre::bail!("sim.degrees_per_ball must be > 0");
        }
        if self.sim.ball_pass_ms == 0 {
            eyre::bail!("sim.ball_pass_ms must be >= 1");
        }
        if !(0.0..=1.0).contains(&self.sim.jam_chance_per_s) {
            eyre::bail!("sim.jam_chance_per_s must be in [0.0, 1.0]");
        }

        Ok(())
    }
}
