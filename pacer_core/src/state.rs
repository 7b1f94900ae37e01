//! Controller state.
//!
//! One `ControllerState` exists per controller; the control loop owns it and
//! hands it by `&mut` to each component in turn. No component keeps a copy.

use std::fmt;
use std::time::Duration;

use pacer_traits::{Clock, LightPattern};

use crate::bounds::DerivedBounds;
use crate::rate::RateWindows;
use crate::timer::Stopwatch;

/// Actuator condition imposed by the failure injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Normal,
    Jam,
    Starvation,
    Burst,
}

impl Mode {
    pub const ALL: [Self; 4] = [Self::Normal, Self::Jam, Self::Starvation, Self::Burst];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Normal => 0,
            Self::Jam => 1,
            Self::Starvation => 2,
            Self::Burst => 3,
        }
    }

    #[inline]
    pub const fn is_failure(self) -> bool {
        !matches!(self, Self::Normal)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Jam => "JAM",
            Self::Starvation => "STARVATION",
            Self::Burst => "BURST",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModeStat {
    /// Completed periods spent in this mode.
    pub entries: u32,
    pub cumulative: Duration,
}

/// Per-mode statistics, one slot per `Mode`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModeStats([ModeStat; 4]);

impl ModeStats {
    #[inline]
    pub fn get(&self, mode: Mode) -> ModeStat {
        self.0[mode.index()]
    }

    pub fn record(&mut self, mode: Mode, spent: Duration) {
        let slot = &mut self.0[mode.index()];
        slot.entries = slot.entries.saturating_add(1);
        slot.cumulative = slot.cumulative.saturating_add(spent);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Mode, ModeStat)> + '_ {
        Mode::ALL.iter().map(|m| (*m, self.get(*m)))
    }
}

/// Stopwatches owned by the control loop.
#[derive(Debug, Clone, Copy)]
pub struct Timers {
    pub check: Stopwatch,
    pub cooldown: Stopwatch,
    pub block: Stopwatch,
    pub mode: Stopwatch,
}

impl Timers {
    pub fn start(clock: &dyn Clock) -> Self {
        let sw = Stopwatch::start(clock);
        Self {
            check: sw,
            cooldown: sw,
            block: sw,
            mode: sw,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerState {
    /// Speed currently owed to the actuator (0 during JAM).
    pub commanded_speed: f64,
    /// Last speed chosen in NORMAL; restored when a failure period ends.
    pub last_normal_speed: f64,
    pub paused: bool,
    pub windows: RateWindows,
    pub last_actuator_position: i64,
    pub mode: Mode,
    pub next_mode_duration: Duration,
    pub mode_stats: ModeStats,
    pub failure_time: Duration,
    pub normal_time: Duration,
    pub timers: Timers,
    pub unblocks: u64,
    /// Last pattern sent to the indicator; repeats are suppressed.
    pub last_light: Option<LightPattern>,
}

impl ControllerState {
    pub fn new(bounds: &DerivedBounds, next_mode_duration: Duration, clock: &dyn Clock) -> Self {
        Self {
            commanded_speed: bounds.initial_speed,
            last_normal_speed: bounds.initial_speed,
            paused: false,
            windows: RateWindows::default(),
            last_actuator_position: 0,
            mode: Mode::Normal,
            next_mode_duration,
            mode_stats: ModeStats::default(),
            failure_time: Duration::ZERO,
            normal_time: Duration::ZERO,
            timers: Timers::start(clock),
            unblocks: 0,
            last_light: None,
        }
    }

    /// Share of completed mode time spent in failure modes; 0 before any completes.
    pub fn failure_ratio(&self) -> f64 {
        let failure = self.failure_time.as_secs_f64();
        let total = failure + self.normal_time.as_secs_f64();
        if total > 0.0 { failure / total } else { 0.0 }
    }

    #[inline]
    pub fn mode_elapsed(&self, clock: &dyn Clock) -> Duration {
        self.timers.mode.elapsed(clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_accumulate_per_mode() {
        let mut stats = ModeStats::default();
        stats.record(Mode::Jam, Duration::from_secs(3));
        stats.record(Mode::Jam, Duration::from_secs(4));
        stats.record(Mode::Normal, Duration::from_secs(15));
        assert_eq!(stats.get(Mode::Jam).entries, 2);
        assert_eq!(stats.get(Mode::Jam).cumulative, Duration::from_secs(7));
        assert_eq!(stats.get(Mode::Burst), ModeStat::default());
        assert_eq!(stats.iter().count(), 4);
    }

    #[test]
    fn ratio_is_zero_without_history() {
        let clock = pacer_traits::ManualClock::new();
        let bounds = crate::bounds::recompute_derived(&crate::config::Tuning::default());
        let mut st = ControllerState::new(&bounds, Duration::from_secs(15), &clock);
        assert_eq!(st.failure_ratio(), 0.0);
        st.failure_time = Duration::from_secs(1);
        st.normal_time = Duration::from_secs(3);
        assert!((st.failure_ratio() - 0.25).abs() < 1e-12);
    }
}
