//! Windowed rate estimation.
//!
//! Four accumulators share one fold step: `pending` (events since the last
//! check tick), the cycle window, the 60 s window and the never-reset total.
//! Elapsed time is kept as `Duration` so window rollovers land on exact
//! millisecond boundaries.

use std::time::Duration;

use pacer_traits::Clock;

use crate::config::TimingCfg;
use crate::timer::Stopwatch;

/// One event/elapsed accumulator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub events: u64,
    pub elapsed: Duration,
}

impl Window {
    #[inline]
    fn add(&mut self, events: u64, elapsed: Duration) {
        self.events = self.events.saturating_add(events);
        self.elapsed = self.elapsed.saturating_add(elapsed);
    }

    /// Events per second, `None` while no time has accumulated.
    #[inline]
    pub fn rate(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0).then(|| self.events as f64 / secs)
    }

    #[inline]
    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RateWindows {
    pub pending: u64,
    pub cycle: Window,
    pub window60: Window,
    pub total: Window,
    /// Rate of the most recently completed 60 s window.
    pub last_window60_rate: Option<f64>,
}

impl RateWindows {
    #[inline]
    pub fn record_event(&mut self) {
        self.pending = self.pending.saturating_add(1);
    }
}

/// Result of one fold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fold {
    pub elapsed: Duration,
    /// Set when the cycle window completed on this fold.
    pub cycle: Option<CycleRollover>,
    /// Set when the 60 s window completed on this fold.
    pub window60_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleRollover {
    pub events: u64,
    pub elapsed: Duration,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RateEstimator {
    check_interval: Duration,
    cycle_window: Duration,
    window60: Duration,
}

impl RateEstimator {
    pub fn new(cfg: &TimingCfg) -> Self {
        Self {
            check_interval: cfg.check_interval,
            cycle_window: cfg.cycle_window,
            window60: cfg.window60,
        }
    }

    /// Fold once the check stopwatch has reached the check interval.
    pub fn poll(
        &self,
        windows: &mut RateWindows,
        check: &mut Stopwatch,
        clock: &dyn Clock,
    ) -> Option<Fold> {
        if check.elapsed(clock) < self.check_interval {
            return None;
        }
        let elapsed = check.lap(clock);
        Some(self.fold(windows, elapsed))
    }

    /// Move pending events into every window and roll over completed ones.
    pub fn fold(&self, windows: &mut RateWindows, elapsed: Duration) -> Fold {
        let events = std::mem::take(&mut windows.pending);
        windows.cycle.add(events, elapsed);
        windows.window60.add(events, elapsed);
        windows.total.add(events, elapsed);

        let mut cycle = None;
        if windows.cycle.elapsed >= self.cycle_window {
            if let Some(rate) = windows.cycle.rate() {
                cycle = Some(CycleRollover {
                    events: windows.cycle.events,
                    elapsed: windows.cycle.elapsed,
                    rate,
                });
            }
            windows.cycle.clear();
        }

        let mut window60_rate = None;
        if windows.window60.elapsed >= self.window60 {
            window60_rate = windows.window60.rate();
            windows.last_window60_rate = window60_rate;
            windows.window60.clear();
        }

        Fold {
            elapsed,
            cycle,
            window60_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECK: Duration = Duration::from_millis(100);

    fn estimator() -> RateEstimator {
        RateEstimator::new(&TimingCfg::default())
    }

    #[test]
    fn cycle_rolls_over_exactly_at_window_length() {
        let est = estimator();
        let mut w = RateWindows::default();
        for i in 0..49 {
            if i % 10 == 0 {
                w.record_event();
            }
            assert!(est.fold(&mut w, CHECK).cycle.is_none());
        }
        let fold = est.fold(&mut w, CHECK);
        let cycle = fold.cycle.expect("rollover at 5 s");
        assert_eq!(cycle.events, 5);
        assert!((cycle.rate - 1.0).abs() < 1e-12);
        assert_eq!(w.cycle, Window::default());
        assert_eq!(w.total.events, 5);
        assert_eq!(w.total.elapsed, Duration::from_secs(5));
    }

    #[test]
    fn pending_is_cleared_by_fold() {
        let est = estimator();
        let mut w = RateWindows::default();
        w.record_event();
        w.record_event();
        est.fold(&mut w, CHECK);
        assert_eq!(w.pending, 0);
        assert_eq!(w.window60.events, 2);
    }

    #[test]
    fn window60_publishes_then_resets() {
        let est = estimator();
        let mut w = RateWindows::default();
        let mut published = None;
        for i in 0..600 {
            if i % 2 == 0 {
                w.record_event();
            }
            if let Some(r) = est.fold(&mut w, CHECK).window60_rate {
                published = Some(r);
            }
        }
        let rate = published.expect("60 s window completed");
        assert!((rate - 5.0).abs() < 1e-12);
        assert_eq!(w.last_window60_rate, Some(rate));
        assert_eq!(w.window60, Window::default());
    }

    #[test]
    fn empty_windows_report_no_rate() {
        assert_eq!(Window::default().rate(), None);
    }
}
