//! Resettable elapsed-time counters driven by an injected `Clock`.
//!
//! A `Stopwatch` only stores its start instant; the clock is passed on every
//! call so controller state stays plain data and tests can drive time with
//! `ManualClock`.

use std::time::{Duration, Instant};

use pacer_traits::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start(clock: &dyn Clock) -> Self {
        Self {
            started: clock.now(),
        }
    }

    #[inline]
    pub fn elapsed(&self, clock: &dyn Clock) -> Duration {
        clock.now().saturating_duration_since(self.started)
    }

    #[inline]
    pub fn reset(&mut self, clock: &dyn Clock) {
        self.started = clock.now();
    }

    /// Elapsed time since the last reset, then reset.
    pub fn lap(&mut self, clock: &dyn Clock) -> Duration {
        let now = clock.now();
        let elapsed = now.saturating_duration_since(self.started);
        self.started = now;
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_traits::ManualClock;

    #[test]
    fn lap_returns_elapsed_and_restarts() {
        let clock = ManualClock::new();
        let mut sw = Stopwatch::start(&clock);
        clock.advance_ms(250);
        assert_eq!(sw.elapsed(&clock), Duration::from_millis(250));
        assert_eq!(sw.lap(&clock), Duration::from_millis(250));
        assert_eq!(sw.elapsed(&clock), Duration::ZERO);
        clock.advance_ms(10);
        sw.reset(&clock);
        assert_eq!(sw.elapsed(&clock), Duration::ZERO);
    }
}
