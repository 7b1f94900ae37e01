//! Level-triggered event detector with a cooldown.
//!
//! A reading above the threshold is a candidate; it is counted only when the
//! cooldown stopwatch has run for at least `cooldown`. A ball that lingers
//! in front of the sensor longer than the cooldown is counted again, and two
//! balls closer together than the cooldown are counted once. Both are known
//! limitations of this detector and are kept as is.

use std::time::Duration;

use pacer_traits::Clock;

use crate::config::DetectorCfg;
use crate::timer::Stopwatch;

#[derive(Debug, Clone, Copy)]
pub struct EventDetector {
    threshold: i32,
    cooldown: Duration,
}

impl EventDetector {
    pub fn new(cfg: &DetectorCfg) -> Self {
        Self {
            threshold: cfg.threshold,
            cooldown: cfg.cooldown,
        }
    }

    #[inline]
    pub fn is_candidate(&self, raw: i32) -> bool {
        raw > self.threshold
    }

    /// Whether `raw` is a new event. Resets `cooldown` when it is.
    pub fn observe(&self, raw: i32, cooldown: &mut Stopwatch, clock: &dyn Clock) -> bool {
        if !self.is_candidate(raw) || cooldown.elapsed(clock) < self.cooldown {
            return false;
        }
        cooldown.reset(clock);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_traits::ManualClock;

    #[test]
    fn sustained_high_reading_recounts_after_cooldown() {
        let clock = ManualClock::new();
        let det = EventDetector::new(&DetectorCfg::default());
        let mut cooldown = Stopwatch::start(&clock);
        clock.advance_ms(500);

        let mut counted = 0;
        for _ in 0..30 {
            if det.observe(40, &mut cooldown, &clock) {
                counted += 1;
            }
            clock.advance_ms(10);
        }
        // 300 ms of continuous reflection with a 100 ms cooldown
        assert_eq!(counted, 3);
    }

    #[test]
    fn readings_at_threshold_are_ignored() {
        let clock = ManualClock::new();
        let det = EventDetector::new(&DetectorCfg::default());
        let mut cooldown = Stopwatch::start(&clock);
        clock.advance_ms(1000);
        assert!(!det.observe(8, &mut cooldown, &clock));
        assert!(det.observe(9, &mut cooldown, &clock));
    }
}
