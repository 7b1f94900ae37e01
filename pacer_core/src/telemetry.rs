//! Cycle records and mode summaries, plus the sinks that receive them.
//!
//! Publishing never blocks the control loop: `ChannelSink` uses a bounded
//! channel and drops records when the consumer falls behind.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;

use crate::speed::SpeedDecision;
use crate::state::{Mode, ModeStats};

/// Snapshot taken at every cycle-window rollover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleRecord {
    /// Time since the controller started.
    pub uptime: Duration,
    pub cycle_rate: f64,
    pub window60_rate: Option<f64>,
    pub total_rate: f64,
    pub target: f64,
    pub lower: f64,
    pub upper: f64,
    pub commanded_speed: f64,
    /// Shaft angle over total elapsed time, deg/s.
    pub average_speed: f64,
    pub total_elapsed: Duration,
    pub total_events: u64,
    pub mode: Mode,
    pub paused: bool,
    pub decision: SpeedDecision,
}

impl fmt::Display for CycleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CR: {:.3} bps | 60sAR: ", self.cycle_rate)?;
        match self.window60_rate {
            Some(r) => write!(f, "{r:.3} bps")?,
            None => f.write_str("- bps")?,
        }
        write!(
            f,
            " | TAR: {:.3} bps | TR: {:.2}<{:.2}<{:.2} bps | NCS: {:.1} deg/s | AS: {:.0} deg/s | TT: {:.1}s | TB: {}",
            self.total_rate,
            self.lower,
            self.target,
            self.upper,
            self.commanded_speed,
            self.average_speed,
            self.total_elapsed.as_secs_f64(),
            self.total_events,
        )
    }
}

/// Emitted whenever the failure injector switches mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeTransition {
    pub from: Mode,
    pub to: Mode,
    /// Time spent in `from`.
    pub spent: Duration,
    pub next_duration: Duration,
    pub failure_ratio: f64,
    pub stats: ModeStats,
}

impl fmt::Display for ModeTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} after {:.1}s (next {:.1}s, failure ratio {:.3})",
            self.from,
            self.to,
            self.spent.as_secs_f64(),
            self.next_duration.as_secs_f64(),
            self.failure_ratio
        )?;
        for (mode, stat) in self.stats.iter() {
            write!(
                f,
                " | {mode}: {}x {:.1}s",
                stat.entries,
                stat.cumulative.as_secs_f64()
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryEvent {
    Cycle(CycleRecord),
    Mode(ModeTransition),
}

/// Write-only destination for telemetry. Implementations must not block.
pub trait TelemetrySink {
    fn publish(&mut self, event: TelemetryEvent);
}

/// Discards everything; the default when nothing is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    #[inline]
    fn publish(&mut self, _event: TelemetryEvent) {}
}

/// Bounded, lossy hand-off to another thread.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: xch::Sender<TelemetryEvent>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSink {
    /// Records dropped so far because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shared drop counter, readable after the sink has moved into the controller.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }
}

impl TelemetrySink for ChannelSink {
    fn publish(&mut self, event: TelemetryEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(xch::TrySendError::Full(_)) => {
                let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(dropped = n, "telemetry channel full; record dropped");
            }
            Err(xch::TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Create a lossy sink and the receiving end for a consumer thread.
pub fn channel(capacity: usize) -> (ChannelSink, xch::Receiver<TelemetryEvent>) {
    let (tx, rx) = xch::bounded(capacity.max(1));
    (
        ChannelSink {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CycleRecord {
        CycleRecord {
            uptime: Duration::from_secs(10),
            cycle_rate: 0.8,
            window60_rate: None,
            total_rate: 0.9,
            target: 1.0,
            lower: 0.9,
            upper: 1.1,
            commanded_speed: 125.0,
            average_speed: 119.6,
            total_elapsed: Duration::from_secs(10),
            total_events: 9,
            mode: Mode::Normal,
            paused: false,
            decision: SpeedDecision::Increase,
        }
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (mut sink, rx) = channel(2);
        for _ in 0..5 {
            sink.publish(TelemetryEvent::Cycle(record()));
        }
        assert_eq!(rx.len(), 2);
        assert_eq!(sink.dropped(), 3);
    }

    #[test]
    fn log_line_layout() {
        let line = record().to_string();
        assert!(line.starts_with("CR: 0.800 bps | 60sAR: - bps | TAR: 0.900 bps"));
        assert!(line.contains("TR: 0.90<1.00<1.10 bps"));
        assert!(line.ends_with("TT: 10.0s | TB: 9"));
    }
}
