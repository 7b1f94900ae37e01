//! CSV writer thread fed by the controller's telemetry channel.

use std::path::Path;

use crossbeam_channel as xch;
use eyre::WrapErr;
use pacer_core::{CycleRecord, TelemetryEvent};

pub const HEADER: [&str; 14] = [
    "uptime_ms",
    "cycle_rate",
    "window60_rate",
    "total_rate",
    "target",
    "lower",
    "upper",
    "commanded_speed",
    "average_speed",
    "total_elapsed_ms",
    "total_events",
    "mode",
    "paused",
    "decision",
];

fn row(r: &CycleRecord) -> [String; 14] {
    [
        r.uptime.as_millis().to_string(),
        format!("{:.4}", r.cycle_rate),
        r.window60_rate.map(|v| format!("{v:.4}")).unwrap_or_default(),
        format!("{:.4}", r.total_rate),
        format!("{:.4}", r.target),
        format!("{:.4}", r.lower),
        format!("{:.4}", r.upper),
        format!("{:.2}", r.commanded_speed),
        format!("{:.2}", r.average_speed),
        r.total_elapsed.as_millis().to_string(),
        r.total_events.to_string(),
        r.mode.as_str().to_string(),
        r.paused.to_string(),
        r.decision.as_str().to_string(),
    ]
}

/// Write every cycle record until the sending side is dropped.
///
/// Returns the number of rows written.
pub fn write_all<W: std::io::Write>(
    out: W,
    rx: &xch::Receiver<TelemetryEvent>,
) -> eyre::Result<u64> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(HEADER).wrap_err("write csv header")?;
    let mut rows = 0u64;
    for event in rx {
        match event {
            TelemetryEvent::Cycle(rec) => {
                wtr.write_record(row(&rec)).wrap_err("write csv row")?;
                wtr.flush().wrap_err("flush csv")?;
                rows += 1;
            }
            TelemetryEvent::Mode(t) => tracing::debug!(%t, "mode transition (not written)"),
        }
    }
    wtr.flush().wrap_err("flush csv")?;
    Ok(rows)
}

/// Open `path` and run `write_all` on a dedicated thread.
pub fn spawn(
    path: &Path,
    rx: xch::Receiver<TelemetryEvent>,
) -> eyre::Result<std::thread::JoinHandle<eyre::Result<u64>>> {
    let file = std::fs::File::create(path)
        .wrap_err_with(|| format!("create telemetry csv {}", path.display()))?;
    std::thread::Builder::new()
        .name("telemetry-csv".into())
        .spawn(move || write_all(std::io::BufWriter::new(file), &rx))
        .wrap_err("spawn telemetry writer")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_core::{Mode, SpeedDecision};
    use std::time::Duration;

    fn record(events: u64) -> CycleRecord {
        CycleRecord {
            uptime: Duration::from_millis(5100),
            cycle_rate: 0.8,
            window60_rate: None,
            total_rate: 0.8,
            target: 0.95,
            lower: 0.9025,
            upper: 0.9975,
            commanded_speed: 118.75,
            average_speed: 118.0,
            total_elapsed: Duration::from_millis(4900),
            total_events: events,
            mode: Mode::Normal,
            paused: false,
            decision: SpeedDecision::Increase,
        }
    }

    #[test]
    fn writes_header_and_one_row_per_cycle() {
        let (tx, rx) = xch::unbounded();
        tx.send(TelemetryEvent::Cycle(record(4))).unwrap();
        tx.send(TelemetryEvent::Cycle(record(9))).unwrap();
        drop(tx);
        let mut buf = Vec::new();
        let rows = write_all(&mut buf, &rx).unwrap();
        assert_eq!(rows, 2);
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("uptime_ms,cycle_rate,window60_rate"));
        assert!(lines[0].contains(",average_speed,total_elapsed_ms,total_events,"));
        assert_eq!(
            lines[1],
            "5100,0.8000,,0.8000,0.9500,0.9025,0.9975,118.75,118.00,4900,4,NORMAL,false,increase"
        );
    }
}
