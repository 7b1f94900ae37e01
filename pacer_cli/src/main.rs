//! `pacer` command line entry point.

mod cli;
mod error_fmt;
mod panel;
mod rt;
mod run;
mod telemetry_csv;

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::run::RunOutcome;

fn load_config(cli: &Cli) -> eyre::Result<pacer_config::Config> {
    let cfg = match &cli.config {
        Some(path) => pacer_config::load_file(path)?,
        None => pacer_config::Config::for_profile(cli.profile.into()),
    };
    pacer_core::conversions::validate_config(&cfg)?;
    Ok(cfg)
}

/// Install the console layer and the optional JSON file layer.
///
/// The returned guard flushes the file writer when dropped.
fn init_tracing(
    cli: &Cli,
    logging: &pacer_config::Logging,
) -> eyre::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let level = cli
        .log_level
        .as_deref()
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.json {
        layers.push(console.json().boxed());
    } else {
        layers.push(console.with_ansi(std::io::stderr().is_terminal()).boxed());
    }

    let mut file_guard = None;
    if let Some(file) = logging.file.as_deref() {
        let path = std::path::Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
        let appender = match logging.rotation.as_deref().unwrap_or("never") {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            "never" => tracing_appender::rolling::never(dir, name),
            other => eyre::bail!("logging.rotation must be never, daily or hourly, got {other:?}"),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
        );
    }

    Registry::default()
        .with(layers)
        .with(filter)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(file_guard)
}

fn print_run(outcome: &RunOutcome, json: bool, stats: bool) {
    let s = &outcome.summary;
    if json {
        let modes: serde_json::Map<String, serde_json::Value> = s
            .mode_stats
            .iter()
            .map(|(mode, stat)| {
                (
                    mode.as_str().to_string(),
                    serde_json::json!({
                        "entries": stat.entries,
                        "seconds": stat.cumulative.as_secs_f64(),
                    }),
                )
            })
            .collect();
        let out = serde_json::json!({
            "total_events": s.total_events,
            "elapsed_s": s.total_elapsed.as_secs_f64(),
            "total_rate": s.total_rate,
            "target": s.target,
            "final_speed": s.final_speed,
            "cycles": s.cycles,
            "unblocks": s.unblocks,
            "transitions": s.transitions,
            "failure_ratio": s.failure_ratio,
            "modes": modes,
            "csv_rows": outcome.csv_rows,
            "telemetry_dropped": outcome.dropped,
        });
        println!("{out}");
        return;
    }

    let rate = s
        .total_rate
        .map_or_else(|| "-".to_string(), |r| format!("{r:.3}"));
    println!(
        "run complete: {} balls in {:.1}s, total rate {rate} bps (target {:.2}), final speed {:.1} deg/s",
        s.total_events,
        s.total_elapsed.as_secs_f64(),
        s.target,
        s.final_speed
    );
    if let Some(rows) = outcome.csv_rows {
        println!("telemetry: {rows} rows written");
    }
    if stats {
        eprintln!("\n--- Pacer Stats ---");
        eprintln!("Ticks: {}", s.ticks);
        eprintln!("Cycles: {}", s.cycles);
        eprintln!("Unblocks: {}", s.unblocks);
        eprintln!("Mode transitions: {}", s.transitions);
        eprintln!("Failure ratio: {:.3}", s.failure_ratio);
        for (mode, stat) in s.mode_stats.iter() {
            eprintln!(
                "{mode}: {} entries, {:.1}s",
                stat.entries,
                stat.cumulative.as_secs_f64()
            );
        }
        eprintln!("Telemetry dropped: {}", outcome.dropped);
        eprintln!("-------------------\n");
    }
}

fn print_presets(cfg: &pacer_config::Config, json: bool) {
    let params = pacer_core::PacerParams::from(cfg);
    let bounds = pacer_core::recompute_derived(&params.tuning);
    let presets = pacer_core::injector::presets(&bounds);
    if json {
        let list: Vec<_> = presets
            .iter()
            .map(|p| serde_json::json!({ "mode": p.mode.as_str(), "speed": p.speed }))
            .collect();
        let out = serde_json::json!({
            "target": bounds.target,
            "min_speed": bounds.min_speed,
            "max_speed": bounds.max_speed,
            "presets": list,
        });
        println!("{out}");
        return;
    }
    println!(
        "target {:.2} bps, speed range {:.1}..{:.1} deg/s",
        bounds.target, bounds.min_speed, bounds.max_speed
    );
    for p in presets {
        println!("{:<10} {:>7.1} deg/s", p.mode.as_str(), p.speed);
    }
}

fn dispatch(cli: Cli, mut cfg: pacer_config::Config) -> eyre::Result<()> {
    match cli.cmd {
        Commands::Run(args) => {
            run::apply_overrides(&mut cfg, &args)?;
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "ctrl-c handler not installed");
            }
            let outcome = run::run_pacer(&cfg, &args, &shutdown)?;
            print_run(&outcome, cli.json, args.stats);
        }
        Commands::SelfCheck => {
            run::self_check(&cfg)?;
            println!("ok");
        }
        Commands::Presets { target_rate } => {
            if let Some(t) = target_rate {
                cfg.rate.target = t;
                pacer_core::conversions::validate_config(&cfg)?;
            }
            print_presets(&cfg, cli.json);
        }
    }
    Ok(())
}

fn report_error(err: &eyre::Report) -> u8 {
    if JSON_MODE.get().copied().unwrap_or(false) {
        eprintln!("{}", error_fmt::format_error_json(err));
    } else {
        tracing::error!(error = %format!("{err:#}"), "command failed");
        eprintln!("{}", error_fmt::humanize(err));
    }
    u8::try_from(error_fmt::exit_code_for_error(err)).unwrap_or(1)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if !cli.json {
        let _ = color_eyre::install();
    }

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => return ExitCode::from(report_error(&e)),
    };
    let guard = match init_tracing(&cli, &cfg.logging) {
        Ok(guard) => guard,
        Err(e) => return ExitCode::from(report_error(&e)),
    };
    let code = match dispatch(cli, cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(report_error(&e)),
    };
    drop(guard);
    code
}
