//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "pacer", version, about = "Ball feed rate controller")]
pub struct Cli {
    /// Path to config TOML; bundled profile defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bundled machine variant used when no config file is given
    #[arg(long, value_enum, default_value_t = ProfileArg::Prime)]
    pub profile: ProfileArg,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProfileArg {
    Prime,
    Essential,
    Classic,
}

impl From<ProfileArg> for pacer_config::Profile {
    fn from(p: ProfileArg) -> Self {
        match p {
            ProfileArg::Prime => Self::Prime,
            ProfileArg::Essential => Self::Essential,
            ProfileArg::Classic => Self::Classic,
        }
    }
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        if cfg!(target_os = "linux") {
            Self::Current
        } else {
            Self::None
        }
    }
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Target rate in balls per second (overrides config)
    #[arg(long, value_name = "BPS")]
    pub target_rate: Option<f64>,
    /// Fraction of time to spend in injected failure modes, 0 disables
    #[arg(long, value_name = "P")]
    pub failure_probability: Option<f64>,
    /// Seed for the failure injector and the simulated rig
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,
    /// Stop after this many milliseconds; runs until ctrl-c otherwise
    #[arg(long, value_name = "MS")]
    pub duration_ms: Option<u64>,
    /// Write one CSV row per cycle window to FILE
    #[arg(long, value_name = "FILE")]
    pub telemetry_csv: Option<PathBuf>,
    /// Read operator keys from stdin: '+' raises the target, '-' lowers it, 'p' pauses
    #[arg(long, action = ArgAction::SetTrue)]
    pub stdin_panel: bool,
    /// Print per-mode statistics when the run ends
    #[arg(long, action = ArgAction::SetTrue)]
    pub stats: bool,
    /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
    #[arg(
        long,
        action = ArgAction::SetTrue,
        long_help = "Enable real-time mode on supported OSes.\n\nLinux: attempts SCHED_FIFO priority, pins to one CPU and locks memory according to --rt-lock. Needs CAP_SYS_NICE / CAP_IPC_LOCK or root; failures are logged and the run continues.\n\nOther OSes: only memory locking is attempted."
    )]
    pub rt: bool,
    /// Real-time priority for SCHED_FIFO on Linux (1..=max)
    #[arg(long, value_name = "PRIO")]
    pub rt_prio: Option<i32>,
    /// Memory locking mode for --rt: none, current, or all
    #[arg(long, value_enum, value_name = "MODE")]
    pub rt_lock: Option<RtLock>,
    /// CPU index to pin the process to with --rt (Linux only, default 0)
    #[arg(long, value_name = "CPU")]
    pub rt_cpu: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the rate control loop
    Run(RunArgs),
    /// Quick health check (rig, controller and peripherals come up)
    SelfCheck,
    /// Print the failure-mode presets resolved for the configured target
    Presets {
        /// Target rate to resolve against (overrides config)
        #[arg(long, value_name = "BPS")]
        target_rate: Option<f64>,
    },
}
