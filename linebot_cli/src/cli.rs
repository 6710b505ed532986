//! CLI argument definitions.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "linebot", version, about = "Line-following robot controller")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report as JSON instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
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
            RtLock::Current
        } else {
            RtLock::None
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow the line until a bump, Ctrl-C or the run time cap
    Run {
        /// Track script (CSV with headers `cycles,bitmap`) for the simulated sensor
        #[arg(long, value_name = "CSV")]
        track: Option<PathBuf>,
        /// Stop after this many ms (overrides [run].max_run_ms; 0 = no cap)
        #[arg(long, value_name = "MS")]
        max_run_ms: Option<u64>,
        /// Simulate a bump after this many ms
        #[arg(long, value_name = "MS")]
        bump_after_ms: Option<u64>,
        /// Bumper mask for the simulated bump (0x.., 0b.. or decimal)
        #[arg(long, value_name = "MASK", value_parser = parse_mask)]
        bump_mask: Option<u8>,
        /// Enable real-time mode (SCHED_FIFO, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on supported OSes.\n\nLinux: Attempts SCHED_FIFO priority and calls mlockall to keep the process resident. This reduces jitter in the tick threads but may require elevated privileges or ulimits (e.g., memlock).\n\nmacOS: Only mlockall is applied."
        )]
        rt: bool,
        /// SCHED_FIFO priority for --rt on Linux (clamped to the system range)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt: none, current, or all
        #[arg(long, value_enum, value_name = "MODE")]
        rt_lock: Option<RtLock>,
    },
    /// Build the tracker and take one sensor reading
    SelfCheck,
}

fn parse_mask(s: &str) -> Result<u8, String> {
    linebot_config::parse_bitmap(s).map_err(|e| e.to_string())
}
