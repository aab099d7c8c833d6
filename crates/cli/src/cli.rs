//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CARLA Bridge - vehicle info sensor-fusion republisher
#[derive(Parser, Debug)]
#[command(
    name = "carla-bridge",
    author,
    version,
    about = "CARLA vehicle info republishing bridge",
    long_about = "Republishes CARLA LiDAR, GNSS and IMU streams together with polled vehicle \n\
                  kinematics as six fused output topics at a fixed rate.\n\n\
                  Without a simulator the bridge runs against mock sensors and a \n\
                  simulated ego vehicle."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        global = true,
        env = "CARLA_BRIDGE_VERBOSE"
    )]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CARLA_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level derived from `-v` / `-q`
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge against mock sensors and a simulated vehicle
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "configs/bridge.toml",
        env = "CARLA_BRIDGE_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the publish period in seconds
    #[arg(long, env = "CARLA_BRIDGE_LOOP_RATE")]
    pub loop_rate: Option<f64>,

    /// Stop after this many seconds (0 = run until Ctrl+C)
    #[arg(long, default_value = "0", env = "CARLA_BRIDGE_DURATION")]
    pub duration: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Drive the simulated vehicle from stdin (w/a/s/d, space, q, r, x)
    #[arg(long)]
    pub manual: bool,

    /// Seconds between HUD status lines (0 = disabled)
    #[arg(long, default_value = "1.0", env = "CARLA_BRIDGE_HUD_INTERVAL")]
    pub hud_interval: f64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CARLA_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "configs/bridge.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/bridge.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show mock-mode simulation settings
    #[arg(long)]
    pub simulation: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
