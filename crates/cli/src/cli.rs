//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// RTLS CEP - real-time CEP95 error estimation for BLE tag fixes
#[derive(Parser, Debug)]
#[command(
    name = "rtls-cep",
    version,
    about = "BLE CEP95 error-estimation service",
    long_about = "Estimates a 95%-confidence error radius for each BLE tag position fix.\n\n\
                  Subscribes to the position stream, recalibrates per-anchor path-loss\n\
                  parameters online, scores each fix against anchor health, and publishes\n\
                  error estimates with per-anchor diagnostics to configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RTLS_CEP_VERBOSE")]
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
        env = "RTLS_CEP_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the estimation pipeline
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
    #[arg(short, long, default_value = "config.toml", env = "RTLS_CEP_CONFIG")]
    pub config: PathBuf,

    /// Override ingress bind host from configuration
    #[arg(long, env = "RTLS_CEP_BIND_HOST")]
    pub bind_host: Option<String>,

    /// Override ingress bind port from configuration
    #[arg(long, env = "RTLS_CEP_BIND_PORT")]
    pub bind_port: Option<u16>,

    /// Stop after this many estimates
    #[arg(long, env = "RTLS_CEP_MAX_FIXES")]
    pub max_fixes: Option<u64>,

    /// Stop after this many seconds
    #[arg(long, env = "RTLS_CEP_TIMEOUT")]
    pub timeout_secs: Option<u64>,

    /// Validate configuration and exit without running the pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size for internal queues
    #[arg(long, default_value = "100", env = "RTLS_CEP_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Serve Prometheus metrics on this port (omit to disable)
    #[arg(long, env = "RTLS_CEP_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Run with a synthetic fix source and mock anchor directory
    /// (no broker or configuration service required)
    #[arg(long)]
    pub mock: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show estimator tuning parameters
    #[arg(long)]
    pub estimator: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
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
