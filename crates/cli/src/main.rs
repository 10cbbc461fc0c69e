//! Service entry point: parse the command line, wire up telemetry, run the
//! selected command.

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_tracing(
        cli.log_format.into(),
        observability::verbosity_filter(cli.quiet, cli.verbose),
    )?;

    let result = match &cli.command {
        Commands::Run(args) => commands::run_pipeline(args).await,
        Commands::Validate(args) => commands::run_validate(args),
        Commands::Info(args) => commands::run_info(args),
    };

    if let Err(ref e) = result {
        error!(error = %e, "command failed");
    }

    result
}
