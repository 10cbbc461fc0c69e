//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "starting estimation service"
    );

    if !args.config.exists() {
        return Err(CliError::ConfigNotFound {
            path: args.config.display().to_string(),
        }
        .into());
    }

    let mut blueprint = config_loader::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    // CLI overrides beat the file
    if let Some(ref host) = args.bind_host {
        info!(host = %host, "overriding ingress bind host");
        blueprint.input.bind_host = host.clone();
    }
    if let Some(port) = args.bind_port {
        info!(port, "overriding ingress bind port");
        blueprint.input.bind_port = port;
    }

    info!(
        service = %blueprint.service.name,
        bind = format!("{}:{}", blueprint.input.bind_host, blueprint.input.bind_port),
        topic = %blueprint.input.topic,
        sinks = blueprint.sinks.len(),
        "configuration loaded"
    );

    if args.dry_run {
        info!("dry run: configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        max_fixes: args.max_fixes,
        run_for: args.timeout_secs.map(Duration::from_secs),
        buffer_size: args.buffer_size,
        metrics_port: args.metrics_port,
        mock: args.mock,
    });

    let stats = pipeline.run().await.context("pipeline execution failed")?;
    stats.print_summary();

    info!("estimation service finished");
    Ok(())
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::ServiceBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Service: {}", blueprint.service.name);
    println!("Input:");
    println!(
        "  Bind: {}:{}",
        blueprint.input.bind_host, blueprint.input.bind_port
    );
    println!("  Topic: {}", blueprint.input.topic);

    match &blueprint.directory {
        Some(directory) => {
            println!("\nAnchor directory:");
            println!("  Endpoint: {}", directory.base_url);
            println!("  Timeout: {}s", directory.timeout_secs);
        }
        None => println!("\nAnchor directory: none (mock runs only)"),
    }

    let estimator = &blueprint.estimator;
    println!("\nEstimator:");
    println!(
        "  Selection: top {} within {} dB",
        estimator.selection.max_significant, estimator.selection.rssi_band_db
    );
    println!(
        "  Gates: delta_r {} dB, t_vis {} ms",
        estimator.gates.max_rssi_delta_db, estimator.gates.visibility_timeout_ms
    );
    println!(
        "  Health: lambda {}, warning {}, faulty {}",
        estimator.health.lambda,
        estimator.health.warning_threshold,
        estimator.health.faulty_threshold
    );

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
