//! `info` command implementation.

use anyhow::{Context, Result};

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    if !args.config.exists() {
        return Err(CliError::ConfigNotFound {
            path: args.config.display().to_string(),
        }
        .into());
    }

    let blueprint = config_loader::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    if args.json {
        println!("{}", config_loader::to_json(&blueprint)?);
        return Ok(());
    }

    println!("Service: {}", blueprint.service.name);
    println!(
        "Input: {}:{} (topic {})",
        blueprint.input.bind_host, blueprint.input.bind_port, blueprint.input.topic
    );

    match &blueprint.directory {
        Some(directory) => {
            println!("Directory: {} (timeout {}s)", directory.base_url, directory.timeout_secs);
        }
        None => println!("Directory: none"),
    }

    if args.estimator {
        let estimator = &blueprint.estimator;
        println!("\nEstimator tuning:");
        println!(
            "  selection: max {} anchors, {} dB band",
            estimator.selection.max_significant, estimator.selection.rssi_band_db
        );
        println!(
            "  health: lambda {}, warning >= {}, faulty >= {}, z from {:?}",
            estimator.health.lambda,
            estimator.health.warning_threshold,
            estimator.health.faulty_threshold,
            estimator.health.z_source
        );
        println!(
            "  gates: delta_r {} dB, t_vis {} ms",
            estimator.gates.max_rssi_delta_db, estimator.gates.visibility_timeout_ms
        );
        println!(
            "  scoring: dof {}, scale {}, {} CEP95 knots, budget {} ms",
            estimator.scoring.student_t_dof,
            estimator.scoring.score_scale,
            estimator.scoring.cep95_table.len(),
            estimator.scoring.max_processing_ms
        );
        println!(
            "  kalman: alpha {}, beta {}, min window {}, cap {}, sigma {} dB",
            estimator.kalman.process_alpha,
            estimator.kalman.measurement_beta,
            estimator.kalman.min_window,
            estimator.kalman.window_cap,
            estimator.kalman.initial_sigma_db
        );
        println!(
            "  path loss: d0 {} m, sigma {} dB, defaults rssi0 {} dBm / n {}",
            estimator.path_loss.reference_distance_m,
            estimator.path_loss.sigma_db,
            estimator.path_loss.default_rssi0_dbm,
            estimator.path_loss.default_exponent
        );
    }

    if args.sinks {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!(
                "  - {} ({:?}, queue {})",
                sink.name, sink.sink_type, sink.queue_capacity
            );
            for (key, value) in &sink.params {
                println!("      {key} = {value}");
            }
        }
    }

    Ok(())
}
