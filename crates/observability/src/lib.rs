//! # Observability
//!
//! Telemetry wiring for the estimation service: tracing setup driven by the
//! CLI flags, an optional Prometheus endpoint, and per-fix metric recording
//! with in-memory aggregation for the shutdown summary.
//!
//! ## Usage
//!
//! ```ignore
//! observability::init_tracing(format, observability::verbosity_filter(quiet, verbose))?;
//! observability::serve_metrics(9000)?;
//!
//! if let Some(estimate) = engine.process(&fix).await {
//!     observability::record_estimate_metrics(&estimate);
//! }
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-exports
pub use crate::metrics::{
    record_estimate_metrics, record_fix_received, EstimationAggregator, MetricsSummary,
    RunningStats, StatsSummary,
};

/// Log output format
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Build the log filter from the CLI verbosity flags.
///
/// `RUST_LOG` wins when set, except in quiet mode, which pins the filter to
/// warnings and errors.
pub fn verbosity_filter(quiet: bool, verbose: u8) -> EnvFilter {
    if quiet {
        return EnvFilter::new("warn");
    }

    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the process-wide tracing subscriber.
///
/// # Errors
/// Fails if a subscriber is already installed.
pub fn init_tracing(format: LogFormat, filter: EnvFilter) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    }
    .context("failed to install tracing subscriber")
}

/// Expose Prometheus metrics on `0.0.0.0:port`.
///
/// All `rtls_cep_*` series recorded by [`metrics`] become scrapeable once
/// this is installed.
pub fn serve_metrics(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("failed to install Prometheus recorder")?;

    tracing::info!(port, "metrics endpoint up");
    Ok(())
}
