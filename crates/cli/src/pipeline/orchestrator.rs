//! Pipeline orchestrator - coordinates all components.
//!
//! Wires directory -> ingestion -> estimation engine -> publisher. The
//! consume loop is the single owner of the engine (and thus the anchor
//! registry), so every fix is processed atomically end-to-end in delivery
//! order. Shutdown signals and the optional run deadline break the loop;
//! sinks are drained before the stats are returned.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{CoordinateDirectory, ServiceBlueprint};
use directory::{HttpDirectory, MockDirectory};
use dispatcher::ReportPublisher;
use estimator::EstimationEngine;
use ingestion::{FixPipeline, MockFixConfig, MockFixSource, UdpFixSource};
use observability::{record_estimate_metrics, record_fix_received};
use tracing::{debug, info, warn};

use crate::error::CliError;

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The service blueprint
    pub blueprint: ServiceBlueprint,

    /// Stop after this many estimates (None = unlimited)
    pub max_fixes: Option<u64>,

    /// Stop after this long (None = run until signalled)
    pub run_for: Option<Duration>,

    /// Channel buffer size
    pub buffer_size: usize,

    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Run against the synthetic fix source and mock directory
    pub mock: bool,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until max-fixes, deadline, or shutdown signal.
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::serve_metrics(port)?;
        }

        if self.config.mock {
            self.run_mock(start_time).await
        } else {
            self.run_live(start_time).await
        }
    }

    /// Run with the synthetic fix source and mock directory
    async fn run_mock(self, start_time: Instant) -> Result<PipelineStats> {
        info!("running in MOCK mode (no broker or configuration service required)");

        let source = MockFixSource::new(MockFixConfig::default());

        // The mock directory serves exactly the geometry the generated
        // messages reference
        let layout = source.anchor_layout();
        let entries: Vec<(&str, contracts::Point3)> = layout
            .iter()
            .map(|(mac, coord)| (mac.as_str(), *coord))
            .collect();
        let mock_directory = MockDirectory::with_coords(&entries);

        let mut ingestion = FixPipeline::new(self.config.buffer_size);
        ingestion.register_source(Box::new(source));

        let engine =
            EstimationEngine::new(self.config.blueprint.estimator.clone(), mock_directory);

        self.drive(engine, ingestion, start_time).await
    }

    /// Run against the live ingress and the HTTP directory
    async fn run_live(self, start_time: Instant) -> Result<PipelineStats> {
        let directory_config = self
            .config
            .blueprint
            .directory
            .clone()
            .ok_or(CliError::DirectoryRequired)?;

        let http_directory = HttpDirectory::new(&directory_config)
            .context("failed to build anchor directory client")?;

        let input = self.config.blueprint.input.clone();
        info!(
            bind = format!("{}:{}", input.bind_host, input.bind_port),
            topic = %input.topic,
            "binding fix ingress"
        );

        let source = UdpFixSource::new("bus", input.bind_host, input.bind_port);

        let mut ingestion = FixPipeline::new(self.config.buffer_size);
        ingestion.register_source(Box::new(source));

        let engine =
            EstimationEngine::new(self.config.blueprint.estimator.clone(), http_directory);

        self.drive(engine, ingestion, start_time).await
    }

    /// The consume loop shared by mock and live modes.
    async fn drive<D: CoordinateDirectory + Send>(
        &self,
        mut engine: EstimationEngine<D>,
        mut ingestion: FixPipeline,
        start_time: Instant,
    ) -> Result<PipelineStats> {
        let sinks = &self.config.blueprint.sinks;
        if sinks.is_empty() {
            warn!("no sinks configured - estimates will be dropped");
        }

        let publisher = ReportPublisher::from_configs(sinks)
            .await
            .context("failed to set up report publisher")?;

        ingestion.start_all();
        let fix_rx = ingestion
            .take_receiver()
            .context("ingestion receiver already taken")?;

        let max_fixes = self.config.max_fixes;
        info!(max_fixes = ?max_fixes, run_for = ?self.config.run_for, "pipeline running");

        let mut stats = PipelineStats {
            active_sinks: publisher.sink_count(),
            ..Default::default()
        };

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);
        let deadline = run_deadline(self.config.run_for);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown signal received");
                    break;
                }
                _ = &mut deadline => {
                    info!("run deadline reached");
                    break;
                }
                maybe_fix = fix_rx.recv() => {
                    let Ok(fix) = maybe_fix else { break };
                    stats.fixes_received += 1;
                    record_fix_received("ingress");

                    let Some(estimate) = engine.process(&fix).await else {
                        stats.fixes_skipped += 1;
                        continue;
                    };

                    stats.estimates_produced += 1;
                    record_estimate_metrics(&estimate);
                    stats.estimation_metrics.update(&estimate);

                    debug!(
                        tag = %estimate.report.tag_mac,
                        cep95_m = estimate.report.error_estimate,
                        selected = estimate.meta.selected.len(),
                        processing_us = estimate.meta.processing_us,
                        "estimate produced"
                    );

                    publisher.publish(&estimate);

                    if max_fixes.is_some_and(|max| stats.estimates_produced >= max) {
                        info!(estimates = stats.estimates_produced, "max fixes reached");
                        break;
                    }
                }
            }
        }

        info!("shutting down pipeline");
        ingestion.stop_all();

        match tokio::time::timeout(Duration::from_secs(5), publisher.shutdown()).await {
            Ok(totals) => {
                for (sink, lane) in totals {
                    info!(
                        sink = %sink,
                        published = lane.published,
                        failed = lane.failed,
                        dropped = lane.dropped,
                        "sink totals"
                    );
                }
            }
            Err(_) => warn!("report publisher did not drain in time"),
        }

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fixes_per_second()),
            "pipeline stopped"
        );

        Ok(stats)
    }
}

/// Resolves when the optional run limit elapses; pends forever otherwise.
async fn run_deadline(limit: Option<Duration>) {
    match limit {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// Resolves when the process is asked to stop.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = ctrl_c.await;
        }
    }
}

/// Resolves when the process is asked to stop.
#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
