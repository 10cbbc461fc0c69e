//! Estimation engine: per-fix orchestration.
//!
//! Order per fix: anchor discovery, evaluation (CEP95 on pre-update state),
//! Kalman parameter updates for the significant set, then gated health
//! updates. Parameter updates strictly precede health updates.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use contracts::{
    AnchorDiagnostic, AnchorId, CoordinateDirectory, Estimate, EstimateMeta, ErrorReport,
    EstimatorConfig, HealthZSource, TagFix,
};
use tracing::{debug, info, instrument, warn};

use crate::anchor::Anchor;
use crate::evaluator::FixEvaluator;
use crate::pathloss::PathLossModel;
use crate::registry::AnchorRegistry;
use crate::stats::Cep95Table;

/// Per-fix estimation and state-update orchestrator.
///
/// Owns the anchor registry; the caller must drive it from a single task so
/// each fix is processed atomically end-to-end (see the pipeline).
pub struct EstimationEngine<D> {
    config: EstimatorConfig,
    model: PathLossModel,
    cep_table: Cep95Table,
    registry: AnchorRegistry,
    directory: D,
    fixes_processed: u64,
}

impl<D: CoordinateDirectory> EstimationEngine<D> {
    pub fn new(config: EstimatorConfig, directory: D) -> Self {
        let model = PathLossModel::new(&config.path_loss);
        let cep_table = Cep95Table::new(config.scoring.cep95_table.clone());

        Self {
            config,
            model,
            cep_table,
            registry: AnchorRegistry::new(),
            directory,
            fixes_processed: 0,
        }
    }

    /// Number of fixes that produced an estimate.
    pub fn fixes_processed(&self) -> u64 {
        self.fixes_processed
    }

    /// Number of registered anchors.
    pub fn anchor_count(&self) -> usize {
        self.registry.len()
    }

    /// Read-only view of the registry (diagnostics and tests).
    pub fn registry(&self) -> &AnchorRegistry {
        &self.registry
    }

    /// Process one fix end-to-end.
    ///
    /// Returns `None` when the fix carries no usable RSSI readings; nothing
    /// is published in that case.
    #[instrument(
        level = "debug",
        name = "engine_process",
        skip(self, fix),
        fields(tag = %fix.tag_id, readings = fix.rssi.len())
    )]
    pub async fn process(&mut self, fix: &TagFix) -> Option<Estimate> {
        let started = Instant::now();

        self.discover_anchors(fix).await;

        if fix.rssi.is_empty() {
            debug!(tag = %fix.tag_id, "fix without RSSI readings, skipping");
            return None;
        }

        let candidate_count = fix
            .rssi
            .keys()
            .filter(|id| self.registry.contains(id.as_str()))
            .count();
        if candidate_count == 0 {
            warn!(tag = %fix.tag_id, "no registered anchors for fix, skipping");
            return None;
        }

        let evaluator = FixEvaluator::new(fix, &self.config, &self.model, &self.cep_table);

        // Evaluate on pre-update state
        let pre_update_z = evaluator.z_scores(&self.registry);
        let confidence = evaluator.confidence(&self.registry);
        let error_radius = self.cep_table.radius(confidence);

        // The same selection policy drives both scoring and updates
        let significant = evaluator.significant_anchors(&self.registry);
        let distances = evaluator.distances(&self.registry);

        // Kalman parameter updates for the significant set
        for id in &significant {
            let (Some(&rssi), Some(&distance)) = (fix.rssi.get(id), distances.get(id)) else {
                continue;
            };
            if let Some(anchor) = self.registry.get_mut(id.as_str()) {
                anchor.update_parameters(rssi, distance);
            }
        }

        // Health is charged against the z-scores the fix was evaluated
        // under by default, so a wild reading is penalized before the
        // Kalman step absorbs it; post-update recomputation is available
        // via config
        let health_z = match self.config.health.z_source {
            HealthZSource::PreUpdate => pre_update_z,
            HealthZSource::PostUpdate => evaluator.z_scores(&self.registry),
        };
        let admitted = self.apply_health_updates(fix, &health_z);

        let report = self.build_report(fix, &significant, error_radius);

        let elapsed = started.elapsed();
        self.check_processing_budget(fix, elapsed);

        self.fixes_processed += 1;

        let meta = EstimateMeta {
            timestamp_ms: fix.timestamp_ms,
            candidate_count,
            selected: significant,
            confidence,
            error_radius_m: error_radius,
            z_scores: health_z,
            admitted,
            processing_us: elapsed.as_micros() as u64,
        };

        Some(Estimate { report, meta })
    }

    /// Register every anchor id this fix mentions that the registry does
    /// not know yet. On the very first fix that is every id in the message,
    /// used and unused alike.
    async fn discover_anchors(&mut self, fix: &TagFix) {
        let unknown = self.registry.unknown_ids(&fix.discovered);
        if unknown.is_empty() {
            return;
        }

        if self.registry.is_empty() {
            info!(count = unknown.len(), "first fix, discovering anchors");
        }

        for id in unknown {
            match self.directory.resolve(id.as_str()).await {
                Ok(coord) => {
                    info!(
                        anchor = %id,
                        x = coord.x,
                        y = coord.y,
                        z = coord.z,
                        "anchor registered"
                    );
                    self.registry.insert(Anchor::new(
                        id,
                        coord,
                        &self.config.path_loss,
                        &self.config.kalman,
                    ));
                }
                Err(e) => {
                    // Retried on the next fix that mentions this id
                    warn!(anchor = %id, error = %e, "anchor resolution failed, skipping");
                    metrics::counter!("rtls_cep_anchor_resolution_failures_total").increment(1);
                }
            }
        }
    }

    /// Apply the admission gates and fold admitted residuals into anchor
    /// health. Returns the admitted ids.
    fn apply_health_updates(
        &mut self,
        fix: &TagFix,
        z_scores: &HashMap<AnchorId, f64>,
    ) -> Vec<AnchorId> {
        let Some(max_rssi) = fix.strongest_rssi() else {
            return Vec::new();
        };
        let now = fix.timestamp_ms;
        let gates = self.config.gates.clone();
        let lambda = self.config.health.lambda;

        let mut admitted = Vec::new();
        for (id, &z) in z_scores {
            let Some(&rssi) = fix.rssi.get(id) else {
                continue;
            };
            let Some(anchor) = self.registry.get_mut(id.as_str()) else {
                continue;
            };

            // Δ against the strongest reading in the whole fix, not just
            // the significant set
            let rssi_delta = max_rssi - rssi;
            let since_seen = if anchor.last_seen() == 0 {
                0
            } else {
                now.saturating_sub(anchor.last_seen())
            };

            if since_seen > gates.visibility_timeout_ms || rssi_delta > gates.max_rssi_delta_db {
                debug!(
                    anchor = %id,
                    rssi_delta,
                    since_seen,
                    "health update not admitted"
                );
                continue;
            }

            anchor.update_health(z, now, lambda);
            admitted.push(id.clone());
        }
        admitted
    }

    /// Assemble the wire report from post-update state.
    fn build_report(
        &self,
        fix: &TagFix,
        significant: &[AnchorId],
        error_radius: f64,
    ) -> ErrorReport {
        let mut selected = Vec::with_capacity(significant.len());
        for id in significant {
            if let Some(anchor) = self.registry.get(id.as_str()) {
                selected.push(AnchorDiagnostic {
                    mac: id.to_string(),
                    n_var: anchor.n(),
                    ewma: anchor.ewma(),
                });
            }
        }

        // Classification covers every candidate the fix referenced, so a
        // faulty anchor is still reported even though selection skipped it
        let mut warning_anchors = Vec::new();
        let mut faulty_anchors = Vec::new();
        for id in fix.rssi.keys() {
            let Some(anchor) = self.registry.get(id.as_str()) else {
                continue;
            };
            if anchor.is_warning(&self.config.health) {
                warning_anchors.push(id.to_string());
            }
            if anchor.is_faulty(&self.config.health) {
                faulty_anchors.push(id.to_string());
            }
        }
        warning_anchors.sort();
        faulty_anchors.sort();

        ErrorReport {
            tag_mac: fix.tag_id.clone(),
            error_estimate: error_radius,
            anchors_selected_for_estimation: selected,
            warning_anchors,
            faulty_anchors,
        }
    }

    fn check_processing_budget(&self, fix: &TagFix, elapsed: Duration) {
        metrics::histogram!("rtls_cep_processing_us").record(elapsed.as_micros() as f64);

        let budget = Duration::from_millis(self.config.scoring.max_processing_ms);
        if elapsed > budget {
            warn!(
                tag = %fix.tag_id,
                elapsed_us = elapsed.as_micros() as u64,
                budget_ms = self.config.scoring.max_processing_ms,
                "fix processing exceeded budget"
            );
            metrics::counter!("rtls_cep_processing_budget_exceeded_total").increment(1);
        }
    }
}
