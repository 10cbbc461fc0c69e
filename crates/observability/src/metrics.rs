//! Estimation metric collection
//!
//! Records per-fix metrics from [`contracts::Estimate`] and aggregates them
//! in memory for the end-of-run summary.

use contracts::Estimate;
use metrics::{counter, gauge, histogram};

/// Record metrics for one processed fix.
///
/// Call once per estimate the engine produces.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_estimate_metrics;
///
/// if let Some(estimate) = engine.process(&fix).await {
///     record_estimate_metrics(&estimate);
///     // ...
/// }
/// ```
pub fn record_estimate_metrics(estimate: &Estimate) {
    let report = &estimate.report;
    let meta = &estimate.meta;

    counter!("rtls_cep_fixes_total").increment(1);

    histogram!("rtls_cep_error_radius_m").record(report.error_estimate);
    gauge!("rtls_cep_last_error_radius_m").set(report.error_estimate);

    histogram!("rtls_cep_confidence").record(meta.confidence);

    gauge!("rtls_cep_anchors_selected").set(meta.selected.len() as f64);
    gauge!("rtls_cep_anchors_candidates").set(meta.candidate_count as f64);
    gauge!("rtls_cep_health_updates_admitted").set(meta.admitted.len() as f64);

    if !report.warning_anchors.is_empty() {
        counter!("rtls_cep_fixes_with_warning_anchors_total").increment(1);
        for mac in &report.warning_anchors {
            counter!("rtls_cep_anchor_warning_total", "anchor" => mac.clone()).increment(1);
        }
    }
    if !report.faulty_anchors.is_empty() {
        counter!("rtls_cep_fixes_with_faulty_anchors_total").increment(1);
        for mac in &report.faulty_anchors {
            counter!("rtls_cep_anchor_faulty_total", "anchor" => mac.clone()).increment(1);
        }
    }

    // Per-anchor calibration state of the selected set
    for diagnostic in &report.anchors_selected_for_estimation {
        gauge!(
            "rtls_cep_anchor_path_loss_exponent",
            "anchor" => diagnostic.mac.clone()
        )
        .set(diagnostic.n_var);

        gauge!(
            "rtls_cep_anchor_ewma",
            "anchor" => diagnostic.mac.clone()
        )
        .set(diagnostic.ewma);
    }

    // Residual magnitudes that fed the health updates
    for (anchor, z) in &meta.z_scores {
        histogram!(
            "rtls_cep_z_score_abs",
            "anchor" => anchor.to_string()
        )
        .record(z.abs());
    }
}

/// Record a fix arriving from a source.
pub fn record_fix_received(source_id: &str) {
    counter!(
        "rtls_cep_fixes_received_total",
        "source" => source_id.to_string()
    )
    .increment(1);
}

/// Estimation metric aggregator
///
/// Aggregates in memory for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct EstimationAggregator {
    /// Total estimates observed
    pub total_fixes: u64,

    /// Fixes with at least one warning anchor
    pub fixes_with_warning: u64,

    /// Fixes with at least one faulty anchor
    pub fixes_with_faulty: u64,

    /// Error radius statistics (metres)
    pub radius_stats: RunningStats,

    /// Confidence score statistics
    pub confidence_stats: RunningStats,

    /// Processing time statistics (microseconds)
    pub processing_stats: RunningStats,

    /// Selected-anchor-count statistics
    pub selected_stats: RunningStats,

    /// Per-anchor faulty observations
    pub faulty_counts: std::collections::HashMap<String, u64>,
}

impl EstimationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one estimate into the aggregate.
    pub fn update(&mut self, estimate: &Estimate) {
        self.total_fixes += 1;

        let report = &estimate.report;
        if !report.warning_anchors.is_empty() {
            self.fixes_with_warning += 1;
        }
        if !report.faulty_anchors.is_empty() {
            self.fixes_with_faulty += 1;
            for mac in &report.faulty_anchors {
                *self.faulty_counts.entry(mac.clone()).or_insert(0) += 1;
            }
        }

        self.radius_stats.push(report.error_estimate);
        self.confidence_stats.push(estimate.meta.confidence);
        self.processing_stats.push(estimate.meta.processing_us as f64);
        self.selected_stats.push(estimate.meta.selected.len() as f64);
    }

    /// Produce the summary report.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_fixes: self.total_fixes,
            fixes_with_warning: self.fixes_with_warning,
            fixes_with_faulty: self.fixes_with_faulty,
            warning_rate: rate(self.fixes_with_warning, self.total_fixes),
            faulty_rate: rate(self.fixes_with_faulty, self.total_fixes),
            error_radius_m: StatsSummary::from(&self.radius_stats),
            confidence: StatsSummary::from(&self.confidence_stats),
            processing_us: StatsSummary::from(&self.processing_stats),
            selected_anchors: StatsSummary::from(&self.selected_stats),
            anchor_faulty_counts: self.faulty_counts.clone(),
        }
    }

    /// Reset all aggregates.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn rate(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Aggregated summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_fixes: u64,
    pub fixes_with_warning: u64,
    pub fixes_with_faulty: u64,
    pub warning_rate: f64,
    pub faulty_rate: f64,
    pub error_radius_m: StatsSummary,
    pub confidence: StatsSummary,
    pub processing_us: StatsSummary,
    pub selected_anchors: StatsSummary,
    pub anchor_faulty_counts: std::collections::HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Estimation Metrics Summary ===")?;
        writeln!(f, "Total fixes: {}", self.total_fixes)?;
        writeln!(
            f,
            "Fixes with warning anchors: {} ({:.2}%)",
            self.fixes_with_warning, self.warning_rate
        )?;
        writeln!(
            f,
            "Fixes with faulty anchors: {} ({:.2}%)",
            self.fixes_with_faulty, self.faulty_rate
        )?;
        writeln!(f, "Error radius (m): {}", self.error_radius_m)?;
        writeln!(f, "Confidence: {}", self.confidence)?;
        writeln!(f, "Processing (us): {}", self.processing_us)?;
        writeln!(f, "Selected anchors: {}", self.selected_anchors)?;

        if !self.anchor_faulty_counts.is_empty() {
            writeln!(f, "Faulty anchor observations:")?;
            for (anchor, count) in &self.anchor_faulty_counts {
                writeln!(f, "  {}: {}", anchor, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics accumulator (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Fold in a new value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
