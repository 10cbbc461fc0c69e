//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::EstimationAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total fixes received from ingress
    pub fixes_received: u64,

    /// Total estimates produced and dispatched
    pub estimates_produced: u64,

    /// Fixes skipped (no readings, no registered anchors)
    pub fixes_skipped: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of sinks that received data
    pub active_sinks: usize,

    /// Estimation metrics aggregator
    pub estimation_metrics: EstimationAggregator,
}

impl PipelineStats {
    /// Calculate fixes-per-second throughput
    pub fn fixes_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.estimates_produced as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Fraction of received fixes that produced no estimate, as percentage
    #[allow(dead_code)]
    pub fn skip_rate(&self) -> f64 {
        if self.fixes_received > 0 {
            (self.fixes_skipped as f64 / self.fixes_received as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Fixes received: {}", self.fixes_received);
        println!("  Estimates produced: {}", self.estimates_produced);
        println!("  Fixes skipped: {}", self.fixes_skipped);
        println!("  Throughput: {:.2} fixes/s", self.fixes_per_second());
        println!("  Active sinks: {}", self.active_sinks);

        let summary = self.estimation_metrics.summary();

        println!("\nEstimation");
        println!("  Error radius (m): {}", summary.error_radius_m);
        println!("  Confidence: {}", summary.confidence);
        println!("  Processing (us): {}", summary.processing_us);
        println!("  Selected anchors: {}", summary.selected_anchors);
        println!(
            "  Fixes with warning anchors: {} ({:.2}%)",
            summary.fixes_with_warning, summary.warning_rate
        );
        println!(
            "  Fixes with faulty anchors: {} ({:.2}%)",
            summary.fixes_with_faulty, summary.faulty_rate
        );

        if !summary.anchor_faulty_counts.is_empty() {
            println!("\nFaulty anchor observations");
            for (anchor, count) in &summary.anchor_faulty_counts {
                println!("  {}: {}", anchor, count);
            }
        }

        println!();
    }
}
