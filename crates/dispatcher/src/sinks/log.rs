//! LogSink - estimate summaries via tracing

use contracts::{ContractError, Estimate};
use tracing::info;

use crate::sinks::EstimateSink;

/// Sink that logs a one-line summary per estimate.
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl EstimateSink for LogSink {
    async fn write(&mut self, estimate: &Estimate) -> Result<(), ContractError> {
        let report = &estimate.report;

        info!(
            sink = %self.name,
            tag = %report.tag_mac,
            cep95_m = report.error_estimate,
            confidence = estimate.meta.confidence,
            selected = report.anchors_selected_for_estimation.len(),
            warning = report.warning_anchors.len(),
            faulty = report.faulty_anchors.len(),
            processing_us = estimate.meta.processing_us,
            "estimate"
        );
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "log sink closed");
        Ok(())
    }
}
