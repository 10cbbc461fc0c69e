//! ErrorReport - estimation pipeline output
//!
//! The wire message published per processed fix, plus the internal
//! diagnostics that travel with it but stay off the wire.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::AnchorId;

/// Per-anchor diagnostic entry in the output message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorDiagnostic {
    /// Anchor MAC
    pub mac: String,

    /// Current path-loss exponent estimate
    pub n_var: f64,

    /// Current EWMA health score (higher = worse)
    pub ewma: f64,
}

/// Outgoing error-estimate message, one per successfully processed fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Tag MAC
    pub tag_mac: String,

    /// CEP95 error radius, metres
    pub error_estimate: f64,

    /// The anchors that survived selection and fed the estimate
    pub anchors_selected_for_estimation: Vec<AnchorDiagnostic>,

    /// Anchors currently classified as warning (4 <= ewma < 8)
    pub warning_anchors: Vec<String>,

    /// Anchors currently classified as faulty (ewma >= 8)
    pub faulty_anchors: Vec<String>,
}

/// Estimation diagnostics alongside a report (not published).
#[derive(Debug, Clone, Default)]
pub struct EstimateMeta {
    /// Fix timestamp, ms since epoch
    pub timestamp_ms: u64,

    /// Candidate anchors (registry entries referenced by the fix)
    pub candidate_count: usize,

    /// Significant anchors, strongest first
    pub selected: Vec<AnchorId>,

    /// Confidence score fed into the CEP95 lookup
    pub confidence: f64,

    /// Resulting CEP95 radius, metres
    pub error_radius_m: f64,

    /// Standardized residual per anchor used for health updates
    pub z_scores: HashMap<AnchorId, f64>,

    /// Anchors whose health update passed the admission gates
    pub admitted: Vec<AnchorId>,

    /// End-to-end processing time for this fix, microseconds
    pub processing_us: u64,
}

/// A processed fix: wire report plus internal diagnostics.
#[derive(Debug, Clone)]
pub struct Estimate {
    pub report: ErrorReport,
    pub meta: EstimateMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_round_trip() {
        let report = ErrorReport {
            tag_mac: "tag-07".into(),
            error_estimate: 4.3,
            anchors_selected_for_estimation: vec![AnchorDiagnostic {
                mac: "a1".into(),
                n_var: 2.0,
                ewma: 1.0,
            }],
            warning_anchors: vec!["a9".into()],
            faulty_anchors: vec![],
        };

        let json = serde_json::to_string(&report).unwrap();
        let back: ErrorReport = serde_json::from_str(&json).unwrap();
        assert_eq!(serde_json::to_string(&back).unwrap(), json);
        assert_eq!(back.tag_mac, "tag-07");
        assert_eq!(back.anchors_selected_for_estimation.len(), 1);
    }
}
