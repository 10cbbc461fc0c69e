//! Estimator tuning contracts shared across crates.
//!
//! Every default in the estimation pipeline lives here, so nothing is
//! hard-coded twice (the upstream implementation repeated ΔR / T_vis in two
//! signatures; these structs are the single source of truth).

use serde::{Deserialize, Serialize};

/// Complete estimator tuning. Each section has calibrated defaults; the
/// blueprint may override any subset of fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Significant-anchor selection
    #[serde(default)]
    pub selection: SelectionConfig,

    /// EWMA health tracking
    #[serde(default)]
    pub health: HealthConfig,

    /// Health-update admission gates
    #[serde(default)]
    pub gates: AdmissionConfig,

    /// Confidence scoring and CEP95 lookup
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Adaptive Kalman filter tuning
    #[serde(default)]
    pub kalman: KalmanConfig,

    /// Log-distance path-loss model
    #[serde(default)]
    pub path_loss: PathLossConfig,
}

/// Significant-anchor selection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Maximum anchors kept after selection
    #[serde(default = "default_max_significant")]
    pub max_significant: usize,

    /// Keep anchors within this many dB of the strongest reading
    #[serde(default = "default_rssi_band_db")]
    pub rssi_band_db: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_significant: default_max_significant(),
            rssi_band_db: default_rssi_band_db(),
        }
    }
}

fn default_max_significant() -> usize {
    5
}

fn default_rssi_band_db() -> f64 {
    10.0
}

/// Which z-scores feed the per-fix health updates.
///
/// `PreUpdate` scores each anchor against the parameters the fix was
/// actually evaluated under, so a wild reading is charged to health before
/// the Kalman step absorbs it. `PostUpdate` recomputes after the parameter
/// updates, which lets the filter soak up most of the residual first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthZSource {
    /// Reuse the evaluator's pre-update z-scores
    #[default]
    PreUpdate,
    /// Recompute z-scores after the Kalman parameter updates
    PostUpdate,
}

/// EWMA health tracking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// EWMA decay factor (effective memory ~1/λ samples)
    #[serde(default = "default_lambda")]
    pub lambda: f64,

    /// Warning classification threshold (inclusive)
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,

    /// Faulty classification threshold (inclusive); also the selection gate
    #[serde(default = "default_faulty_threshold")]
    pub faulty_threshold: f64,

    /// z-score source for health updates
    #[serde(default)]
    pub z_source: HealthZSource,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            lambda: default_lambda(),
            warning_threshold: default_warning_threshold(),
            faulty_threshold: default_faulty_threshold(),
            z_source: HealthZSource::default(),
        }
    }
}

fn default_lambda() -> f64 {
    0.05
}

fn default_warning_threshold() -> f64 {
    4.0
}

fn default_faulty_threshold() -> f64 {
    8.0
}

/// Health-update admission gates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Maximum dB below the fix's strongest reading (ΔR)
    #[serde(default = "default_max_rssi_delta_db")]
    pub max_rssi_delta_db: f64,

    /// Maximum time since the anchor's last health update (T_vis, ms)
    #[serde(default = "default_visibility_timeout_ms")]
    pub visibility_timeout_ms: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_rssi_delta_db: default_max_rssi_delta_db(),
            visibility_timeout_ms: default_visibility_timeout_ms(),
        }
    }
}

fn default_max_rssi_delta_db() -> f64 {
    12.0
}

fn default_visibility_timeout_ms() -> u64 {
    6000
}

/// Confidence scoring and CEP95 lookup parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Student-t degrees of freedom
    #[serde(default = "default_student_t_dof")]
    pub student_t_dof: u32,

    /// Divisor applied to the weighted log-likelihood before exp()
    #[serde(default = "default_score_scale")]
    pub score_scale: f64,

    /// Calibrated (confidence, radius_m) knots, confidence ascending
    #[serde(default = "default_cep95_table")]
    pub cep95_table: Vec<(f64, f64)>,

    /// Per-fix processing budget before a warning is logged (ms)
    #[serde(default = "default_max_processing_ms")]
    pub max_processing_ms: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            student_t_dof: default_student_t_dof(),
            score_scale: default_score_scale(),
            cep95_table: default_cep95_table(),
            max_processing_ms: default_max_processing_ms(),
        }
    }
}

fn default_student_t_dof() -> u32 {
    5
}

fn default_score_scale() -> f64 {
    2.0
}

fn default_cep95_table() -> Vec<(f64, f64)> {
    vec![
        (0.05, 7.4),
        (0.17, 6.1),
        (0.43, 4.3),
        (0.80, 2.5),
        (0.85, 2.0),
        (0.90, 1.6),
        (0.95, 1.2),
        (0.98, 0.9),
    ]
}

fn default_max_processing_ms() -> u64 {
    2
}

/// Adaptive Kalman filter tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KalmanConfig {
    /// Process-noise adaptation factor (α): Q00 = α · residual variance
    #[serde(default = "default_process_alpha")]
    pub process_alpha: f64,

    /// Measurement-noise adaptation factor (β): σ = β · RSSI stddev
    #[serde(default = "default_measurement_beta")]
    pub measurement_beta: f64,

    /// Minimum samples before either adaptation fires
    #[serde(default = "default_min_window")]
    pub min_window: usize,

    /// Hard cap on the residual and RSSI windows
    #[serde(default = "default_window_cap")]
    pub window_cap: usize,

    /// Initial measurement-noise standard deviation, dB
    #[serde(default = "default_initial_sigma_db")]
    pub initial_sigma_db: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            process_alpha: default_process_alpha(),
            measurement_beta: default_measurement_beta(),
            min_window: default_min_window(),
            window_cap: default_window_cap(),
            initial_sigma_db: default_initial_sigma_db(),
        }
    }
}

fn default_process_alpha() -> f64 {
    0.1
}

fn default_measurement_beta() -> f64 {
    0.8
}

fn default_min_window() -> usize {
    5
}

fn default_window_cap() -> usize {
    50
}

fn default_initial_sigma_db() -> f64 {
    4.0
}

/// Log-distance path-loss model parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathLossConfig {
    /// Reference distance d₀, metres
    #[serde(default = "default_reference_distance_m")]
    pub reference_distance_m: f64,

    /// Fixed shadowing deviation used for z-scores, dB
    #[serde(default = "default_sigma_db")]
    pub sigma_db: f64,

    /// Initial RSSI at d₀ for newly discovered anchors, dBm
    #[serde(default = "default_rssi0_dbm")]
    pub default_rssi0_dbm: f64,

    /// Initial path-loss exponent for newly discovered anchors
    #[serde(default = "default_exponent")]
    pub default_exponent: f64,
}

impl Default for PathLossConfig {
    fn default() -> Self {
        Self {
            reference_distance_m: default_reference_distance_m(),
            sigma_db: default_sigma_db(),
            default_rssi0_dbm: default_rssi0_dbm(),
            default_exponent: default_exponent(),
        }
    }
}

fn default_reference_distance_m() -> f64 {
    1.0
}

fn default_sigma_db() -> f64 {
    4.0
}

fn default_rssi0_dbm() -> f64 {
    -59.0
}

fn default_exponent() -> f64 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_calibration() {
        let config = EstimatorConfig::default();
        assert_eq!(config.selection.max_significant, 5);
        assert_eq!(config.selection.rssi_band_db, 10.0);
        assert_eq!(config.health.lambda, 0.05);
        assert_eq!(config.health.faulty_threshold, 8.0);
        assert_eq!(config.gates.max_rssi_delta_db, 12.0);
        assert_eq!(config.gates.visibility_timeout_ms, 6000);
        assert_eq!(config.scoring.student_t_dof, 5);
        assert_eq!(config.scoring.cep95_table.len(), 8);
        assert_eq!(config.kalman.window_cap, 50);
        assert_eq!(config.path_loss.default_rssi0_dbm, -59.0);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let json = r#"{ "selection": { "max_significant": 3 } }"#;
        let config: EstimatorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.selection.max_significant, 3);
        assert_eq!(config.selection.rssi_band_db, 10.0);
        assert_eq!(config.kalman.min_window, 5);
    }

    #[test]
    fn test_z_source_snake_case() {
        let config: HealthConfig =
            serde_json::from_str(r#"{ "z_source": "post_update" }"#).unwrap();
        assert_eq!(config.z_source, HealthZSource::PostUpdate);
        assert_eq!(HealthZSource::default(), HealthZSource::PreUpdate);
    }
}
