//! Log-distance path-loss model.

use contracts::PathLossConfig;

/// Distances below this are clamped before the logarithm.
pub(crate) const MIN_DISTANCE_M: f64 = 1e-6;

/// Process-wide log-distance path-loss model.
///
/// Holds the reference distance d₀ and the fixed shadowing deviation used
/// for standardized residuals. The per-anchor Kalman filter maintains its
/// own adaptive σ; this one stays constant so z-scores remain comparable
/// across anchors and over time.
#[derive(Debug, Clone)]
pub struct PathLossModel {
    reference_distance: f64,
    sigma: f64,
}

impl PathLossModel {
    pub fn new(config: &PathLossConfig) -> Self {
        Self {
            reference_distance: config.reference_distance_m,
            sigma: config.sigma_db,
        }
    }

    /// Expected RSSI at `distance` metres: rssi0 − 10·n·log₁₀(d/d₀).
    pub fn mean_rssi(&self, rssi0: f64, n: f64, distance: f64) -> f64 {
        let d = distance.max(MIN_DISTANCE_M);
        rssi0 - 10.0 * n * (d / self.reference_distance).log10()
    }

    /// Standardized residual of an observed RSSI against the model.
    pub fn z_score(&self, observed: f64, rssi0: f64, n: f64, distance: f64) -> f64 {
        (observed - self.mean_rssi(rssi0, n, distance)) / self.sigma
    }

    /// The fixed shadowing deviation in dB.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl Default for PathLossModel {
    fn default() -> Self {
        Self::new(&PathLossConfig::default())
    }
}
