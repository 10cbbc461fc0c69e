//! Per-anchor calibration and health state.

use contracts::{AnchorId, HealthConfig, KalmanConfig, PathLossConfig, Point3};
use tracing::warn;

use crate::adakf::AdaptiveKalman;

/// One fixed BLE anchor: mounted coordinates, current path-loss parameter
/// estimates, EWMA health, and the owned Kalman filter that recalibrates
/// the parameters. Two anchors never share filter state.
#[derive(Debug, Clone)]
pub struct Anchor {
    id: AnchorId,
    coord: Point3,
    /// RSSI at the reference distance, dBm; invariant: finite and <= 0
    rssi0: f64,
    /// Path-loss exponent; invariant: finite and > 0
    n: f64,
    /// EWMA of squared standardized residuals; higher = worse
    ewma: f64,
    /// Timestamp (ms) of the last admitted health update; 0 = never
    last_seen: u64,
    kalman: AdaptiveKalman,
}

impl Anchor {
    /// Create a freshly discovered anchor.
    ///
    /// `ewma` starts at 1.0 rather than 0 so a new anchor is not instantly
    /// trusted over anchors with an established track record.
    pub fn new(
        id: AnchorId,
        coord: Point3,
        path_loss: &PathLossConfig,
        kalman: &KalmanConfig,
    ) -> Self {
        Self {
            id,
            coord,
            rssi0: path_loss.default_rssi0_dbm,
            n: path_loss.default_exponent,
            ewma: 1.0,
            last_seen: 0,
            kalman: AdaptiveKalman::new(kalman, path_loss.reference_distance_m),
        }
    }

    pub fn id(&self) -> &AnchorId {
        &self.id
    }

    pub fn coord(&self) -> Point3 {
        self.coord
    }

    pub fn rssi0(&self) -> f64 {
        self.rssi0
    }

    pub fn n(&self) -> f64 {
        self.n
    }

    pub fn ewma(&self) -> f64 {
        self.ewma
    }

    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    pub fn kalman(&self) -> &AdaptiveKalman {
        &self.kalman
    }

    /// Fold a standardized residual into the health score and stamp the
    /// anchor as seen.
    ///
    /// The squared residual is unbounded above, so a single wild reading
    /// moves the EWMA quickly; decay back toward 0 takes ~1/λ clean fixes.
    pub fn update_health(&mut self, z: f64, now_ms: u64, lambda: f64) {
        self.ewma = lambda * z * z + (1.0 - lambda) * self.ewma;
        self.last_seen = now_ms;
    }

    /// Run one Kalman step against a measured (RSSI, distance) pair and
    /// adopt the recalibrated parameters.
    ///
    /// Outputs violating the parameter invariants (non-finite, rssi0 > 0,
    /// n <= 0) are rejected and logged; the prior parameters stay in place.
    pub fn update_parameters(&mut self, measured_rssi: f64, estimated_distance: f64) {
        let (rssi0, n) =
            self.kalman
                .sequence_step(self.rssi0, self.n, measured_rssi, estimated_distance);

        if !rssi0.is_finite() || rssi0 > 0.0 || !n.is_finite() || n <= 0.0 {
            warn!(
                anchor = %self.id,
                rssi0,
                n,
                "rejecting out-of-range path-loss update"
            );
            return;
        }

        self.rssi0 = rssi0;
        self.n = n;
    }

    /// 4 <= ewma < 8 under the default thresholds.
    pub fn is_warning(&self, health: &HealthConfig) -> bool {
        self.ewma >= health.warning_threshold && self.ewma < health.faulty_threshold
    }

    /// ewma >= 8 under the default thresholds.
    pub fn is_faulty(&self, health: &HealthConfig) -> bool {
        self.ewma >= health.faulty_threshold
    }
}
