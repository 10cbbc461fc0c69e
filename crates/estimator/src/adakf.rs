//! Adaptive Kalman filter for per-anchor path-loss calibration.
//!
//! Implements a 2-state filter over [RSSI₀, n] with residual-driven process
//! noise and RSSI-spread-driven measurement noise.

use std::collections::VecDeque;

use contracts::KalmanConfig;

use crate::pathloss::MIN_DISTANCE_M;

const INITIAL_P: [[f64; 2]; 2] = [[1.0, 0.0], [0.0, 0.1]];
const INITIAL_Q_RSSI0: f64 = 0.0025 * 0.0025;
const INITIAL_Q_EXPONENT: f64 = 0.0001 * 0.0001;

/// Exponent drift is modelled 100x quieter than RSSI₀ drift in dB² terms.
const EXPONENT_NOISE_RATIO: f64 = 100.0;

/// Adaptive Kalman filter for one anchor's path-loss parameters.
///
/// State vector x = [RSSI₀, n] where:
/// - `RSSI₀` is the received power at the reference distance (dBm)
/// - `n` is the path-loss exponent
///
/// The state itself lives on the anchor; each step receives the current
/// values and returns the updated pair. State transition is identity (the
/// filter tracks parameter drift, not motion); the observation row is
/// H = [1, X] with X = −10·log₁₀(d/d₀).
#[derive(Debug, Clone)]
pub struct AdaptiveKalman {
    /// State covariance matrix
    covariance: [[f64; 2]; 2],
    /// Process-noise matrix; off-diagonals stay zero
    process_noise: [[f64; 2]; 2],
    /// Measurement-noise standard deviation (dB)
    sigma: f64,
    /// Rolling innovation history (drives Q adaptation)
    residuals: VecDeque<f64>,
    /// Rolling raw-RSSI history (drives σ adaptation)
    rssi_window: VecDeque<f64>,
    /// Process-noise adaptation factor (α)
    alpha: f64,
    /// Measurement-noise adaptation factor (β)
    beta: f64,
    /// Samples required before either adaptation fires
    min_window: usize,
    /// Hard cap on both windows
    window_cap: usize,
    /// Reference distance d₀ (metres)
    reference_distance: f64,
}

impl AdaptiveKalman {
    /// Create a filter with the calibrated initial covariances.
    pub fn new(config: &KalmanConfig, reference_distance: f64) -> Self {
        Self {
            covariance: INITIAL_P,
            process_noise: [[INITIAL_Q_RSSI0, 0.0], [0.0, INITIAL_Q_EXPONENT]],
            sigma: config.initial_sigma_db,
            residuals: VecDeque::with_capacity(config.window_cap),
            rssi_window: VecDeque::with_capacity(config.window_cap),
            alpha: config.process_alpha,
            beta: config.measurement_beta,
            min_window: config.min_window,
            window_cap: config.window_cap,
            reference_distance,
        }
    }

    /// Run one filter step.
    ///
    /// * `rssi0` / `n` - current parameter estimates
    /// * `rssi` - measured RSSI (dBm)
    /// * `distance` - estimated tag-anchor distance (metres, clamped to 1e-6)
    ///
    /// Returns the updated (RSSI₀, n) pair.
    pub fn sequence_step(&mut self, rssi0: f64, n: f64, rssi: f64, distance: f64) -> (f64, f64) {
        // Store RSSI and trim
        push_capped(&mut self.rssi_window, rssi, self.window_cap);

        // Adapt sigma from the RSSI spread once enough data has accumulated.
        // A degenerate window (stddev 0) leaves the prior sigma in place.
        if self.rssi_window.len() >= self.min_window {
            let spread = stddev(&self.rssi_window);
            if spread > 0.0 {
                self.sigma = self.beta * spread;
            }
        }

        // Adapt Q from the residual variance
        if self.residuals.len() >= self.min_window {
            let resid_var = variance(&self.residuals);
            self.process_noise[0][0] = self.alpha * resid_var;
            self.process_noise[1][1] = self.alpha * resid_var / EXPONENT_NOISE_RATIO;
        }

        // P_{i+1|i} = P_{i|i} + Q
        for row in 0..2 {
            for col in 0..2 {
                self.covariance[row][col] += self.process_noise[row][col];
            }
        }

        // Observation row H = [1, X]
        let x = -10.0 * (distance.max(MIN_DISTANCE_M) / self.reference_distance).log10();

        // Predicted measurement and innovation
        let predicted = rssi0 + n * x;
        let residual = rssi - predicted;
        push_capped(&mut self.residuals, residual, self.window_cap);

        // Innovation variance S = H P H^T + sigma^2
        let p = self.covariance;
        let ph0 = p[0][0] + p[0][1] * x;
        let ph1 = p[1][0] + p[1][1] * x;
        let innovation_var = ph0 + x * ph1 + self.sigma * self.sigma;

        if !innovation_var.is_finite() || innovation_var <= 0.0 {
            // Degenerate innovation: hold the prior state and covariance
            tracing::warn!(innovation_var, "degenerate innovation variance, holding state");
            return (rssi0, n);
        }

        // Gain K = P H^T / S
        let k0 = ph0 / innovation_var;
        let k1 = ph1 / innovation_var;

        let updated = (rssi0 + k0 * residual, n + k1 * residual);

        // P_{i+1|i+1} = (I - K H) P, each entry from the pre-update P
        let kh00 = k0;
        let kh01 = k0 * x;
        let kh10 = k1;
        let kh11 = k1 * x;

        self.covariance = [
            [
                (1.0 - kh00) * p[0][0] - kh01 * p[1][0],
                (1.0 - kh00) * p[0][1] - kh01 * p[1][1],
            ],
            [
                -kh10 * p[0][0] + (1.0 - kh11) * p[1][0],
                -kh10 * p[0][1] + (1.0 - kh11) * p[1][1],
            ],
        ];

        updated
    }

    /// Current measurement-noise standard deviation (dB)
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Current process-noise diagonal (Q00, Q11)
    pub fn process_noise_diag(&self) -> (f64, f64) {
        (self.process_noise[0][0], self.process_noise[1][1])
    }

    /// Current state covariance
    pub fn covariance(&self) -> &[[f64; 2]; 2] {
        &self.covariance
    }

    /// Current (residual, RSSI) window sizes
    pub fn window_len(&self) -> (usize, usize) {
        (self.residuals.len(), self.rssi_window.len())
    }
}

fn push_capped(window: &mut VecDeque<f64>, value: f64, cap: usize) {
    window.push_back(value);
    if window.len() > cap {
        window.pop_front();
    }
}

fn mean(window: &VecDeque<f64>) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

/// Population variance, matching the calibration of alpha.
fn variance(window: &VecDeque<f64>) -> f64 {
    let m = mean(window);
    window.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / window.len() as f64
}

fn stddev(window: &VecDeque<f64>) -> f64 {
    variance(window).sqrt()
}
