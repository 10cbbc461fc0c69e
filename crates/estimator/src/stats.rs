//! Statistics kernel: Student-t log-pdf and the CEP95 calibration lookup.

use statrs::function::gamma::ln_gamma;

/// Log-density of the standard Student-t distribution at `z` with `dof`
/// degrees of freedom.
///
/// Even in `z`, strictly decreasing in `|z|`. `dof` must be >= 2.
pub fn log_pdf_student_t(z: f64, dof: u32) -> f64 {
    let v = f64::from(dof);

    ln_gamma((v + 1.0) / 2.0)
        - ln_gamma(v / 2.0)
        - 0.5 * (v * std::f64::consts::PI).ln()
        - (v + 1.0) / 2.0 * (z * z / v).ln_1p()
}

/// Calibrated confidence-to-radius lookup.
///
/// Piecewise-linear over ascending (confidence, radius) knots; confidence
/// outside the table clamps to the end radii. The table is calibrated
/// against the confidence scoring in [`crate::FixEvaluator`], so the two
/// must change together.
#[derive(Debug, Clone)]
pub struct Cep95Table {
    knots: Vec<(f64, f64)>,
}

impl Cep95Table {
    /// Build from (confidence, radius_m) knots, confidence ascending.
    pub fn new(knots: Vec<(f64, f64)>) -> Self {
        Self { knots }
    }

    /// CEP95 radius in metres for a confidence score.
    pub fn radius(&self, confidence: f64) -> f64 {
        let first = self.knots[0];
        let last = self.knots[self.knots.len() - 1];

        if confidence <= first.0 {
            return first.1;
        }
        if confidence >= last.0 {
            return last.1;
        }

        let mut i = 0;
        while i < self.knots.len() - 1 {
            if self.knots[i + 1].0 > confidence {
                break;
            }
            i += 1;
        }

        let (x0, y0) = self.knots[i];
        let (x1, y1) = self.knots[i + 1];
        let t = (confidence - x0) / (x1 - x0);
        y0 + t * (y1 - y0)
    }
}

impl Default for Cep95Table {
    fn default() -> Self {
        Self::new(contracts::ScoringConfig::default().cep95_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_t_even_in_z() {
        for z in [0.1, 0.5, 1.0, 2.5, 10.0] {
            let pos = log_pdf_student_t(z, 5);
            let neg = log_pdf_student_t(-z, 5);
            assert!((pos - neg).abs() < 1e-12, "asymmetric at z={z}");
        }
    }

    #[test]
    fn test_student_t_decreasing_in_abs_z() {
        let mut prev = log_pdf_student_t(0.0, 5);
        for i in 1..50 {
            let z = i as f64 * 0.25;
            let current = log_pdf_student_t(z, 5);
            assert!(current < prev, "not decreasing at z={z}");
            prev = current;
        }
    }

    #[test]
    fn test_student_t_known_value_at_zero() {
        // t(0; v) = Γ((v+1)/2) / (Γ(v/2) sqrt(vπ)); for v=5 this is ~0.3796
        let density = log_pdf_student_t(0.0, 5).exp();
        assert!((density - 0.3796).abs() < 1e-3, "got {density}");
    }

    #[test]
    fn test_cep95_exact_at_knots() {
        let table = Cep95Table::default();
        for (p, radius) in [
            (0.05, 7.4),
            (0.17, 6.1),
            (0.43, 4.3),
            (0.80, 2.5),
            (0.85, 2.0),
            (0.90, 1.6),
            (0.95, 1.2),
            (0.98, 0.9),
        ] {
            assert_eq!(table.radius(p), radius, "at knot {p}");
        }
    }

    #[test]
    fn test_cep95_clamped_ends() {
        let table = Cep95Table::default();
        assert_eq!(table.radius(0.0), 7.4);
        assert_eq!(table.radius(0.01), 7.4);
        assert_eq!(table.radius(1.0), 0.9);
    }

    #[test]
    fn test_cep95_interpolates_between_knots() {
        let table = Cep95Table::default();
        // Halfway between (0.05, 7.4) and (0.17, 6.1)
        let mid = table.radius(0.11);
        assert!((mid - 6.75).abs() < 1e-9, "got {mid}");
    }

    #[test]
    fn test_cep95_monotone_non_increasing() {
        let table = Cep95Table::default();
        let mut prev = table.radius(0.0);
        for i in 1..=100 {
            let p = i as f64 / 100.0;
            let radius = table.radius(p);
            assert!(radius <= prev + 1e-12, "increased at p={p}");
            prev = radius;
        }
    }
}
