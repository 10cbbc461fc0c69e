//! # Estimator
//!
//! The CEP95 estimation core: per-anchor adaptive path-loss calibration, fix
//! scoring under a health-weighted Student-t likelihood, and EWMA anchor
//! health tracking.
//!
//! Responsibilities:
//! - Lazy anchor discovery against a [`contracts::CoordinateDirectory`]
//! - Per-fix significant-anchor selection and confidence scoring
//! - Kalman parameter updates followed by gated health updates
//! - `ErrorReport` + diagnostics assembly
//!
//! ## Usage
//!
//! ```ignore
//! use estimator::EstimationEngine;
//!
//! let mut engine = EstimationEngine::new(config, directory_client);
//!
//! // Feed fixes in delivery order
//! if let Some(estimate) = engine.process(&fix).await {
//!     // publish estimate.report
//! }
//! ```

mod adakf;
mod anchor;
mod engine;
mod evaluator;
mod pathloss;
mod registry;
mod stats;

pub use adakf::AdaptiveKalman;
pub use anchor::Anchor;
pub use engine::EstimationEngine;
pub use evaluator::FixEvaluator;
pub use pathloss::PathLossModel;
pub use registry::AnchorRegistry;
pub use stats::{log_pdf_student_t, Cep95Table};
