//! CoordinateDirectory trait - anchor coordinate resolution seam
//!
//! The configuration service that knows where anchors are mounted is an
//! external collaborator; this trait is its in-process interface so the
//! engine can be driven by the HTTP client or a mock interchangeably.

use crate::{ContractError, Point3};

/// Anchor coordinate resolution.
#[trait_variant::make(CoordinateDirectory: Send)]
pub trait LocalCoordinateDirectory {
    /// Resolve an anchor id to its mounted 3-D coordinates.
    ///
    /// # Errors
    /// Resolution failures (unknown id, endpoint unreachable, timeout) are
    /// reported as [`ContractError::AnchorResolution`]; the caller skips the
    /// id and retries on its next appearance.
    async fn resolve(&self, anchor_id: &str) -> Result<Point3, ContractError>;
}
