//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-crate data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Fix timestamps are milliseconds since the Unix epoch, as delivered by the
//!   positioning engine upstream
//! - An anchor's `last_seen` of 0 means "never updated"

mod anchor_id;
mod blueprint;
mod directory;
mod error;
mod estimator_config;
mod fix;
mod geometry;
mod report;
mod source;

pub use anchor_id::AnchorId;
pub use blueprint::*;
pub use directory::CoordinateDirectory;
pub use error::*;
pub use estimator_config::*;
pub use fix::*;
pub use geometry::Point3;
pub use report::*;
pub use source::{FixSource, RawFixCallback};
