//! FixSource trait - fix ingress abstraction
//!
//! Unified interface over bus subscribers and synthetic generators so the
//! ingestion pipeline handles both the same way.

use std::sync::Arc;

use bytes::Bytes;

/// Raw message callback type.
///
/// A source invokes this with the raw payload of each bus message; decoding
/// happens downstream so every source shares the same wire handling.
pub type RawFixCallback = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Fix ingress source trait.
///
/// Implemented by the bus subscriber stand-in and by the mock generator.
/// Callback pattern rather than channels, so sources stay runtime-agnostic.
pub trait FixSource: Send + Sync {
    /// Source identifier (for logs/metrics)
    fn source_id(&self) -> &str;

    /// Register the payload callback and start delivering messages.
    ///
    /// Repeated calls while already listening must be idempotent.
    fn listen(&self, callback: RawFixCallback);

    /// Stop delivering messages.
    fn stop(&self);

    /// Check whether the source is currently listening.
    fn is_listening(&self) -> bool;
}
