//! # Dispatcher
//!
//! Publishes processed estimates to the configured sinks.
//!
//! Every sink runs behind its own bounded lane and worker task, so a slow
//! or failing sink drops or fails its own traffic without stalling the
//! estimation loop or its peers. Publish failures are terminal for the
//! affected report only; anchor state upstream is already committed.

mod publisher;
mod sinks;

pub use publisher::{LaneSnapshot, ReportPublisher};
pub use sinks::{build_sink, EstimateSink, FileSink, FileSinkConfig, LogSink, NetworkSink, Sink};
