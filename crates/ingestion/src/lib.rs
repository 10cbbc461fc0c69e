//! # Ingestion
//!
//! Fix ingress pipeline.
//!
//! Responsibilities:
//! - Adapting [`contracts::FixSource`] implementations onto one shared
//!   channel with backpressure
//! - Decoding bus payloads into [`contracts::TagFix`] (malformed payloads
//!   are logged, counted and dropped)
//! - UDP bus-subscriber stand-in and a mock generator for offline runs
//!
//! ## Usage
//!
//! ```ignore
//! use ingestion::{FixPipeline, UdpFixSource};
//!
//! let mut pipeline = FixPipeline::new(100);
//! pipeline.register_source(Box::new(UdpFixSource::new("bus", "0.0.0.0", 1884)));
//! pipeline.start_all();
//!
//! let rx = pipeline.take_receiver().unwrap();
//! while let Ok(fix) = rx.recv().await {
//!     // process fix
//! }
//! ```

mod decoder;
mod mock;
mod pipeline;
mod udp;

pub use decoder::decode_fix;
pub use mock::{MockFixConfig, MockFixSource};
pub use pipeline::{FixPipeline, IngressCounters};
pub use udp::UdpFixSource;
