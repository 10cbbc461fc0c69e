//! Fix ingestion pipeline
//!
//! Funnels every registered source into one bounded channel of decoded
//! fixes. Sources deliver raw payloads; decoding happens here so the wire
//! handling (and its drop-on-malformed policy) is shared.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use bytes::Bytes;
use contracts::{FixSource, RawFixCallback, TagFix};
use tracing::{debug, info, warn};

use crate::decoder::decode_fix;

/// Shared ingress counters.
#[derive(Debug, Default)]
pub struct IngressCounters {
    received: AtomicU64,
    decode_failures: AtomicU64,
    dropped: AtomicU64,
}

impl IngressCounters {
    /// Messages delivered by sources.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Payloads that failed to decode (logged and dropped).
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    /// Decoded fixes dropped because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Fix ingestion pipeline.
///
/// Delivery order across sources follows arrival order; within a source it
/// is the source's own order, which is what the estimation engine requires.
pub struct FixPipeline {
    /// Registered sources by id
    sources: HashMap<String, Box<dyn FixSource>>,

    /// Counters shared with every source callback
    counters: Arc<IngressCounters>,

    /// Fix sender (cloned into each source callback)
    tx: Sender<TagFix>,

    /// Fix receiver, handed out once
    rx: Option<Receiver<TagFix>>,
}

impl FixPipeline {
    /// Create a pipeline whose channel holds at most `channel_capacity`
    /// undelivered fixes; beyond that, incoming fixes are dropped.
    pub fn new(channel_capacity: usize) -> Self {
        let (tx, rx) = bounded(channel_capacity);

        Self {
            sources: HashMap::new(),
            counters: Arc::new(IngressCounters::default()),
            tx,
            rx: Some(rx),
        }
    }

    /// Register a fix source.
    pub fn register_source(&mut self, source: Box<dyn FixSource>) {
        debug!(source = %source.source_id(), "registered fix source");
        self.sources.insert(source.source_id().to_string(), source);
    }

    /// Start all registered sources.
    pub fn start_all(&self) {
        info!(count = self.sources.len(), "starting fix sources");
        for (source_id, source) in &self.sources {
            if !source.is_listening() {
                source.listen(self.decode_and_forward(source_id));
            }
        }
    }

    /// Stop all sources.
    pub fn stop_all(&self) {
        info!(count = self.sources.len(), "stopping fix sources");
        for source in self.sources.values() {
            if source.is_listening() {
                source.stop();
            }
        }
    }

    /// Get the fix receiver.
    ///
    /// Can only be taken once; later calls return `None`.
    pub fn take_receiver(&mut self) -> Option<Receiver<TagFix>> {
        self.rx.take()
    }

    /// Shared counters handle.
    pub fn counters(&self) -> Arc<IngressCounters> {
        self.counters.clone()
    }

    /// Number of registered sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Build the decode-and-forward callback for one source.
    fn decode_and_forward(&self, source_id: &str) -> RawFixCallback {
        let source_id = source_id.to_string();
        let tx = self.tx.clone();
        let counters = self.counters.clone();

        Arc::new(move |payload: Bytes| {
            counters.received.fetch_add(1, Ordering::Relaxed);

            let fix = match decode_fix(&payload) {
                Ok(fix) => fix,
                Err(e) => {
                    counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(source = %source_id, error = %e, "dropping undecodable payload");
                    return;
                }
            };

            match tx.try_send(fix) {
                Ok(()) => {}
                Err(TrySendError::Full(fix)) => {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(source = %source_id, tag = %fix.tag_id, "channel full, fix dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(source = %source_id, "fix channel closed");
                }
            }
        })
    }
}

impl Drop for FixPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
