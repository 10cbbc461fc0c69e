//! ReportPublisher - fan-out of estimates to per-sink lanes.
//!
//! Every sink gets a bounded lane with its own worker task. `publish` never
//! blocks the estimation loop: a lane whose queue is full drops that
//! estimate for that sink only, and a failing sink fails alone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{ContractError, Estimate, SinkConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::sinks::{build_sink, EstimateSink};

/// Per-lane counters, shared between the publisher and the worker.
#[derive(Debug, Default)]
struct LaneCounters {
    published: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl LaneCounters {
    fn snapshot(&self) -> LaneSnapshot {
        LaneSnapshot {
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of one lane's counters.
#[derive(Debug, Clone, Copy)]
pub struct LaneSnapshot {
    pub published: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// One sink behind its bounded queue.
struct SinkLane {
    name: String,
    tx: mpsc::Sender<Estimate>,
    counters: Arc<LaneCounters>,
    worker: JoinHandle<()>,
}

/// Fans processed estimates out to every configured sink.
pub struct ReportPublisher {
    lanes: Vec<SinkLane>,
}

impl ReportPublisher {
    /// Open one lane per sink entry in the blueprint.
    pub async fn from_configs(configs: &[SinkConfig]) -> Result<Self, ContractError> {
        let mut lanes = Vec::with_capacity(configs.len());
        for config in configs {
            let sink = build_sink(config).await?;
            lanes.push(spawn_lane(&config.name, config.queue_capacity, sink));
        }

        info!(sinks = lanes.len(), "report publisher ready");
        Ok(Self { lanes })
    }

    /// Number of open lanes.
    pub fn sink_count(&self) -> usize {
        self.lanes.len()
    }

    /// Hand one estimate to every lane.
    ///
    /// State updates upstream are already committed by the time an estimate
    /// reaches this point, so a full or dead lane costs only that sink's
    /// copy of the report.
    pub fn publish(&self, estimate: &Estimate) {
        for lane in &self.lanes {
            match lane.tx.try_send(estimate.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(rejected)) => {
                    lane.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        sink = %lane.name,
                        tag = %rejected.report.tag_mac,
                        "sink lane full, estimate dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    error!(sink = %lane.name, "sink worker gone, estimate lost");
                }
            }
        }
    }

    /// Live counters per lane.
    pub fn snapshots(&self) -> Vec<(String, LaneSnapshot)> {
        self.lanes
            .iter()
            .map(|lane| (lane.name.clone(), lane.counters.snapshot()))
            .collect()
    }

    /// Close every lane, wait for the workers to drain, and return the
    /// final per-lane totals.
    pub async fn shutdown(self) -> Vec<(String, LaneSnapshot)> {
        let mut totals = Vec::with_capacity(self.lanes.len());

        for lane in self.lanes {
            let SinkLane {
                name,
                tx,
                counters,
                worker,
            } = lane;

            // Closing the lane lets the worker drain and shut the sink down
            drop(tx);
            if let Err(e) = worker.await {
                error!(sink = %name, error = ?e, "sink worker panicked");
            }
            totals.push((name, counters.snapshot()));
        }

        info!("report publisher stopped");
        totals
    }
}

fn spawn_lane<S>(name: &str, queue_capacity: usize, sink: S) -> SinkLane
where
    S: EstimateSink + Send + 'static,
{
    let (tx, rx) = mpsc::channel(queue_capacity);
    let counters = Arc::new(LaneCounters::default());
    let worker = tokio::spawn(lane_worker(name.to_string(), sink, rx, counters.clone()));

    SinkLane {
        name: name.to_string(),
        tx,
        counters,
        worker,
    }
}

async fn lane_worker<S: EstimateSink>(
    name: String,
    mut sink: S,
    mut rx: mpsc::Receiver<Estimate>,
    counters: Arc<LaneCounters>,
) {
    debug!(sink = %name, "sink worker started");

    while let Some(estimate) = rx.recv().await {
        match sink.write(&estimate).await {
            Ok(()) => {
                counters.published.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    sink = %name,
                    tag = %estimate.report.tag_mac,
                    error = %e,
                    "publish failed"
                );
            }
        }
    }

    if let Err(e) = sink.shutdown().await {
        error!(sink = %name, error = %e, "sink shutdown failed");
    }
    debug!(sink = %name, "sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ErrorReport, EstimateMeta, SinkType};
    use std::collections::HashMap;
    use std::time::Duration;

    fn make_estimate(tag: &str) -> Estimate {
        Estimate {
            report: ErrorReport {
                tag_mac: tag.to_string(),
                error_estimate: 2.5,
                anchors_selected_for_estimation: Vec::new(),
                warning_anchors: Vec::new(),
                faulty_anchors: Vec::new(),
            },
            meta: EstimateMeta::default(),
        }
    }

    /// Test sink with configurable delay and failure behaviour.
    struct TestSink {
        delay: Duration,
        fail: bool,
    }

    impl EstimateSink for TestSink {
        async fn write(&mut self, _estimate: &Estimate) -> Result<(), ContractError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(ContractError::sink("test", "injected failure"));
            }
            Ok(())
        }

        async fn shutdown(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn publisher_with(sink: TestSink, capacity: usize) -> ReportPublisher {
        ReportPublisher {
            lanes: vec![spawn_lane("test_lane", capacity, sink)],
        }
    }

    #[tokio::test]
    async fn test_publish_and_drain() {
        let publisher = publisher_with(
            TestSink {
                delay: Duration::ZERO,
                fail: false,
            },
            10,
        );

        for i in 0..5 {
            publisher.publish(&make_estimate(&format!("tag-{i}")));
        }

        let totals = publisher.shutdown().await;
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].1.published, 5);
        assert_eq!(totals[0].1.dropped, 0);
    }

    #[tokio::test]
    async fn test_full_lane_drops_for_that_sink_only() {
        let publisher = publisher_with(
            TestSink {
                delay: Duration::from_millis(100),
                fail: false,
            },
            1,
        );

        for i in 0..10 {
            publisher.publish(&make_estimate(&format!("tag-{i}")));
        }

        let snapshots = publisher.snapshots();
        assert!(snapshots[0].1.dropped > 0);

        publisher.shutdown().await;
    }

    #[tokio::test]
    async fn test_failing_sink_counts_failures() {
        let publisher = publisher_with(
            TestSink {
                delay: Duration::ZERO,
                fail: true,
            },
            10,
        );

        for i in 0..3 {
            publisher.publish(&make_estimate(&format!("tag-{i}")));
        }

        let totals = publisher.shutdown().await;
        assert_eq!(totals[0].1.failed, 3);
        assert_eq!(totals[0].1.published, 0);
    }

    #[tokio::test]
    async fn test_from_configs_builds_lanes() {
        let configs = vec![SinkConfig {
            name: "log_out".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 10,
            params: HashMap::new(),
        }];

        let publisher = ReportPublisher::from_configs(&configs).await.unwrap();
        assert_eq!(publisher.sink_count(), 1);

        publisher.publish(&make_estimate("tag-1"));
        let totals = publisher.shutdown().await;
        assert_eq!(totals[0].0, "log_out");
        assert_eq!(totals[0].1.published, 1);
    }
}
