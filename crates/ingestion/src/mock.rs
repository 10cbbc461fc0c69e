//! Mock fix source
//!
//! Generates synthetic position messages for offline runs and tests: a tag
//! walking a loop through a grid of anchors, RSSI drawn from the
//! log-distance model with a small deterministic ripple.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use contracts::{
    AnchorReading, FixSource, LocationBody, Point3, PositionBody, PositionMessage, RawFixCallback,
    TagRef,
};
use tracing::{debug, trace, warn};

/// Mock fix source configuration
#[derive(Debug, Clone)]
pub struct MockFixConfig {
    /// Source ID
    pub source_id: String,

    /// Tag MAC carried in the generated messages
    pub tag_mac: String,

    /// Message frequency (Hz)
    pub frequency_hz: f64,

    /// Number of anchors in the synthetic grid
    pub anchor_count: usize,

    /// Grid spacing (metres)
    pub grid_spacing_m: f64,

    /// Mount height of all anchors (metres)
    pub anchor_z_m: f64,
}

impl Default for MockFixConfig {
    fn default() -> Self {
        Self {
            source_id: "mock_fixes".to_string(),
            tag_mac: "mock-tag-01".to_string(),
            frequency_hz: 10.0,
            anchor_count: 9,
            grid_spacing_m: 10.0,
            anchor_z_m: 3.0,
        }
    }
}

/// Mock fix source.
///
/// Spawns a generator thread on `listen` that feeds serialized
/// position messages to the callback at the configured rate.
pub struct MockFixSource {
    config: MockFixConfig,
    running: Arc<AtomicBool>,
}

impl MockFixSource {
    pub fn new(config: MockFixConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The synthetic anchor layout: ids and mounted coordinates.
    ///
    /// Exposed so a mock directory can be seeded with the same geometry
    /// the generated messages reference.
    pub fn anchor_layout(&self) -> Vec<(String, Point3)> {
        Self::layout_for(&self.config)
    }

    fn layout_for(config: &MockFixConfig) -> Vec<(String, Point3)> {
        let columns = (config.anchor_count as f64).sqrt().ceil().max(1.0) as usize;
        (0..config.anchor_count)
            .map(|i| {
                let x = (i % columns) as f64 * config.grid_spacing_m;
                let y = (i / columns) as f64 * config.grid_spacing_m;
                (format!("mock-anchor-{i:02}"), Point3::new(x, y, config.anchor_z_m))
            })
            .collect()
    }

    /// Tag position at generation step `step`: a loop around the grid.
    fn tag_position(config: &MockFixConfig, step: u64) -> Point3 {
        let columns = (config.anchor_count as f64).sqrt().ceil().max(1.0);
        let extent = (columns - 1.0).max(1.0) * config.grid_spacing_m;
        let angle = step as f64 * 0.05;
        Point3::new(
            extent / 2.0 + extent / 3.0 * angle.cos(),
            extent / 2.0 + extent / 3.0 * angle.sin(),
            1.2,
        )
    }

    fn build_message(config: &MockFixConfig, step: u64, timestamp_ms: u64) -> PositionMessage {
        let position = Self::tag_position(config, step);

        // Model RSSI with defaults (-59 dBm at 1 m, n = 2) plus a +-1.5 dB
        // deterministic ripple so the Kalman windows see variation
        let mut readings: Vec<AnchorReading> = Self::layout_for(config)
            .into_iter()
            .enumerate()
            .map(|(i, (mac, coord))| {
                let d = coord.distance(&position).max(1e-6);
                let ripple = (((step + i as u64) % 7) as f64 - 3.0) * 0.5;
                AnchorReading {
                    mac,
                    rssi: -59.0 - 20.0 * d.log10() + ripple,
                }
            })
            .collect();
        readings.sort_by(|a, b| b.rssi.partial_cmp(&a.rssi).unwrap_or(std::cmp::Ordering::Equal));

        // Strongest 8 contribute to the fix, the rest are heard-but-unused
        let used: Vec<AnchorReading> = readings.iter().take(8).cloned().collect();
        let unused: Vec<AnchorReading> = readings.iter().skip(8).cloned().collect();

        PositionMessage {
            tag: TagRef {
                mac: config.tag_mac.clone(),
            },
            location: LocationBody {
                position: PositionBody {
                    x: position.x,
                    y: position.y,
                    z: position.z,
                    used_anchors: used,
                    unused_anchors: unused,
                },
            },
            timestamp: timestamp_ms as f64,
        }
    }
}

impl FixSource for MockFixSource {
    fn source_id(&self) -> &str {
        &self.config.source_id
    }

    fn listen(&self, callback: RawFixCallback) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.config.clone();
        let running = self.running.clone();

        thread::spawn(move || {
            let interval = Duration::from_secs_f64(1.0 / config.frequency_hz.max(0.1));
            let mut step: u64 = 0;

            debug!(
                source = %config.source_id,
                anchors = config.anchor_count,
                frequency_hz = config.frequency_hz,
                "mock fix source started"
            );

            while running.load(Ordering::Relaxed) {
                let timestamp_ms = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);

                let message = Self::build_message(&config, step, timestamp_ms);
                match serde_json::to_vec(&message) {
                    Ok(payload) => callback(Bytes::from(payload)),
                    Err(e) => warn!(source = %config.source_id, error = %e, "mock serialization failed"),
                }

                trace!(source = %config.source_id, step, "mock fix sent");
                step += 1;
                thread::sleep(interval);
            }

            debug!(source = %config.source_id, "mock fix source stopped");
        });
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
