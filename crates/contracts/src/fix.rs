//! Tag position fix: wire format and the parsed in-memory form.
//!
//! The wire shape mirrors what the upstream positioning engine publishes on
//! the bus; only `used_anchors` contribute RSSI readings, `unused_anchors`
//! matter solely for anchor discovery.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{AnchorId, Point3};

/// One per-anchor entry inside a position message.
///
/// The engine publishes more fields per anchor (distance, floor, ...);
/// everything except `mac` and `rssi` is ignored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorReading {
    pub mac: String,
    pub rssi: f64,
}

/// Tag reference inside a position message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRef {
    pub mac: String,
}

/// The `location.position` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionBody {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub used_anchors: Vec<AnchorReading>,
    #[serde(default)]
    pub unused_anchors: Vec<AnchorReading>,
}

/// The `location` wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationBody {
    pub position: PositionBody,
}

/// Incoming bus message, one per fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionMessage {
    pub tag: TagRef,
    pub location: LocationBody,
    /// Milliseconds since epoch; brokers emit both integers and floats
    pub timestamp: f64,
}

/// A parsed position fix, ready for estimation.
#[derive(Debug, Clone)]
pub struct TagFix {
    /// Tag identifier (MAC string)
    pub tag_id: String,

    /// Position computed upstream, metres
    pub position: Point3,

    /// RSSI readings from the anchors that contributed to the fix (dBm)
    pub rssi: HashMap<AnchorId, f64>,

    /// Every anchor id mentioned by the message (used and unused),
    /// deduplicated; drives lazy registry discovery
    pub discovered: Vec<AnchorId>,

    /// Fix timestamp, ms since epoch
    pub timestamp_ms: u64,
}

impl TagFix {
    /// Strongest RSSI across all readings in this fix, if any.
    pub fn strongest_rssi(&self) -> Option<f64> {
        self.rssi
            .values()
            .copied()
            .fold(None, |acc, r| Some(acc.map_or(r, |m: f64| m.max(r))))
    }
}

impl From<PositionMessage> for TagFix {
    fn from(msg: PositionMessage) -> Self {
        let position = Point3::new(
            msg.location.position.x,
            msg.location.position.y,
            msg.location.position.z,
        );

        let rssi: HashMap<AnchorId, f64> = msg
            .location
            .position
            .used_anchors
            .iter()
            .map(|a| (AnchorId::from(a.mac.as_str()), a.rssi))
            .collect();

        let mut discovered: Vec<AnchorId> = msg
            .location
            .position
            .used_anchors
            .iter()
            .chain(msg.location.position.unused_anchors.iter())
            .map(|a| AnchorId::from(a.mac.as_str()))
            .collect();
        discovered.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
        discovered.dedup();

        Self {
            tag_id: msg.tag.mac,
            position,
            rssi,
            discovered,
            timestamp_ms: msg.timestamp.max(0.0) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "tag": { "mac": "tag-01" },
        "location": { "position": {
            "x": 5.92, "y": 2.21, "z": 0.0,
            "used_anchors": [
                { "mac": "a1", "rssi": -57.0, "distance": 2.4 },
                { "mac": "a2", "rssi": -59.47 }
            ],
            "unused_anchors": [
                { "mac": "a3", "rssi": -80.0 },
                { "mac": "a1", "rssi": -57.0 }
            ]
        } },
        "timestamp": 1700000000123
    }"#;

    #[test]
    fn test_parse_and_convert() {
        let msg: PositionMessage = serde_json::from_str(SAMPLE).unwrap();
        let fix = TagFix::from(msg);

        assert_eq!(fix.tag_id, "tag-01");
        assert_eq!(fix.position, Point3::new(5.92, 2.21, 0.0));
        assert_eq!(fix.timestamp_ms, 1_700_000_000_123);

        // Only used anchors carry RSSI
        assert_eq!(fix.rssi.len(), 2);
        assert_eq!(fix.rssi.get("a1"), Some(&-57.0));
        assert!(!fix.rssi.contains_key("a3"));

        // Discovery covers used + unused, deduplicated
        assert_eq!(fix.discovered.len(), 3);
    }

    #[test]
    fn test_missing_anchor_lists_default_empty() {
        let raw = r#"{
            "tag": { "mac": "t" },
            "location": { "position": { "x": 0.0, "y": 0.0, "z": 0.0 } },
            "timestamp": 1.0
        }"#;
        let msg: PositionMessage = serde_json::from_str(raw).unwrap();
        let fix = TagFix::from(msg);
        assert!(fix.rssi.is_empty());
        assert!(fix.discovered.is_empty());
        assert_eq!(fix.strongest_rssi(), None);
    }

    #[test]
    fn test_strongest_rssi() {
        let msg: PositionMessage = serde_json::from_str(SAMPLE).unwrap();
        let fix = TagFix::from(msg);
        assert_eq!(fix.strongest_rssi(), Some(-57.0));
    }
}
