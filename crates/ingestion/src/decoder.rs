//! Wire decoding: bus payload -> TagFix

use bytes::Bytes;
use contracts::{ContractError, PositionMessage, TagFix};

/// Decode one bus payload into a fix.
///
/// # Errors
/// Malformed JSON or a payload missing required fields returns
/// [`ContractError::PayloadDecode`]; the caller drops the message.
pub fn decode_fix(payload: &Bytes) -> Result<TagFix, ContractError> {
    let message: PositionMessage = serde_json::from_slice(payload)
        .map_err(|e| ContractError::PayloadDecode(e.to_string()))?;
    Ok(TagFix::from(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_payload() {
        let payload = Bytes::from_static(
            br#"{
                "tag": { "mac": "t1" },
                "location": { "position": {
                    "x": 1.0, "y": 2.0, "z": 0.5,
                    "used_anchors": [{ "mac": "a1", "rssi": -61.5 }],
                    "unused_anchors": []
                } },
                "timestamp": 42000
            }"#,
        );

        let fix = decode_fix(&payload).unwrap();
        assert_eq!(fix.tag_id, "t1");
        assert_eq!(fix.rssi.get("a1"), Some(&-61.5));
        assert_eq!(fix.timestamp_ms, 42_000);
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let payload = Bytes::from_static(b"{ not json");
        assert!(matches!(
            decode_fix(&payload),
            Err(ContractError::PayloadDecode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_missing_position() {
        let payload = Bytes::from_static(br#"{ "tag": { "mac": "t1" }, "timestamp": 1 }"#);
        assert!(decode_fix(&payload).is_err());
    }
}
