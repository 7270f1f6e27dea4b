// Wire envelope decoding for inbound sensor messages.
// Invariants: ciphertext content is not inspected here; only shape and hex encoding are validated.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IngestError;

pub const DEFAULT_SENSOR: &str = "soil_moisture";
pub const DEFAULT_UNIT: &str = "%";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CipherEnvelope {
    pub ciphertext: Vec<u8>,
    pub encrypted_hex: String,
    pub sensor: String,
    pub unit: String,
}

#[derive(Deserialize, Serialize)]
struct WireEnvelope {
    data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sensor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
}

pub fn ingest(raw: &[u8]) -> Result<CipherEnvelope, IngestError> {
    let value: Value = serde_json::from_slice(raw).map_err(malformed)?;
    // serde also maps a JSON array onto a struct positionally
    if !value.is_object() {
        return Err(IngestError::MalformedEnvelope(
            "envelope must be a JSON object".to_string(),
        ));
    }
    let wire: WireEnvelope = serde_json::from_value(value).map_err(malformed)?;
    let ciphertext =
        hex::decode(&wire.data).map_err(|err| IngestError::InvalidHexEncoding(err.to_string()))?;

    Ok(CipherEnvelope {
        ciphertext,
        encrypted_hex: wire.data,
        sensor: wire.sensor.unwrap_or_else(|| DEFAULT_SENSOR.to_string()),
        unit: wire.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string()),
    })
}

/// Renders the wire form of a sealed message, as a field device would publish it.
pub fn encode(ciphertext: &[u8], sensor: &str, unit: &str) -> Result<String, IngestError> {
    let wire = WireEnvelope {
        data: hex::encode(ciphertext),
        sensor: Some(sensor.to_string()),
        unit: Some(unit.to_string()),
    };
    serde_json::to_string(&wire).map_err(malformed)
}

fn malformed(err: serde_json::Error) -> IngestError {
    IngestError::MalformedEnvelope(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_envelope() {
        let envelope =
            ingest(br#"{"data":"00ff10","sensor":"soil_temp","unit":"C","extra":1}"#).unwrap();
        assert_eq!(envelope.ciphertext, vec![0x00, 0xFF, 0x10]);
        assert_eq!(envelope.encrypted_hex, "00ff10");
        assert_eq!(envelope.sensor, "soil_temp");
        assert_eq!(envelope.unit, "C");
    }

    #[test]
    fn metadata_defaults_when_absent() {
        let envelope = ingest(br#"{"data":"ABCD"}"#).unwrap();
        assert_eq!(envelope.ciphertext, vec![0xAB, 0xCD]);
        assert_eq!(envelope.sensor, DEFAULT_SENSOR);
        assert_eq!(envelope.unit, DEFAULT_UNIT);
    }

    #[test]
    fn non_hex_characters_are_rejected() {
        let err = ingest(br#"{"data":"zz"}"#).unwrap_err();
        assert!(matches!(err, IngestError::InvalidHexEncoding(_)));
    }

    #[test]
    fn odd_length_hex_is_rejected() {
        let err = ingest(br#"{"data":"abc"}"#).unwrap_err();
        assert!(matches!(err, IngestError::InvalidHexEncoding(_)));
    }

    #[test]
    fn shape_errors_are_malformed() {
        for raw in [
            &b"not json"[..],
            br#"["data"]"#,
            br#"["00ff", "soil_moisture", "%"]"#,
            br#""00ff""#,
            br#"null"#,
            br#"{"sensor":"soil_moisture"}"#,
            br#"{"data":1234}"#,
            br#"{"data":"00ff","unit":5}"#,
        ] {
            let err = ingest(raw).unwrap_err();
            assert!(matches!(err, IngestError::MalformedEnvelope(_)), "{err}");
        }
    }

    #[test]
    fn encoded_envelope_is_accepted_back() {
        let raw = encode(&[0xDE, 0xAD], "soil_moisture", "%").unwrap();
        let envelope = ingest(raw.as_bytes()).unwrap();
        assert_eq!(envelope.ciphertext, vec![0xDE, 0xAD]);
        assert_eq!(envelope.encrypted_hex, "dead");
    }
}
