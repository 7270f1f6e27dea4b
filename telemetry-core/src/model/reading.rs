// Verified sensor reading and plaintext decoding rules.
// Invariants: readings are only built from authenticated plaintext; values are big-endian.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use super::MoistureStatus;
use crate::error::IngestError;

const MAX_VALUE_BYTES: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedReading {
    pub value: u64,
    pub sensor: String,
    pub unit: String,
    /// Ciphertext as received, kept for audit and display.
    pub encrypted: String,
    /// Local wall-clock arrival time, `HH:MM:SS`.
    pub timestamp: String,
    pub received_at_ms: u64,
    /// Position in the accepted-message sequence; assigned by the state store.
    pub sequence: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MoistureStatus>,
}

impl DecryptedReading {
    pub fn new(value: u64, sensor: String, unit: String, encrypted: String, received_at_ms: u64) -> Self {
        let status = MoistureStatus::for_sensor(&sensor, value);
        Self {
            value,
            sensor,
            unit,
            encrypted,
            timestamp: clock_time(received_at_ms),
            received_at_ms,
            sequence: 0,
            status,
        }
    }
}

/// Expected plaintext width for the numeric reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadingWidth {
    /// Any width from one to eight bytes.
    #[default]
    Flexible,
    Exact(usize),
}

impl ReadingWidth {
    pub fn exact(width: usize) -> Result<Self, IngestError> {
        if width == 0 || width > MAX_VALUE_BYTES {
            return Err(IngestError::MalformedReading(format!(
                "reading width must be 1..={MAX_VALUE_BYTES} bytes, got {width}"
            )));
        }
        Ok(ReadingWidth::Exact(width))
    }

    pub fn decode(&self, plaintext: &[u8]) -> Result<u64, IngestError> {
        let allowed = match self {
            ReadingWidth::Flexible => (1..=MAX_VALUE_BYTES).contains(&plaintext.len()),
            ReadingWidth::Exact(width) => plaintext.len() == *width,
        };
        if !allowed {
            return Err(IngestError::MalformedReading(format!(
                "unexpected plaintext length {}",
                plaintext.len()
            )));
        }
        Ok(plaintext
            .iter()
            .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte)))
    }

    pub fn encode(&self, value: u64) -> Result<Vec<u8>, IngestError> {
        let bytes = value.to_be_bytes();
        let significant = (MAX_VALUE_BYTES - value.leading_zeros() as usize / 8).max(1);
        let width = match self {
            ReadingWidth::Exact(width) if significant > *width => {
                return Err(IngestError::MalformedReading(format!(
                    "value {value} does not fit in {width} bytes"
                )));
            }
            ReadingWidth::Exact(width) => *width,
            ReadingWidth::Flexible => significant,
        };
        Ok(bytes[MAX_VALUE_BYTES - width..].to_vec())
    }
}

fn clock_time(epoch_ms: u64) -> String {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(|millis| Local.timestamp_millis_opt(millis).single())
        .map(|time| time.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}
