// Ingest counters for the health endpoint and logs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

use soilwatch_core::error::IngestError;

#[derive(Debug)]
pub struct IngestStats {
    received: AtomicU64,
    accepted: AtomicU64,
    malformed_envelope: AtomicU64,
    invalid_hex: AtomicU64,
    authentication_failure: AtomicU64,
    malformed_reading: AtomicU64,
    transport_available: AtomicBool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngestStatsSnapshot {
    pub received: u64,
    pub accepted: u64,
    pub rejected: RejectedCounts,
    pub transport_available: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RejectedCounts {
    pub malformed_envelope: u64,
    pub invalid_hex_encoding: u64,
    pub authentication_failure: u64,
    pub malformed_reading: u64,
}

impl Default for IngestStats {
    fn default() -> Self {
        Self {
            received: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            malformed_envelope: AtomicU64::new(0),
            invalid_hex: AtomicU64::new(0),
            authentication_failure: AtomicU64::new(0),
            malformed_reading: AtomicU64::new(0),
            transport_available: AtomicBool::new(true),
        }
    }
}

impl IngestStats {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self, err: &IngestError) {
        let counter = match err {
            IngestError::MalformedEnvelope(_) => &self.malformed_envelope,
            IngestError::InvalidHexEncoding(_) => &self.invalid_hex,
            IngestError::AuthenticationFailure => &self.authentication_failure,
            IngestError::MalformedReading(_) => &self.malformed_reading,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_transport_available(&self, available: bool) {
        self.transport_available.store(available, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: RejectedCounts {
                malformed_envelope: self.malformed_envelope.load(Ordering::Relaxed),
                invalid_hex_encoding: self.invalid_hex.load(Ordering::Relaxed),
                authentication_failure: self.authentication_failure.load(Ordering::Relaxed),
                malformed_reading: self.malformed_reading.load(Ordering::Relaxed),
            },
            transport_available: self.transport_available.load(Ordering::Relaxed),
        }
    }
}
