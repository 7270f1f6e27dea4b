// Ingest -> verify -> accept -> publish path for inbound sensor messages.
// Invariants: each message is processed to completion or rejected as a whole; rejections
// never touch the store and are only surfaced through logs and counters.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use soilwatch_core::envelope;
use soilwatch_core::error::IngestError;
use soilwatch_core::model::CountedState;
use soilwatch_core::verify::SensorCipher;

use crate::broadcast::Broadcaster;
use crate::constants::CIPHERTEXT_LOG_PREVIEW;
use crate::stats::IngestStats;
use crate::store::TelemetryStore;
use crate::utils::{now_epoch_ms, preview};

#[derive(Debug)]
pub enum InboundEvent {
    Message {
        transport: &'static str,
        payload: Vec<u8>,
        received_at_ms: u64,
    },
    TransportUnavailable {
        transport: &'static str,
        reason: String,
    },
    TransportRestored {
        transport: &'static str,
    },
}

impl InboundEvent {
    pub fn message(transport: &'static str, payload: Vec<u8>) -> Self {
        InboundEvent::Message {
            transport,
            payload,
            received_at_ms: now_epoch_ms(),
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    cipher: Arc<SensorCipher>,
    store: Arc<TelemetryStore>,
    broadcaster: Arc<Broadcaster>,
    stats: Arc<IngestStats>,
}

impl Pipeline {
    pub fn new(
        cipher: SensorCipher,
        store: Arc<TelemetryStore>,
        broadcaster: Arc<Broadcaster>,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self {
            cipher: Arc::new(cipher),
            store,
            broadcaster,
            stats,
        }
    }

    // May run concurrently; the broadcaster skips states older than an observer has seen.
    pub fn process(&self, payload: &[u8], received_at_ms: u64) -> Result<CountedState, IngestError> {
        self.stats.record_received();
        let result = self.verify_and_accept(payload, received_at_ms);
        match &result {
            Ok(_) => self.stats.record_accepted(),
            Err(err) => self.stats.record_rejected(err),
        }
        result
    }

    fn verify_and_accept(
        &self,
        payload: &[u8],
        received_at_ms: u64,
    ) -> Result<CountedState, IngestError> {
        let envelope = envelope::ingest(payload)?;
        debug!(
            encrypted = %preview(&envelope.encrypted_hex, CIPHERTEXT_LOG_PREVIEW),
            sensor = %envelope.sensor,
            "envelope decoded"
        );
        let reading = self.cipher.open(envelope, received_at_ms)?;
        let state = self.store.accept(reading);
        let report = self.broadcaster.publish(&state);
        info!(
            message_count = state.message_count,
            value = ?state.value(),
            delivered = report.delivered,
            dropped = report.dropped,
            skipped = report.skipped,
            "reading accepted"
        );
        Ok(state)
    }

    pub fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::Message {
                transport,
                payload,
                received_at_ms,
            } => {
                if let Err(err) = self.process(&payload, received_at_ms) {
                    warn!(transport, kind = err.kind(), %err, "message rejected");
                }
            }
            InboundEvent::TransportUnavailable { transport, reason } => {
                self.stats.set_transport_available(false);
                warn!(
                    transport,
                    %reason,
                    message_count = self.store.message_count(),
                    "transport unavailable; serving last known state"
                );
            }
            InboundEvent::TransportRestored { transport } => {
                self.stats.set_transport_available(true);
                info!(transport, "transport restored");
            }
        }
    }

    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }
}

pub async fn ingest_task(pipeline: Pipeline, mut rx: mpsc::Receiver<InboundEvent>) {
    while let Some(event) = rx.recv().await {
        pipeline.handle(event);
    }
    info!("ingest channel closed");
}

#[cfg(test)]
mod tests {
    use soilwatch_core::aead::{Key, Nonce, Variant};
    use soilwatch_core::model::ReadingWidth;

    use super::*;

    fn cipher() -> SensorCipher {
        SensorCipher::new(
            Key::new(Variant::Ascon128, b"asconciphertest1").unwrap(),
            Nonce::from_slice(b"asconcipher1test").unwrap(),
            b"ASCON".to_vec(),
            ReadingWidth::Flexible,
        )
    }

    fn pipeline() -> Pipeline {
        let store = Arc::new(TelemetryStore::new());
        let broadcaster = Arc::new(Broadcaster::new(store.clone(), 8));
        Pipeline::new(cipher(), store, broadcaster, Arc::new(IngestStats::default()))
    }

    #[test]
    fn rejected_messages_leave_state_untouched() {
        let pipeline = pipeline();
        let sealed = cipher().seal_envelope(42, "soil_moisture", "%").unwrap();
        pipeline.process(sealed.as_bytes(), 1).unwrap();

        for raw in [
            r#"{"data":"zz"}"#,
            r#"{"data":"abc"}"#,
            r#"{"data":"00ff"}"#,
            r#"{"sensor":"soil_moisture"}"#,
        ] {
            assert!(pipeline.process(raw.as_bytes(), 2).is_err());
        }

        let snapshot = pipeline.store.snapshot();
        assert_eq!(snapshot.message_count, 1);
        assert_eq!(snapshot.value(), Some(42));

        let stats = pipeline.stats().snapshot();
        assert_eq!(stats.received, 5);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected.invalid_hex_encoding, 2);
        assert_eq!(stats.rejected.authentication_failure, 1);
        assert_eq!(stats.rejected.malformed_envelope, 1);
    }

    #[test]
    fn transport_outage_keeps_last_state() {
        let pipeline = pipeline();
        let sealed = cipher().seal_envelope(7, "soil_moisture", "%").unwrap();
        pipeline.handle(InboundEvent::message("udp", sealed.into_bytes()));
        pipeline.handle(InboundEvent::TransportUnavailable {
            transport: "udp",
            reason: "socket closed".to_string(),
        });

        assert!(!pipeline.stats().snapshot().transport_available);
        assert_eq!(pipeline.store.snapshot().value(), Some(7));

        pipeline.handle(InboundEvent::TransportRestored { transport: "udp" });
        assert!(pipeline.stats().snapshot().transport_available);
    }
}
