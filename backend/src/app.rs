// Application state shared by HTTP handlers, websocket sessions, and transports.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;

use soilwatch_core::aead::Variant;

use crate::broadcast::Broadcaster;
use crate::pipeline::InboundEvent;
use crate::stats::IngestStats;
use crate::store::TelemetryStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TelemetryStore>,
    pub broadcaster: Arc<Broadcaster>,
    pub stats: Arc<IngestStats>,
    pub ingest_tx: mpsc::Sender<InboundEvent>,
    pub variant: Variant,
    pub start_instant: Instant,
}
