// HTTP response types.

use serde::{Deserialize, Serialize};

use crate::stats::IngestStatsSnapshot;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub variant: &'static str,
    pub last_update: Option<String>,
    pub message_count: u64,
    pub connected_clients: usize,
    pub uptime_ms: u64,
    pub ingest: IngestStatsSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestAccepted {
    pub queued: bool,
}
