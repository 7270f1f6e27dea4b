// HTTP handlers and routing.

use axum::body::Bytes;
use axum::extract::State as AxumState;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::app::AppState;
use crate::constants::SERVICE_NAME;
use crate::pipeline::InboundEvent;
use crate::utils::monotonic_ms;
use crate::ws::{ws_handler, SensorDataMessage};

mod types;
pub use types::*;

pub const TRANSPORT: &str = "http";

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/data", get(get_data))
        .route("/api/ingest", post(post_ingest))
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}

async fn health(AxumState(app_state): AxumState<AppState>) -> impl IntoResponse {
    let snapshot = app_state.store.snapshot();
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        variant: app_state.variant.as_str(),
        last_update: snapshot.reading.map(|reading| reading.timestamp),
        message_count: snapshot.message_count,
        connected_clients: app_state.broadcaster.observer_count(),
        uptime_ms: monotonic_ms(app_state.start_instant),
        ingest: app_state.stats.snapshot(),
    })
}

async fn get_data(AxumState(app_state): AxumState<AppState>) -> impl IntoResponse {
    Json(SensorDataMessage::from_state(&app_state.store.snapshot()))
}

// Webhook transport: queues the raw body for the ingest task.
async fn post_ingest(
    AxumState(app_state): AxumState<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestAccepted>), (StatusCode, Json<serde_json::Value>)> {
    match app_state
        .ingest_tx
        .try_send(InboundEvent::message(TRANSPORT, body.to_vec()))
    {
        Ok(()) => Ok((StatusCode::ACCEPTED, Json(IngestAccepted { queued: true }))),
        Err(TrySendError::Full(_)) => {
            warn!("ingest queue full; http message dropped");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "ingest queue full" })),
            ))
        }
        Err(TrySendError::Closed(_)) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "ingest pipeline stopped" })),
        )),
    }
}
