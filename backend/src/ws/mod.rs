// WebSocket transport layer for observer fan-out.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State as AxumState;
use axum::response::IntoResponse;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use soilwatch_core::model::{CountedState, DecryptedReading};

use crate::app::AppState;
use crate::constants::SCHEMA_VERSION;
use crate::utils::now_epoch_ms;

#[derive(Serialize)]
pub struct HandshakeHello {
    pub schema_version: &'static str,
    pub timestamp_ms: u64,
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub server_version: &'static str,
    pub variant: &'static str,
    pub capabilities: Vec<&'static str>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorDataMessage {
    pub schema_version: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub timestamp_ms: u64,
    pub message_count: u64,
    pub reading: Option<DecryptedReading>,
}

impl SensorDataMessage {
    pub fn from_state(state: &CountedState) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            message_type: "sensor_data".to_string(),
            timestamp_ms: now_epoch_ms(),
            message_count: state.message_count,
            reading: state.reading.clone(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientCommand {
    RequestData,
}

fn parse_command(text: &str) -> Option<ClientCommand> {
    if text.trim() == "request_data" {
        return Some(ClientCommand::RequestData);
    }
    serde_json::from_str(text).ok()
}

pub async fn ws_handler(
    AxumState(app_state): AxumState<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(mut socket: WebSocket, app_state: AppState) {
    let hello = HandshakeHello {
        schema_version: SCHEMA_VERSION,
        timestamp_ms: now_epoch_ms(),
        message_type: "handshake_hello",
        server_version: env!("CARGO_PKG_VERSION"),
        variant: app_state.variant.as_str(),
        capabilities: vec!["sensor_data", "request_data"],
    };
    if let Ok(payload) = serde_json::to_string(&hello) {
        if socket.send(Message::Text(payload)).await.is_err() {
            return;
        }
    }

    // the first queued event is the current snapshot
    let mut subscription = app_state.broadcaster.subscribe();
    info!(
        observer = subscription.id(),
        observers = app_state.broadcaster.observer_count(),
        "ws connected"
    );

    loop {
        tokio::select! {
            outbound = subscription.recv() => {
                match outbound {
                    Some(state) => {
                        if send_state(&mut socket, &state).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        warn!(observer = subscription.id(), "observer dropped by broadcaster");
                        break;
                    }
                }
            }
            inbound = socket.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(ClientCommand::RequestData) = parse_command(&text) {
                            let snapshot = app_state.store.snapshot();
                            if send_state(&mut socket, &snapshot).await.is_err() {
                                break;
                            }
                            debug!(observer = subscription.id(), "sent snapshot on request");
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(?err, "ws error");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    let observer = subscription.id();
    drop(subscription);
    info!(
        observer,
        observers = app_state.broadcaster.observer_count(),
        "ws disconnected"
    );
}

async fn send_state(socket: &mut WebSocket, state: &CountedState) -> Result<(), axum::Error> {
    match serde_json::to_string(&SensorDataMessage::from_state(state)) {
        Ok(payload) => socket.send(Message::Text(payload)).await,
        Err(err) => {
            warn!(?err, "failed to encode sensor data");
            Ok(())
        }
    }
}
