use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use soilwatch_core::aead::Variant;
use soilwatch_server::app::AppState;
use soilwatch_server::broadcast::Broadcaster;
use soilwatch_server::config::ServerConfig;
use soilwatch_server::http::router;
use soilwatch_server::pipeline::{InboundEvent, Pipeline};
use soilwatch_server::stats::IngestStats;
use soilwatch_server::store::TelemetryStore;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve() -> (String, Pipeline, mpsc::Receiver<InboundEvent>) {
    let config = ServerConfig::from_lookup(|_| None).unwrap();
    let store = Arc::new(TelemetryStore::new());
    let broadcaster = Arc::new(Broadcaster::new(store.clone(), 8));
    let stats = Arc::new(IngestStats::default());
    let (ingest_tx, ingest_rx) = mpsc::channel(4);
    let pipeline = Pipeline::new(config.cipher(), store.clone(), broadcaster.clone(), stats.clone());
    let state = AppState {
        store,
        broadcaster,
        stats,
        ingest_tx,
        variant: Variant::Ascon128,
        start_instant: Instant::now(),
    };

    let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap())
        .serve(router(state).into_make_service());
    let url = format!("ws://{}/ws", server.local_addr());
    tokio::spawn(server);
    (url, pipeline, ingest_rx)
}

fn sealed(config: &ServerConfig, value: u64) -> Vec<u8> {
    config
        .cipher()
        .seal_envelope(value, "soil_moisture", "%")
        .unwrap()
        .into_bytes()
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn session_sends_hello_then_snapshot_then_answers_request_data() {
    let (url, pipeline, _rx) = serve().await;
    let config = ServerConfig::from_lookup(|_| None).unwrap();
    pipeline.process(&sealed(&config, 61), 0).unwrap();

    let (mut client, _) = connect_async(url.as_str()).await.unwrap();

    let hello = next_json(&mut client).await;
    assert_eq!(hello["type"], "handshake_hello");
    assert_eq!(hello["variant"], "Ascon-128");

    let snapshot = next_json(&mut client).await;
    assert_eq!(snapshot["type"], "sensor_data");
    assert_eq!(snapshot["message_count"], 1);
    assert_eq!(snapshot["reading"]["value"], 61);

    client
        .send(Message::Text("request_data".to_string()))
        .await
        .unwrap();
    let reply = next_json(&mut client).await;
    assert_eq!(reply["type"], "sensor_data");
    assert_eq!(reply["message_count"], 1);
    assert_eq!(reply["reading"]["status"], "optimal");
}

#[tokio::test]
async fn connected_observer_receives_live_readings() {
    let (url, pipeline, _rx) = serve().await;
    let config = ServerConfig::from_lookup(|_| None).unwrap();

    let (mut client, _) = connect_async(url.as_str()).await.unwrap();
    assert_eq!(next_json(&mut client).await["type"], "handshake_hello");
    let empty = next_json(&mut client).await;
    assert_eq!(empty["message_count"], 0);
    assert!(empty["reading"].is_null());

    pipeline.process(&sealed(&config, 18), 0).unwrap();
    let live = next_json(&mut client).await;
    assert_eq!(live["message_count"], 1);
    assert_eq!(live["reading"]["value"], 18);
    assert_eq!(live["reading"]["status"], "critical");
}
