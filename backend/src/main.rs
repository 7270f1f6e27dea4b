// Soil telemetry server: verifies Ascon-sealed readings and fans them out to observers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};

use soilwatch_server::app::AppState;
use soilwatch_server::broadcast::Broadcaster;
use soilwatch_server::config::ServerConfig;
use soilwatch_server::constants::UDP_REBIND_DELAY_MS;
use soilwatch_server::http;
use soilwatch_server::pipeline::{self, InboundEvent, Pipeline};
use soilwatch_server::stats::IngestStats;
use soilwatch_server::store::TelemetryStore;
use soilwatch_server::udp;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        variant = %config.variant,
        http_addr = %config.http_addr,
        udp_addr = %config.udp_addr,
        reading_width = ?config.reading_width,
        "configuration loaded"
    );
    warn!("static nonce configured; every message under this key reuses it");

    let store = Arc::new(TelemetryStore::new());
    let broadcaster = Arc::new(Broadcaster::new(store.clone(), config.observer_queue_cap));
    let stats = Arc::new(IngestStats::default());
    let (ingest_tx, ingest_rx) = mpsc::channel::<InboundEvent>(config.ingest_queue_cap);

    let pipeline = Pipeline::new(config.cipher(), store.clone(), broadcaster.clone(), stats.clone());
    tokio::spawn(pipeline::ingest_task(pipeline, ingest_rx));

    tokio::spawn(udp::udp_loop(
        config.udp_addr,
        ingest_tx.clone(),
        Duration::from_millis(UDP_REBIND_DELAY_MS),
    ));

    let app_state = AppState {
        store,
        broadcaster,
        stats,
        ingest_tx,
        variant: config.variant,
        start_instant: Instant::now(),
    };

    let app = http::router(app_state);

    info!(addr = %config.http_addr, "starting server");
    axum::Server::try_bind(&config.http_addr)?
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
