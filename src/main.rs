//! Application entry point for the `sensorflow-ingest` service.
//!
//! This binary orchestrates the full startup sequence for the MQTT ingestion
//! pipeline, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening the single PostgreSQL connection used for all inserts
//! - Creating the `sensor_readings` table if it does not exist
//! - Connecting to the MQTT broker and subscribing to `iot/sensor/data`
//! - Running the dispatch loop until the process is terminated
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – PostgreSQL connection string
//! - `MQTT_*` (optional) – broker settings, see `config.rs`
//! - `INGEST_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `INGEST_SPAN_EVENTS` (optional) – span event mode for tracing
//! - `FORCE_COLOR` (optional) – force ANSI colors on or off
//!
//! Any failure before the dispatch loop starts (bad configuration, database
//! or broker unreachable) exits the process with a non-zero status. Once
//! running, per-message failures are logged and never stop the loop.
use dotenvy::dotenv;

use anyhow::Result;

use sensorflow_ingest::{init_tracing, Ingestor, PgStore, Session};

// ---

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = sensorflow_ingest::load_from_env()?;
    cfg.log_config();

    tracing::info!("Attempting to connect to database");

    let mut store = PgStore::connect(&cfg.db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    tracing::info!("Successfully connected to database");

    store.ensure_schema().await?;

    let session = Session::connect(&cfg.broker).await?;
    let mut ingestor = Ingestor::new(store);

    tracing::info!("Ingesting readings from {}", sensorflow_ingest::SENSOR_TOPIC);
    session.run(&mut ingestor).await;

    Ok(())
}
