//! Library gateway for the `sensorflow-ingest` service.
//!
//! The service subscribes to the `iot/sensor/data` MQTT topic, validates each
//! JSON sensor sample and appends complete readings to the PostgreSQL
//! `sensor_readings` table, one row per message.
//!
//! This module follows the Explicit Module Boundary Pattern (EMBP): sibling
//! modules stay private and only the types re-exported here form the public
//! surface used by `main.rs` and the integration tests.

mod broker;
mod config;
mod error;
mod ingest;
mod models;
mod schema;
mod storage;
mod telemetry;

pub use broker::{mqtt_options, Link, LinkState, Session, Step};
pub use config::{load_from_env, load_with, BrokerConfig, Config, Credentials, SENSOR_TOPIC};
pub use error::{ConnectionError, DecodeError, IngestError, StorageError, ValidationError};
pub use ingest::{parse_reading, IngestStats, Ingestor};
pub use models::{RawSensorPayload, SensorReading};
pub use schema::ensure_schema;
pub use storage::{PgStore, ReadingSink};
pub use telemetry::{init_tracing, LogSettings};
