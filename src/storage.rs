//! Storage writer for validated readings.
//!
//! The ingestor only needs to append rows, so storage is reached through the
//! [`ReadingSink`] trait. [`PgStore`] is the production backend: one
//! long-lived PostgreSQL connection, one autocommitted insert per reading,
//! no pool and no retry.

use sqlx::{Connection, PgConnection};

use crate::error::StorageError;
use crate::models::SensorReading;
use crate::schema;

// ---

/// Append-only destination for sensor readings.
#[allow(async_fn_in_trait)]
pub trait ReadingSink {
    /// Append one reading and return its row id.
    ///
    /// Implementations must not retry; the caller decides what a failure
    /// means for the message.
    async fn insert(&mut self, reading: &SensorReading) -> Result<i64, StorageError>;
}

/// PostgreSQL-backed [`ReadingSink`].
pub struct PgStore {
    conn: PgConnection,
}

impl PgStore {
    // ---
    /// Open the single connection used for the life of the process.
    pub async fn connect(db_url: &str) -> Result<Self, StorageError> {
        // ---
        let conn = PgConnection::connect(db_url).await?;
        Ok(Self { conn })
    }

    /// Create the readings table if it is missing.
    pub async fn ensure_schema(&mut self) -> Result<(), StorageError> {
        // ---
        schema::ensure_schema(&mut self.conn).await?;
        Ok(())
    }
}

impl ReadingSink for PgStore {
    async fn insert(&mut self, reading: &SensorReading) -> Result<i64, StorageError> {
        // ---
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sensor_readings (temperature, pressure, air_quality)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(reading.temperature)
        .bind(reading.pressure)
        .bind(reading.air_quality)
        .fetch_one(&mut self.conn)
        .await?;

        Ok(id)
    }
}
