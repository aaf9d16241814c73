//! Database schema management for `sensorflow-ingest`.
//!
//! Ensures the readings table exists before the broker session starts.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use sqlx::{Connection, PgConnection};

// ---

/// Create the `sensor_readings` table if it does not exist (idempotent).
///
/// `id` and `timestamp` are assigned by the server on insert. Safe to call on
/// every startup; no-op if the objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn ensure_schema(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    // ---
    let mut tx = conn.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_readings (
            id          BIGSERIAL        PRIMARY KEY,
            temperature DOUBLE PRECISION NOT NULL,
            pressure    DOUBLE PRECISION NOT NULL,
            air_quality DOUBLE PRECISION NOT NULL,
            "timestamp" TIMESTAMPTZ      NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_readings_timestamp
            ON sensor_readings ("timestamp");
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
