//! Message ingestion handler.
//!
//! Turns one inbound publish into at most one stored row:
//!
//! 1. Decode the payload as UTF-8, then as a JSON object
//! 2. Extract `temperature`, `pressure` and `air_quality`
//! 3. Reject the message unless all three are present and non-null
//! 4. Hand the reading to the [`ReadingSink`]
//!
//! Any failure drops the message after a diagnostic. Nothing is retried and
//! no error escapes [`Ingestor::on_message`] into the dispatch loop.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{DecodeError, IngestError, ValidationError};
use crate::models::{RawSensorPayload, SensorReading};
use crate::storage::ReadingSink;

// ---

/// Per-process message counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    /// Publishes handed to the ingestor
    pub received: u64,
    /// Rows written
    pub inserted: u64,
    /// Dropped: not UTF-8, not JSON, or not an object
    pub decode_errors: u64,
    /// Dropped: missing, null or non-numeric field
    pub validation_errors: u64,
    /// Dropped: insert failed
    pub storage_errors: u64,
}

/// Owns the storage sink and processes messages one at a time.
pub struct Ingestor<S: ReadingSink> {
    sink: S,
    stats: IngestStats,
}

impl<S: ReadingSink> Ingestor<S> {
    // ---
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Handle one inbound publish.
    ///
    /// Returns the inserted row id, or the reason the message was dropped.
    /// The diagnostic has already been emitted either way, so callers are
    /// free to ignore the result.
    pub async fn on_message(&mut self, topic: &str, payload: &[u8]) -> Result<i64, IngestError> {
        // ---
        self.stats.received += 1;
        debug!("Received message on topic: {} ({} bytes)", topic, payload.len());

        let result = self.ingest(payload).await;

        match &result {
            Ok(_) => {
                self.stats.inserted += 1;
            }
            Err(e) => {
                match e {
                    IngestError::Decode(_) => self.stats.decode_errors += 1,
                    IngestError::Validation(_) => self.stats.validation_errors += 1,
                    IngestError::Storage(_) => self.stats.storage_errors += 1,
                }
                report_drop(topic, e);
            }
        }

        result
    }

    async fn ingest(&mut self, payload: &[u8]) -> Result<i64, IngestError> {
        // ---
        let reading = parse_reading(payload)?;
        debug!(
            "Parsed -> temperature: {}, pressure: {}, air_quality: {}",
            reading.temperature, reading.pressure, reading.air_quality
        );

        let id = self.sink.insert(&reading).await?;
        info!(
            "Data inserted: id={} temperature={} pressure={} air_quality={}",
            id, reading.temperature, reading.pressure, reading.air_quality
        );
        Ok(id)
    }
}

/// Emit the diagnostic for a dropped message.
fn report_drop(topic: &str, e: &IngestError) {
    // ---
    match e {
        IngestError::Storage(_) => {
            error!(kind = e.kind(), topic, "Dropping message: {}", e)
        }
        IngestError::Decode(_) | IngestError::Validation(_) => {
            warn!(kind = e.kind(), topic, "Dropping message: {}", e)
        }
    }
}

/// Decode and validate a raw payload into a complete reading.
pub fn parse_reading(payload: &[u8]) -> Result<SensorReading, IngestError> {
    // ---
    let text = std::str::from_utf8(payload).map_err(DecodeError::from)?;
    let value: Value = serde_json::from_str(text).map_err(DecodeError::from)?;

    if !value.is_object() {
        return Err(DecodeError::NotAnObject(text.to_string()).into());
    }

    let raw: RawSensorPayload =
        serde_json::from_value(value).map_err(|e| ValidationError::InvalidField {
            reason: e.to_string(),
            payload: text.to_string(),
        })?;

    raw.to_reading(text).map_err(IngestError::from)
}
