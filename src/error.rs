//! Error taxonomy for the ingestion pipeline.
//!
//! Only [`ConnectionError`] is allowed to end the process, and only during
//! startup. Everything under [`IngestError`] is scoped to a single message:
//! the handler logs it and moves on to the next publish.

use thiserror::Error;

// ---

/// The broker could not be reached or refused the session at startup.
#[derive(Debug, Error)]
pub enum ConnectionError {
    // ---
    #[error("invalid broker address '{host}:{port}'")]
    InvalidAddress { host: String, port: u16 },

    #[error("broker refused connection: {0:?}")]
    Refused(rumqttc::ConnectReturnCode),

    #[error("broker unreachable: {0}")]
    Unreachable(#[from] rumqttc::ConnectionError),
}

/// The payload could not be decoded into a JSON object.
#[derive(Debug, Error)]
pub enum DecodeError {
    // ---
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object: {0}")]
    NotAnObject(String),
}

/// The payload decoded but does not describe a complete reading.
#[derive(Debug, Error)]
pub enum ValidationError {
    // ---
    #[error("incomplete payload, missing {missing:?}: {payload}")]
    Incomplete {
        missing: Vec<&'static str>,
        payload: String,
    },

    #[error("non-numeric field in payload ({reason}): {payload}")]
    InvalidField { reason: String, payload: String },
}

/// The insert was rejected or the database connection is gone.
#[derive(Debug, Error)]
#[error("insert failed: {0}")]
pub struct StorageError(#[from] pub sqlx::Error);

/// Why a single inbound message was dropped.
#[derive(Debug, Error)]
pub enum IngestError {
    // ---
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IngestError {
    // ---
    /// Stable label used in diagnostics and drop counters.
    pub fn kind(&self) -> &'static str {
        // ---
        match self {
            IngestError::Decode(_) => "decode",
            IngestError::Validation(_) => "validation",
            IngestError::Storage(_) => "storage",
        }
    }
}
