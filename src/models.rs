//! Simple data models for the ingestion pipeline.

use serde::Deserialize;

use crate::error::ValidationError;

// ---

/// Sensor payload as published on the broker topic.
///
/// Every field is optional on the wire: a missing key and an explicit `null`
/// both deserialize to `None`.
#[derive(Debug, Default, Deserialize)]
pub struct RawSensorPayload {
    // ---
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub air_quality: Option<f64>,
}

/// A complete reading, ready to be appended to `sensor_readings`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    // ---
    pub temperature: f64,
    pub pressure: f64,
    pub air_quality: f64,
}

impl RawSensorPayload {
    // ---
    /// Names of the required fields that are absent or null.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        // ---
        let mut missing = Vec::new();
        if self.temperature.is_none() {
            missing.push("temperature");
        }
        if self.pressure.is_none() {
            missing.push("pressure");
        }
        if self.air_quality.is_none() {
            missing.push("air_quality");
        }
        missing
    }

    /// Promote the payload to a [`SensorReading`] if all three fields are present.
    ///
    /// `payload` is the decoded JSON text, carried into the error so the
    /// diagnostic can name the offending message.
    pub fn to_reading(&self, payload: &str) -> Result<SensorReading, ValidationError> {
        // ---
        match (self.temperature, self.pressure, self.air_quality) {
            (Some(temperature), Some(pressure), Some(air_quality)) => Ok(SensorReading {
                temperature,
                pressure,
                air_quality,
            }),
            _ => Err(ValidationError::Incomplete {
                missing: self.missing_fields(),
                payload: payload.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn parse(json: &str) -> RawSensorPayload {
        // ---
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_complete_payload() {
        // ---
        let json = r#"{"temperature": 22.5, "pressure": 101.3, "air_quality": 42}"#;
        let reading = parse(json).to_reading(json).unwrap();

        assert_eq!(reading.temperature, 22.5);
        assert_eq!(reading.pressure, 101.3);
        assert_eq!(reading.air_quality, 42.0);
    }

    #[test]
    fn test_null_counts_as_missing() {
        // ---
        let json = r#"{"temperature": 22.5, "pressure": null, "air_quality": 40}"#;
        let raw = parse(json);

        assert_eq!(raw.missing_fields(), vec!["pressure"]);
        assert!(raw.to_reading(json).is_err());
    }

    #[test]
    fn test_missing_keys_are_reported() {
        // ---
        let json = r#"{"temperature": 22.5}"#;
        match parse(json).to_reading(json) {
            Err(ValidationError::Incomplete { missing, payload }) => {
                assert_eq!(missing, vec!["pressure", "air_quality"]);
                assert_eq!(payload, json);
            }
            other => panic!("expected incomplete payload, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        // ---
        let json = r#"{"temperature": 1, "pressure": 2, "air_quality": 3, "device": "a1"}"#;
        let reading = parse(json).to_reading(json).unwrap();

        assert_eq!(
            reading,
            SensorReading {
                temperature: 1.0,
                pressure: 2.0,
                air_quality: 3.0
            }
        );
    }

    #[test]
    fn test_empty_object() {
        // ---
        let raw = parse("{}");
        assert_eq!(
            raw.missing_fields(),
            vec!["temperature", "pressure", "air_quality"]
        );
    }

    #[test]
    fn test_non_numeric_field_fails_deserialization() {
        // ---
        let result = serde_json::from_str::<RawSensorPayload>(r#"{"temperature": "hot"}"#);
        assert!(result.is_err());
    }
}
