//! Panel telemetry readings
//!
//! A `PanelReading` is the typed form of one telemetry message. It is built
//! once from the untyped envelope and never mutated afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ValidationError, ValidationErrorKind, ValidationResult};
use super::validation::{parse_event_time, parse_f64_or};

/// Default substituted for numeric fields that are absent or unparsable
pub const NUMERIC_DEFAULT: f64 = 0.0;

/// One normalized reading from a single solar panel
///
/// Identity fields are carried through untyped, exactly as received.
/// Numeric fields are always present after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelReading {
    #[serde(default)]
    pub panel_id: Option<Value>,

    #[serde(default)]
    pub location_id: Option<Value>,

    #[serde(default)]
    pub location_name: Option<Value>,

    #[serde(default)]
    pub latitude: Option<Value>,

    #[serde(default)]
    pub longitude: Option<Value>,

    #[serde(default)]
    pub timezone: Option<Value>,

    /// Power output in watts
    #[serde(default)]
    pub power_output: f64,

    /// Panel temperature in degrees Celsius
    #[serde(default)]
    pub temperature: f64,

    #[serde(default)]
    pub irradiance: f64,

    #[serde(default)]
    pub voltage: f64,

    #[serde(default)]
    pub current: f64,

    /// Event time in nanoseconds since the Unix epoch
    #[serde(rename = "timestamp")]
    pub event_time: i64,
}

impl PanelReading {
    /// Build a reading from a telemetry envelope `{data: {...}, timestamp}`
    ///
    /// Fails only when the envelope has no usable `data` object. Individual
    /// numeric fields fall back to [`NUMERIC_DEFAULT`], and the event time
    /// falls back to `now` (nanoseconds).
    pub fn from_telemetry(message: &Value, now: i64) -> ValidationResult<Self> {
        let envelope = message
            .as_object()
            .ok_or_else(|| ValidationError::new(ValidationErrorKind::NotAnObject, "message"))?;

        let data = telemetry_data(envelope)?;
        let number = |field: &str| parse_f64_or(data.get(field), NUMERIC_DEFAULT);
        let identity = |field: &str| data.get(field).filter(|v| !v.is_null()).cloned();

        Ok(Self {
            panel_id: identity("panel_id"),
            location_id: identity("location_id"),
            location_name: identity("location_name"),
            latitude: identity("latitude"),
            longitude: identity("longitude"),
            timezone: identity("timezone"),
            power_output: number("power_output"),
            temperature: number("temperature"),
            irradiance: number("irradiance"),
            voltage: number("voltage"),
            current: number("current"),
            event_time: parse_event_time(envelope.get("timestamp"), now),
        })
    }
}

fn telemetry_data(envelope: &Map<String, Value>) -> ValidationResult<&Map<String, Value>> {
    match envelope.get("data") {
        None | Some(Value::Null) => Err(ValidationError::new(
            ValidationErrorKind::MissingData,
            "data",
        )),
        Some(Value::Object(data)) if data.is_empty() => Err(ValidationError::new(
            ValidationErrorKind::MissingData,
            "data",
        )),
        Some(Value::Object(data)) => Ok(data),
        Some(other) => Err(ValidationError::with_context(
            ValidationErrorKind::NotAnObject,
            "data",
            format!("expected object, got {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn telemetry() -> Value {
        json!({
            "data": {
                "panel_id": "panel-7",
                "location_id": "loc-1",
                "location_name": "Rooftop",
                "latitude": 52.52,
                "longitude": 13.40,
                "timezone": 1,
                "power_output": 250.5,
                "temperature": "31.2",
                "irradiance": 800,
                "voltage": "not a number",
                "current": null
            },
            "timestamp": 1_700_000_000_000_000_000_i64
        })
    }

    #[test]
    fn test_from_telemetry_coerces_fields() {
        let reading = PanelReading::from_telemetry(&telemetry(), 5).unwrap();

        assert_eq!(reading.panel_id, Some(json!("panel-7")));
        assert_eq!(reading.location_id, Some(json!("loc-1")));
        assert_eq!(reading.latitude, Some(json!(52.52)));
        assert_eq!(reading.timezone, Some(json!(1)));
        assert_eq!(reading.power_output, 250.5);
        assert_eq!(reading.temperature, 31.2);
        assert_eq!(reading.irradiance, 800.0);
        assert_eq!(reading.voltage, 0.0);
        assert_eq!(reading.current, 0.0);
        assert_eq!(reading.event_time, 1_700_000_000_000_000_000);
    }

    #[test]
    fn test_missing_data_is_rejected() {
        let err = PanelReading::from_telemetry(&json!({"timestamp": 1}), 0).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MissingData);

        let err = PanelReading::from_telemetry(&json!({"data": {}}), 0).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MissingData);

        let err = PanelReading::from_telemetry(&json!({"data": "text"}), 0).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::NotAnObject);

        let err = PanelReading::from_telemetry(&json!([1, 2]), 0).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::NotAnObject);
    }

    #[test]
    fn test_missing_timestamp_uses_now() {
        let message = json!({"data": {"panel_id": "p1", "power_output": 1}});
        let reading = PanelReading::from_telemetry(&message, 1234).unwrap();
        assert_eq!(reading.event_time, 1234);
        assert_eq!(reading.location_id, None);
    }

    #[test]
    fn test_serializes_event_time_as_timestamp() {
        let reading = PanelReading::from_telemetry(&telemetry(), 0).unwrap();
        let value = serde_json::to_value(&reading).unwrap();

        assert_eq!(value["timestamp"], json!(1_700_000_000_000_000_000_i64));
        assert_eq!(value["panel_id"], json!("panel-7"));

        let back: PanelReading = serde_json::from_value(value).unwrap();
        assert_eq!(back, reading);
    }
}
