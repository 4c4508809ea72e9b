//! Location configuration records (weather forecast and site context)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ValidationError, ValidationErrorKind, ValidationResult};
use super::validation::{lenient_f64, lenient_identifier};

/// Latest known configuration for one location
///
/// Only `location`, `temperature` and `cloud_cover` are interpreted; any
/// other fields are kept verbatim and forwarded with the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// Location key; numeric locations are stored in their string form
    #[serde(default, deserialize_with = "lenient_identifier")]
    pub location: String,

    /// Forecast air temperature in degrees Celsius
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Forecast cloud cover in percent
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigRecord {
    /// Parse a configuration message, requiring a non-empty `location`
    pub fn from_message(message: &Value) -> ValidationResult<Self> {
        if !message.is_object() {
            return Err(ValidationError::new(
                ValidationErrorKind::NotAnObject,
                "message",
            ));
        }

        let record: ConfigRecord = serde_json::from_value(message.clone()).map_err(|e| {
            ValidationError::with_context(
                ValidationErrorKind::Custom("malformed configuration".to_string()),
                "message",
                e.to_string(),
            )
        })?;

        if record.location.trim().is_empty() {
            return Err(ValidationError::new(
                ValidationErrorKind::MissingField,
                "location",
            ));
        }

        Ok(record)
    }

    /// Forecast values needed for hazard evaluation, if both are known
    pub fn forecast(&self) -> Option<(f64, f64)> {
        Some((self.temperature?, self.cloud_cover?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_message_keeps_extra_fields() {
        let record = ConfigRecord::from_message(&json!({
            "location": "loc-1",
            "temperature": 27.0,
            "cloud_cover": "35",
            "wind_speed": 4.2
        }))
        .unwrap();

        assert_eq!(record.location, "loc-1");
        assert_eq!(record.temperature, Some(27.0));
        assert_eq!(record.cloud_cover, Some(35.0));
        assert_eq!(record.extra.get("wind_speed"), Some(&json!(4.2)));
        assert_eq!(record.forecast(), Some((27.0, 35.0)));
    }

    #[test]
    fn test_from_message_requires_location() {
        let err = ConfigRecord::from_message(&json!({"temperature": 20})).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MissingField);
        assert_eq!(err.field, "location");

        let err = ConfigRecord::from_message(&json!("loc-1")).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::NotAnObject);
    }

    #[test]
    fn test_numeric_location_becomes_string_key() {
        let record = ConfigRecord::from_message(&json!({
            "location": 42,
            "temperature": 30,
            "cloud_cover": 10
        }))
        .unwrap();
        assert_eq!(record.location, "42");

        let err = ConfigRecord::from_message(&json!({"location": {"id": 1}})).unwrap_err();
        assert_eq!(
            err.kind,
            ValidationErrorKind::Custom("malformed configuration".to_string())
        );
    }

    #[test]
    fn test_forecast_requires_both_values() {
        let record = ConfigRecord::from_message(&json!({
            "location": "loc-1",
            "temperature": 30
        }))
        .unwrap();

        assert_eq!(record.cloud_cover, None);
        assert_eq!(record.forecast(), None);
    }

    #[test]
    fn test_serialization_preserves_shape() {
        let input = json!({"location": "A", "temperature": 30.0, "cloud_cover": 10.0, "source": "met"});
        let record = ConfigRecord::from_message(&input).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), input);
    }
}
