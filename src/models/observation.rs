//! Enriched observations: a reading joined with its location configuration

use chrono::{Local, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::configuration::ConfigRecord;
use super::reading::PanelReading;

/// A panel reading together with the configuration current at lookup time
///
/// `configuration` is `None` when no configuration has been seen yet for the
/// reading's location. On the wire that is rendered as an empty object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedObservation {
    /// Human readable local rendering of the reading's event time
    pub timestamp: String,

    pub data: PanelReading,

    #[serde(
        default,
        serialize_with = "serialize_configuration",
        deserialize_with = "deserialize_configuration"
    )]
    pub configuration: Option<ConfigRecord>,
}

/// Render nanoseconds since the epoch as local `YYYY-MM-DD HH:MM:SS[.ffffff]`
pub fn render_local_timestamp(nanos: i64) -> String {
    let dt = Local.timestamp_nanos(nanos);
    if nanos.rem_euclid(1_000_000_000) / 1_000 == 0 {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

fn serialize_configuration<S>(
    configuration: &Option<ConfigRecord>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match configuration {
        Some(record) => record.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

fn deserialize_configuration<'de, D>(deserializer: D) -> Result<Option<ConfigRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(other) => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading() -> PanelReading {
        serde_json::from_value(json!({
            "panel_id": "p1",
            "location_id": "loc-1",
            "temperature": 30.0,
            "timestamp": 1_700_000_000_000_000_000_i64
        }))
        .unwrap()
    }

    #[test]
    fn test_missing_configuration_renders_empty_object() {
        let observation = EnrichedObservation {
            timestamp: "2023-11-14 22:13:20".to_string(),
            data: reading(),
            configuration: None,
        };

        let value = serde_json::to_value(&observation).unwrap();
        assert_eq!(value["configuration"], json!({}));

        let back: EnrichedObservation = serde_json::from_value(value).unwrap();
        assert_eq!(back.configuration, None);
    }

    #[test]
    fn test_configuration_round_trip() {
        let value = json!({
            "timestamp": "2023-11-14 22:13:20",
            "data": {"panel_id": "p1", "temperature": 26, "timestamp": 1},
            "configuration": {"location": "loc-1", "temperature": 28.0, "cloud_cover": 20.0}
        });

        let observation: EnrichedObservation = serde_json::from_value(value).unwrap();
        let config = observation.configuration.unwrap();
        assert_eq!(config.location, "loc-1");
        assert_eq!(config.forecast(), Some((28.0, 20.0)));
    }

    #[test]
    fn test_absent_configuration_field_is_none() {
        let observation: EnrichedObservation = serde_json::from_value(json!({
            "timestamp": "t",
            "data": {"timestamp": 1}
        }))
        .unwrap();
        assert!(observation.configuration.is_none());
    }

    #[test]
    fn test_render_local_timestamp() {
        let whole = 1_700_000_000_000_000_000_i64;
        assert_eq!(
            render_local_timestamp(whole),
            Local.timestamp_nanos(whole).format("%Y-%m-%d %H:%M:%S").to_string()
        );

        let fractional = whole + 123_456_000;
        let rendered = render_local_timestamp(fractional);
        assert!(rendered.ends_with(".123456"));
    }
}
