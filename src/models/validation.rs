//! Coercion and validation helpers for untyped telemetry
//!
//! Incoming messages are loosely typed JSON. The helpers here turn single
//! fields into typed values with an explicit fallback policy, so the
//! "substitute zero" and "substitute now" rules stay visible and testable.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::error::{ValidationError, ValidationErrorKind, ValidationResult};

/// Naive (offset-less) timestamp layouts accepted for ISO-8601 strings
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset-carrying layouts tried after RFC 3339
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

/// Best-effort conversion of a JSON value to `f64`
///
/// Numbers convert directly, strings are trimmed and parsed, booleans map to
/// 1.0/0.0. Everything else is not a number.
pub fn try_parse_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Parse a field as `f64`, substituting `default` when absent or unparsable
pub fn parse_f64_or(value: Option<&Value>, default: f64) -> f64 {
    value.and_then(try_parse_f64).unwrap_or(default)
}

/// Serde adapter for optional numeric fields that may arrive as strings
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(try_parse_f64))
}

/// Serde adapter for identifiers that may arrive as numbers
///
/// Strings are kept verbatim, numbers become their string form and a
/// missing or `null` value becomes empty. Other shapes are rejected.
pub fn lenient_identifier<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(other) => scalar_identifier(Some(&other), "identifier").map_err(serde::de::Error::custom),
    }
}

/// Current processing time in nanoseconds since the Unix epoch
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Parse an ISO-8601 timestamp string into nanoseconds since the epoch
///
/// Strings carrying an offset are honoured; naive strings are read as local
/// time.
pub fn parse_iso8601_nanos(input: &str) -> Option<i64> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return dt.timestamp_nanos_opt();
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return dt.timestamp_nanos_opt();
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return local_naive_to_nanos(naive);
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(local_naive_to_nanos)
}

fn local_naive_to_nanos(naive: NaiveDateTime) -> Option<i64> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .and_then(|dt| dt.timestamp_nanos_opt())
}

/// Resolve the event time of a telemetry message
///
/// Strings are parsed as ISO-8601, numbers pass through as nanoseconds. A
/// missing or unusable value falls back to `now`.
pub fn parse_event_time(value: Option<&Value>, now: i64) -> i64 {
    match value {
        Some(Value::String(s)) => parse_iso8601_nanos(s).unwrap_or_else(|| {
            tracing::debug!(timestamp = %s, "Unparsable timestamp, using processing time");
            now
        }),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|v| v as i64))
            .unwrap_or(now),
        _ => now,
    }
}

/// Validate that a field is present and not JSON `null`
pub fn require_present<'a>(value: Option<&'a Value>, field: &str) -> ValidationResult<&'a Value> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::new(
            ValidationErrorKind::MissingField,
            field,
        )),
        Some(v) => Ok(v),
    }
}

/// Normalise a scalar identifier to its trimmed string form
///
/// Accepts non-empty strings and numbers; anything else is rejected.
pub fn scalar_identifier(value: Option<&Value>, field: &str) -> ValidationResult<String> {
    let value = require_present(value, field)?;

    let normalized = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(ValidationError::with_context(
                ValidationErrorKind::InvalidIdentifier,
                field,
                format!("unsupported value: {}", other),
            ))
        },
    };

    if normalized.is_empty() {
        return Err(ValidationError::with_context(
            ValidationErrorKind::InvalidIdentifier,
            field,
            "blank identifier",
        ));
    }

    Ok(normalized)
}
