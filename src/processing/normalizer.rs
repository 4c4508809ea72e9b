//! Record normalizer: untyped telemetry envelope to `PanelReading`

use serde_json::Value;
use tracing::warn;

use crate::models::{now_nanos, PanelReading};

/// Normalize a telemetry message using the current processing time
///
/// Malformed input is logged and dropped; this never fails loudly.
pub fn normalize_telemetry(message: &Value) -> Option<PanelReading> {
    normalize_telemetry_at(message, now_nanos())
}

/// Normalize a telemetry message with an explicit processing time (ns)
pub fn normalize_telemetry_at(message: &Value, now: i64) -> Option<PanelReading> {
    match PanelReading::from_telemetry(message, now) {
        Ok(reading) => Some(reading),
        Err(e) => {
            warn!(error = %e, "Dropping malformed telemetry message");
            None
        },
    }
}
