//! Rule-based danger detection over enriched observations
//!
//! A panel is flagged when it is already hot and the forecast is both hot
//! and clear. The thresholds are fixed.

use tracing::debug;

use crate::models::{AlertDecision, EnrichedObservation};

/// Panel temperature must exceed this (degrees Celsius)
pub const PANEL_TEMPERATURE_LIMIT: f64 = 25.0;

/// Forecast temperature must exceed this (degrees Celsius)
pub const FORECAST_TEMPERATURE_LIMIT: f64 = 26.5;

/// Forecast cloud cover must stay below this (percent)
pub const CLOUD_COVER_LIMIT: f64 = 50.0;

/// The hazard rule itself
pub fn is_dangerous(panel_temperature: f64, forecast_temperature: f64, cloud_cover: f64) -> bool {
    panel_temperature > PANEL_TEMPERATURE_LIMIT
        && forecast_temperature > FORECAST_TEMPERATURE_LIMIT
        && cloud_cover < CLOUD_COVER_LIMIT
}

/// Evaluate one observation
///
/// Returns `None` when the location has no usable forecast yet. Otherwise
/// the decision is always present, flagged or not.
pub fn evaluate(observation: &EnrichedObservation) -> Option<AlertDecision> {
    let Some((forecast_temperature, cloud_cover)) = observation
        .configuration
        .as_ref()
        .and_then(|config| config.forecast())
    else {
        debug!(
            location_id = ?observation.data.location_id,
            "Forecast not available, skipping danger evaluation"
        );
        return None;
    };

    let panel_temperature = observation.data.temperature;

    Some(AlertDecision {
        timestamp: observation.timestamp.clone(),
        danger_detected: is_dangerous(panel_temperature, forecast_temperature, cloud_cover),
        panel_temperature,
        panel_id: observation.data.panel_id.clone(),
        forecast_temperature,
    })
}
