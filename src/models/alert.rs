//! Hazard decisions produced by the danger detector

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of evaluating one enriched observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDecision {
    /// Timestamp copied from the enriched observation
    pub timestamp: String,

    pub danger_detected: bool,

    /// Observed panel temperature in degrees Celsius
    pub panel_temperature: f64,

    pub panel_id: Option<Value>,

    /// Forecast air temperature in degrees Celsius
    pub forecast_temperature: f64,
}
