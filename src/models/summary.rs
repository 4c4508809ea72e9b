//! Windowed panel power summaries

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Average power per panel for one location within one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSummary {
    pub location_id: Option<Value>,
    pub location_name: Option<Value>,
    pub avg_power_per_panel: f64,
    pub panel_count: usize,
    /// Processing time of the emission, milliseconds since the epoch
    pub timestamp: i64,
}

/// A summary stamped with the bounds of the window it describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedSummary {
    #[serde(flatten)]
    pub summary: PanelSummary,
    /// Inclusive window start, milliseconds since the epoch
    pub window_start: i64,
    /// Exclusive window end, milliseconds since the epoch
    pub window_end: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_windowed_summary_is_flat() {
        let windowed = WindowedSummary {
            summary: PanelSummary {
                location_id: Some(json!("L1")),
                location_name: Some(json!("Roof")),
                avg_power_per_panel: 100.0,
                panel_count: 3,
                timestamp: 1_700_000_000_000,
            },
            window_start: 1_699_999_980_000,
            window_end: 1_700_000_040_000,
        };

        assert_eq!(
            serde_json::to_value(&windowed).unwrap(),
            json!({
                "location_id": "L1",
                "location_name": "Roof",
                "avg_power_per_panel": 100.0,
                "panel_count": 3,
                "timestamp": 1_700_000_000_000_i64,
                "window_start": 1_699_999_980_000_i64,
                "window_end": 1_700_000_040_000_i64
            })
        );
    }
}
