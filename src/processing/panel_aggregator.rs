//! Panel power aggregation per tumbling window
//!
//! One accumulator is shared by every reading in a window. It tracks a
//! single running power sum and, per location, the distinct panels seen.
//! The emitted summary reports only the first location observed in the
//! window; panel sets of other locations are kept but not reported.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use crate::models::validation::{require_present, scalar_identifier};
use crate::models::{PanelReading, PanelSummary, ValidationResult};
use crate::window::Aggregator;

/// Location captured from the first reading of a window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationInfo {
    pub location_id: Option<Value>,
    pub location_name: Option<Value>,
}

/// Accumulator owned by one window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelWindowState {
    pub power_output_sum: f64,
    pub location_info: Option<LocationInfo>,
    pub panel_ids_by_location: HashMap<String, HashSet<String>>,
}

impl PanelWindowState {
    /// Distinct panels recorded for `location`
    pub fn panel_count(&self, location: &str) -> usize {
        self.panel_ids_by_location
            .get(location)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    fn has_panels(&self) -> bool {
        self.panel_ids_by_location.values().any(|panels| !panels.is_empty())
    }
}

/// Domain aggregator producing average power per panel
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelAggregator;

impl PanelAggregator {
    pub fn new() -> Self {
        Self
    }
}

/// Panel ids are compared by their JSON rendering, strings by content
fn panel_key(panel_id: &Value) -> String {
    match panel_id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn attribution(reading: &PanelReading) -> ValidationResult<(String, String)> {
    let location = scalar_identifier(reading.location_id.as_ref(), "location_id")?;
    let panel = require_present(reading.panel_id.as_ref(), "panel_id")?;
    Ok((location, panel_key(panel)))
}

impl Aggregator for PanelAggregator {
    type Input = PanelReading;
    type State = PanelWindowState;
    type Output = PanelSummary;

    fn initialize(&self) -> PanelWindowState {
        PanelWindowState::default()
    }

    fn accumulate(
        &self,
        mut state: PanelWindowState,
        reading: &PanelReading,
        _event_time: i64,
    ) -> PanelWindowState {
        if state.location_info.is_none() {
            state.location_info = Some(LocationInfo {
                location_id: reading.location_id.clone(),
                location_name: reading.location_name.clone(),
            });
        }

        // Power counts even when the reading cannot be attributed to a panel.
        state.power_output_sum += reading.power_output;

        match attribution(reading) {
            Ok((location, panel)) => {
                state
                    .panel_ids_by_location
                    .entry(location)
                    .or_default()
                    .insert(panel);
            },
            Err(e) => {
                warn!(
                    error = %e,
                    panel_id = ?reading.panel_id,
                    location_id = ?reading.location_id,
                    "Skipping panel attribution for reading"
                );
            },
        }

        state
    }

    fn finalize(&self, state: &PanelWindowState) -> Option<PanelSummary> {
        if !state.has_panels() {
            return None;
        }

        let info = state.location_info.clone().unwrap_or_default();
        let panel_count = scalar_identifier(info.location_id.as_ref(), "location_id")
            .map(|location| state.panel_count(&location))
            .unwrap_or(0);

        let avg_power_per_panel = if panel_count > 0 {
            state.power_output_sum / panel_count as f64
        } else {
            0.0
        };

        Some(PanelSummary {
            location_id: info.location_id,
            location_name: info.location_name,
            avg_power_per_panel,
            panel_count,
            timestamp: Utc::now().timestamp_millis(),
        })
    }
}
