//! Windowed average power per panel

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::{forward_key, parse_payload};
use crate::config::WindowConfig;
use crate::kafka::{InboundMessage, MessageHandler, OutboundMessage, ProcessingResult};
use crate::models::{now_nanos, scalar_identifier, PanelReading, WindowedSummary};
use crate::processing::{normalize_telemetry_at, PanelAggregator};
use crate::window::{WindowEngine, WindowResult};

type PanelWindows = WindowEngine<PanelAggregator>;

enum Windows {
    /// One accumulator per window shared by every location
    Shared(PanelWindows),

    /// One engine per location id
    PerLocation {
        length: Duration,
        grace: Duration,
        engines: HashMap<String, PanelWindows>,
    },
}

impl Windows {
    fn process(
        &mut self,
        reading: &PanelReading,
        now: i64,
    ) -> Result<Option<WindowResult<crate::models::PanelSummary>>, String> {
        match self {
            Windows::Shared(engine) => Ok(engine.process(reading, reading.event_time, now)),
            Windows::PerLocation {
                length,
                grace,
                engines,
            } => {
                let location = scalar_identifier(reading.location_id.as_ref(), "location_id")
                    .map_err(|e| e.to_string())?;

                // Engines only evict on their own events; sweep the idle ones.
                for engine in engines.values_mut() {
                    engine.evict_expired(now);
                }
                engines.retain(|_, engine| !engine.is_empty());

                let engine = engines
                    .entry(location)
                    .or_insert_with(|| WindowEngine::new(PanelAggregator::new(), *length, *grace));
                Ok(engine.process(reading, reading.event_time, now))
            },
        }
    }

    fn open_windows(&self) -> usize {
        match self {
            Windows::Shared(engine) => engine.len(),
            Windows::PerLocation { engines, .. } => engines.values().map(WindowEngine::len).sum(),
        }
    }
}

/// Telemetry in, `WindowedSummary` out on every window update
pub struct AverageJob {
    input_topic: String,
    output_topic: String,
    windows: Mutex<Windows>,
}

impl AverageJob {
    pub fn new(
        input_topic: impl Into<String>,
        output_topic: impl Into<String>,
        window: &WindowConfig,
    ) -> Self {
        let windows = if window.per_location {
            Windows::PerLocation {
                length: window.length(),
                grace: window.grace(),
                engines: HashMap::new(),
            }
        } else {
            Windows::Shared(WindowEngine::new(
                PanelAggregator::new(),
                window.length(),
                window.grace(),
            ))
        };

        Self {
            input_topic: input_topic.into(),
            output_topic: output_topic.into(),
            windows: Mutex::new(windows),
        }
    }

    /// Handle a message with an explicit processing time (ns)
    pub fn handle_at(&self, message: &InboundMessage, now: i64) -> ProcessingResult {
        let payload = match parse_payload(self.name(), message) {
            Ok(payload) => payload,
            Err(dropped) => return dropped,
        };
        self.handle_value(&payload, forward_key(message), now)
    }

    fn handle_value(&self, payload: &Value, key: Option<String>, now: i64) -> ProcessingResult {
        let Some(reading) = normalize_telemetry_at(payload, now) else {
            return ProcessingResult::dropped("malformed telemetry");
        };

        let result = {
            let mut windows = self.windows.lock().unwrap_or_else(|p| p.into_inner());
            let result = windows.process(&reading, now);
            debug!(open_windows = windows.open_windows(), "Average windows updated");
            result
        };

        let window_result = match result {
            Ok(Some(window_result)) => window_result,
            Ok(None) => return ProcessingResult::dropped("no summary for window"),
            Err(reason) => {
                warn!(reason = %reason, "Reading cannot be assigned to a location window");
                return ProcessingResult::dropped(reason);
            },
        };

        let windowed = WindowedSummary {
            summary: window_result.value,
            window_start: window_result.window.start_millis(),
            window_end: window_result.window.end_millis(),
        };

        match OutboundMessage::json(self.output_topic.as_str(), key, &windowed) {
            Ok(out) => ProcessingResult::one(out),
            Err(e) => ProcessingResult::dropped(e.to_string()),
        }
    }
}

impl MessageHandler for AverageJob {
    fn name(&self) -> &str {
        "average"
    }

    fn topics(&self) -> Vec<String> {
        vec![self.input_topic.clone()]
    }

    fn handle(&self, message: &InboundMessage) -> ProcessingResult {
        self.handle_at(message, now_nanos())
    }
}
