//! Danger alerts over the enriched stream

use tracing::{info, warn};

use super::{forward_key, parse_payload};
use crate::kafka::{InboundMessage, MessageHandler, OutboundMessage, ProcessingResult};
use crate::models::EnrichedObservation;
use crate::processing::danger;

/// Enriched observations in, flagged `AlertDecision`s out
pub struct DangerJob {
    input_topic: String,
    output_topic: String,
}

impl DangerJob {
    pub fn new(input_topic: impl Into<String>, output_topic: impl Into<String>) -> Self {
        Self {
            input_topic: input_topic.into(),
            output_topic: output_topic.into(),
        }
    }
}

impl MessageHandler for DangerJob {
    fn name(&self) -> &str {
        "danger"
    }

    fn topics(&self) -> Vec<String> {
        vec![self.input_topic.clone()]
    }

    fn handle(&self, message: &InboundMessage) -> ProcessingResult {
        let payload = match parse_payload(self.name(), message) {
            Ok(payload) => payload,
            Err(dropped) => return dropped,
        };

        let observation: EnrichedObservation = match serde_json::from_value(payload) {
            Ok(observation) => observation,
            Err(e) => {
                warn!(error = %e, offset = message.offset, "Dropping malformed enriched observation");
                return ProcessingResult::dropped(e.to_string());
            },
        };

        let Some(decision) = danger::evaluate(&observation) else {
            return ProcessingResult::dropped("forecast not available");
        };

        if !decision.danger_detected {
            return ProcessingResult::none();
        }

        info!(
            panel_id = ?decision.panel_id,
            panel_temperature = decision.panel_temperature,
            forecast_temperature = decision.forecast_temperature,
            "Danger detected"
        );

        match OutboundMessage::json(self.output_topic.as_str(), forward_key(message), &decision) {
            Ok(out) => ProcessingResult::one(out),
            Err(e) => ProcessingResult::dropped(e.to_string()),
        }
    }
}
