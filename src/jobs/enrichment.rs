//! Configuration ingest and telemetry enrichment
//!
//! Both jobs hold the same [`ConfigCache`]: ingest writes it, enrichment
//! reads it.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{forward_key, parse_payload};
use crate::kafka::{InboundMessage, MessageHandler, OutboundMessage, ProcessingResult};
use crate::models::{now_nanos, ConfigRecord};
use crate::processing::{normalize_telemetry_at, ConfigCache, EnrichmentJoin};

/// Keeps the latest configuration per location
pub struct ConfigIngestJob {
    input_topic: String,
    cache: Arc<ConfigCache>,
}

impl ConfigIngestJob {
    pub fn new(input_topic: impl Into<String>, cache: Arc<ConfigCache>) -> Self {
        Self {
            input_topic: input_topic.into(),
            cache,
        }
    }
}

impl MessageHandler for ConfigIngestJob {
    fn name(&self) -> &str {
        "config-ingest"
    }

    fn topics(&self) -> Vec<String> {
        vec![self.input_topic.clone()]
    }

    fn handle(&self, message: &InboundMessage) -> ProcessingResult {
        let payload = match parse_payload(self.name(), message) {
            Ok(payload) => payload,
            Err(dropped) => return dropped,
        };

        match ConfigRecord::from_message(&payload) {
            Ok(record) => {
                let location = record.location.trim().to_string();
                debug!(location = %location, "Configuration updated");
                self.cache.upsert(location, record);
                ProcessingResult::none()
            },
            Err(e) => {
                warn!(error = %e, offset = message.offset, "Dropping configuration message");
                ProcessingResult::dropped(e.to_string())
            },
        }
    }
}

/// Telemetry in, `EnrichedObservation` out
pub struct EnrichmentJob {
    input_topic: String,
    output_topic: String,
    join: EnrichmentJoin,
}

impl EnrichmentJob {
    pub fn new(
        input_topic: impl Into<String>,
        output_topic: impl Into<String>,
        cache: Arc<ConfigCache>,
    ) -> Self {
        Self {
            input_topic: input_topic.into(),
            output_topic: output_topic.into(),
            join: EnrichmentJoin::new(cache),
        }
    }

    /// Handle a message with an explicit processing time (ns)
    pub fn handle_at(&self, message: &InboundMessage, now: i64) -> ProcessingResult {
        let payload = match parse_payload(self.name(), message) {
            Ok(payload) => payload,
            Err(dropped) => return dropped,
        };

        let Some(reading) = normalize_telemetry_at(&payload, now) else {
            return ProcessingResult::dropped("malformed telemetry");
        };

        let observation = self.join.enrich(reading);
        match OutboundMessage::json(self.output_topic.as_str(), forward_key(message), &observation) {
            Ok(out) => ProcessingResult::one(out),
            Err(e) => ProcessingResult::dropped(e.to_string()),
        }
    }
}

impl MessageHandler for EnrichmentJob {
    fn name(&self) -> &str {
        "enrichment"
    }

    fn topics(&self) -> Vec<String> {
        vec![self.input_topic.clone()]
    }

    fn handle(&self, message: &InboundMessage) -> ProcessingResult {
        self.handle_at(message, now_nanos())
    }
}
