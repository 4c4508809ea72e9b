//! Stream jobs
//!
//! Each job is a [`MessageHandler`](crate::kafka::MessageHandler) that wires
//! the streaming core to its input and output topics. One
//! [`JobConsumer`](crate::kafka::JobConsumer) drives each job under its own
//! consumer group.

pub mod average;
pub mod danger;
pub mod enrichment;

pub use average::AverageJob;
pub use danger::DangerJob;
pub use enrichment::{ConfigIngestJob, EnrichmentJob};

use crate::kafka::{InboundMessage, ProcessingResult};
use serde_json::Value;
use tracing::warn;

/// Parse a message payload, turning failures into a drop
fn parse_payload(job: &str, message: &InboundMessage) -> Result<Value, ProcessingResult> {
    message.payload_json().map_err(|e| {
        warn!(
            job,
            partition = message.partition,
            offset = message.offset,
            error = %e,
            "Dropping undecodable message"
        );
        ProcessingResult::dropped(e.to_string())
    })
}

/// Key carried over from the input message
fn forward_key(message: &InboundMessage) -> Option<String> {
    message.key_str().map(str::to_string)
}
