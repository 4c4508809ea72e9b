//! Test utilities for solarflow
//!
//! This module provides a recording publisher and message fixtures.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::kafka::{InboundMessage, KafkaIntegrationError, OutboundMessage, Publisher};

/// Publisher that records every message instead of sending it
#[derive(Debug, Clone, Default)]
pub struct MockPublisher {
    messages: Arc<Mutex<Vec<OutboundMessage>>>,
    fail: Arc<AtomicBool>,
}

impl MockPublisher {
    /// Create a new mock publisher
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every publish fails
    pub fn failing() -> Self {
        let publisher = Self::new();
        publisher.set_failing(true);
        publisher
    }

    /// Toggle publish failures
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Messages published so far
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Messages published to `topic`
    pub fn messages_for(&self, topic: &str) -> Vec<OutboundMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }

    /// Clear all recorded messages
    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, message: &OutboundMessage) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::from(KafkaIntegrationError::PublishError(
                "Simulated publish failure".to_string(),
            )));
        }

        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Telemetry envelope for one panel reading; `timestamp` is nanoseconds
pub fn telemetry_payload(panel_id: &str, location_id: &str, power_output: f64, timestamp: i64) -> Value {
    json!({
        "data": {
            "panel_id": panel_id,
            "location_id": location_id,
            "location_name": format!("Site {}", location_id),
            "latitude": 51.5,
            "longitude": -0.12,
            "timezone": 0,
            "power_output": power_output,
            "temperature": 24.0,
            "irradiance": 800.0,
            "voltage": 36.5,
            "current": 8.2
        },
        "timestamp": timestamp
    })
}

/// Telemetry message on the default telemetry topic
pub fn telemetry_message(
    panel_id: &str,
    location_id: &str,
    power_output: f64,
    timestamp: i64,
) -> InboundMessage {
    InboundMessage::json(
        "solar-data",
        None,
        &telemetry_payload(panel_id, location_id, power_output, timestamp),
    )
}

/// Configuration message keyed by location on the default config topic
pub fn config_message(location: &str, temperature: f64, cloud_cover: f64) -> InboundMessage {
    InboundMessage::json(
        "weather-forecast",
        Some(location),
        &json!({
            "location": location,
            "temperature": temperature,
            "cloud_cover": cloud_cover
        }),
    )
}
