//! Kafka integration module for the stream jobs
//!
//! This module provides:
//! - A per-job consumer with manual offset management
//! - A publisher with retrying delivery
//! - The message types and handler trait the jobs are written against
//! - Graceful shutdown with offset commits

mod config;
mod consumer;
mod producer;

pub use config::KafkaConfig;
pub use consumer::JobConsumer;
pub use producer::{KafkaPublisher, Publisher};

use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Message};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Kafka-specific error types
#[derive(Debug, Error)]
pub enum KafkaIntegrationError {
    #[error("Kafka connection error: {0}")]
    ConnectionError(#[from] KafkaError),

    #[error("Message deserialization failed: {0}")]
    DeserializationError(String),

    #[error("Offset commit failed: {0}")]
    OffsetCommitError(String),

    #[error("Publish failed: {0}")]
    PublishError(String),
}

/// Owned copy of a consumed Kafka message
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    /// Broker timestamp in epoch milliseconds
    pub timestamp: Option<i64>,
}

impl InboundMessage {
    /// Copy a borrowed rdkafka message
    pub fn from_kafka(message: &BorrowedMessage<'_>) -> Self {
        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message.key().map(|k| k.to_vec()),
            payload: message.payload().map(|p| p.to_vec()),
            timestamp: message.timestamp().to_millis(),
        }
    }

    /// Build a message carrying a JSON payload, mainly for tests and replays
    pub fn json(topic: impl Into<String>, key: Option<&str>, payload: &Value) -> Self {
        Self {
            topic: topic.into(),
            partition: 0,
            offset: 0,
            key: key.map(|k| k.as_bytes().to_vec()),
            payload: Some(payload.to_string().into_bytes()),
            timestamp: None,
        }
    }

    /// Message key as text, if present and valid UTF-8
    pub fn key_str(&self) -> Option<&str> {
        self.key
            .as_deref()
            .and_then(|k| std::str::from_utf8(k).ok())
    }

    /// Parse the payload as JSON
    pub fn payload_json(&self) -> Result<Value, KafkaIntegrationError> {
        let payload = self.payload.as_deref().ok_or_else(|| {
            KafkaIntegrationError::DeserializationError("Empty message payload".to_string())
        })?;

        serde_json::from_slice(payload)
            .map_err(|e| KafkaIntegrationError::DeserializationError(e.to_string()))
    }
}

/// Message to be published by a job
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub topic: String,
    pub key: Option<String>,
    pub payload: Value,
}

impl OutboundMessage {
    pub fn new(topic: impl Into<String>, key: Option<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            key,
            payload,
        }
    }

    /// Serialize a record into an outbound message
    pub fn json<T: Serialize>(
        topic: impl Into<String>,
        key: Option<String>,
        record: &T,
    ) -> crate::error::Result<Self> {
        Ok(Self::new(topic, key, serde_json::to_value(record)?))
    }
}

/// Processing result for a Kafka message
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingResult {
    /// Message was handled; publish these outputs (possibly none)
    Emit(Vec<OutboundMessage>),

    /// Message was discarded and its offset may be committed
    Dropped(String),
}

impl ProcessingResult {
    pub fn none() -> Self {
        ProcessingResult::Emit(Vec::new())
    }

    pub fn one(message: OutboundMessage) -> Self {
        ProcessingResult::Emit(vec![message])
    }

    pub fn dropped(reason: impl Into<String>) -> Self {
        ProcessingResult::Dropped(reason.into())
    }

    /// Outputs to publish
    pub fn outputs(&self) -> &[OutboundMessage] {
        match self {
            ProcessingResult::Emit(outputs) => outputs,
            ProcessingResult::Dropped(_) => &[],
        }
    }
}

/// A stream job's per-message logic
pub trait MessageHandler: Send + Sync {
    /// Job name, used for the consumer group and health reporting
    fn name(&self) -> &str;

    /// Topics the job consumes
    fn topics(&self) -> Vec<String>;

    /// Handle one message
    fn handle(&self, message: &InboundMessage) -> ProcessingResult;
}
