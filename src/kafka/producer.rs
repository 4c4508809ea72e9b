//! Publishing of job outputs to Kafka

use super::{KafkaConfig, KafkaIntegrationError, OutboundMessage};
use crate::error::{Error, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use std::time::Duration;
use tracing::{debug, warn};

/// Sink for job outputs and HTTP-injected messages
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver one message, returning once the broker has acknowledged it
    async fn publish(&self, message: &OutboundMessage) -> Result<()>;

    /// Flush anything buffered
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Publisher backed by an rdkafka `FutureProducer`
#[derive(Clone)]
pub struct KafkaPublisher {
    /// Kafka producer instance
    producer: FutureProducer,

    /// Timeout for a single send attempt
    send_timeout: Duration,

    /// First retry delay
    retry_backoff: Duration,

    /// Give up after retrying this long
    max_elapsed: Duration,
}

impl KafkaPublisher {
    /// Create a new publisher
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let producer: FutureProducer = config
            .build_producer_config()
            .create()
            .map_err(|e| Error::from(KafkaIntegrationError::ConnectionError(e)))?;

        Ok(Self {
            producer,
            send_timeout: config.publish_timeout(),
            retry_backoff: config.retry_backoff(),
            max_elapsed: config.publish_timeout(),
        })
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            initial_interval: self.retry_backoff,
            multiplier: 2.0,
            max_interval: Duration::from_secs(10),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish(&self, message: &OutboundMessage) -> Result<()> {
        let payload = serde_json::to_string(&message.payload)?;

        let operation = || async {
            let mut record: FutureRecord<'_, str, String> =
                FutureRecord::to(&message.topic).payload(&payload);
            if let Some(key) = &message.key {
                record = record.key(key.as_str());
            }

            match self.producer.send(record, self.send_timeout).await {
                Ok((partition, offset)) => {
                    debug!(
                        topic = %message.topic,
                        partition,
                        offset,
                        "Message published"
                    );
                    Ok(())
                },
                Err((kafka_error, _)) => {
                    warn!(
                        topic = %message.topic,
                        error = %kafka_error,
                        "Publish failed, will retry"
                    );
                    Err(backoff::Error::transient(kafka_error))
                },
            }
        };

        backoff::future::retry(self.backoff(), operation)
            .await
            .map_err(|e| {
                Error::from(KafkaIntegrationError::PublishError(format!(
                    "Failed to publish to '{}': {}",
                    message.topic, e
                )))
            })
    }

    fn flush(&self) -> Result<()> {
        self.producer
            .flush(self.send_timeout)
            .map_err(|e| Error::from(KafkaIntegrationError::ConnectionError(e)))
    }
}
