//! Per-job Kafka consumer with manual offset management

use super::{InboundMessage, KafkaConfig, KafkaIntegrationError, MessageHandler, ProcessingResult, Publisher};
use crate::api::{HealthState, HealthStatus};
use crate::error::{Error, Result};
use crate::kafka_span;
use crate::logging::Timer;
use futures::stream::StreamExt;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::topic_partition_list::TopicPartitionList;
use rdkafka::Offset;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn, Instrument};

/// Runs one stream job: consume, handle, publish, commit
pub struct JobConsumer {
    /// Kafka consumer instance
    consumer: StreamConsumer,

    /// The job's per-message logic
    handler: Arc<dyn MessageHandler>,

    /// Where the job's outputs go
    publisher: Arc<dyn Publisher>,

    /// Component health reporting
    health: Arc<HealthState>,

    /// Configuration
    config: KafkaConfig,

    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl JobConsumer {
    /// Create a consumer for `handler` and subscribe to its topics
    pub fn new(
        config: KafkaConfig,
        handler: Arc<dyn MessageHandler>,
        publisher: Arc<dyn Publisher>,
        health: Arc<HealthState>,
    ) -> Result<Self> {
        let consumer: StreamConsumer = config
            .build_consumer_config(handler.name())
            .create()
            .map_err(|e| Error::from(KafkaIntegrationError::ConnectionError(e)))?;

        let topics = handler.topics();
        let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
        consumer
            .subscribe(&topic_refs)
            .map_err(|e| Error::kafka(format!("Failed to subscribe to {:?}: {}", topics, e)))?;

        Ok(Self {
            consumer,
            handler,
            publisher,
            health,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops the loop when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Consume until shutdown is signalled
    pub async fn run(self) -> Result<()> {
        let name = self.handler.name().to_string();
        info!(job = %name, topics = ?self.handler.topics(), "Starting job consumer");
        self.health
            .update_component(
                name.clone(),
                HealthStatus::Healthy,
                Some("Consuming".to_string()),
            )
            .await;

        // Track offsets for batch commit
        let mut pending = TopicPartitionList::new();
        let mut messages_since_commit = 0usize;
        let mut last_commit = Instant::now();
        let commit_interval = self.config.commit_interval();

        let stream = self.consumer.stream();
        tokio::pin!(stream);

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            let message_result = tokio::select! {
                msg = stream.next() => msg,
                _ = sleep(Duration::from_secs(1)) => {
                    if messages_since_commit > 0 && last_commit.elapsed() >= commit_interval {
                        if self.commit(&pending).await {
                            pending = TopicPartitionList::new();
                            messages_since_commit = 0;
                        }
                        last_commit = Instant::now();
                    }
                    continue;
                }
            };

            let inbound = match message_result {
                Some(Ok(msg)) => InboundMessage::from_kafka(&msg),
                Some(Err(e)) => {
                    error!(job = %name, error = %e, "Kafka consumer error");
                    continue;
                },
                None => continue,
            };

            let span = kafka_span!(name.as_str(), inbound.topic.as_str(), inbound.partition, inbound.offset);
            let delivered = dispatch(self.handler.as_ref(), self.publisher.as_ref(), &inbound)
                .instrument(span)
                .await;

            match delivered {
                Ok(_) => {
                    if let Err(e) = pending.add_partition_offset(
                        &inbound.topic,
                        inbound.partition,
                        Offset::Offset(inbound.offset + 1),
                    ) {
                        error!(job = %name, error = %e, "Failed to track offset");
                        continue;
                    }
                    messages_since_commit += 1;
                },
                Err(e) => {
                    crate::log_error!(
                        e,
                        "Publishing job output failed, message will be redelivered",
                        job = name,
                        partition = inbound.partition,
                        offset = inbound.offset,
                    );
                    self.health
                        .update_component(
                            name.clone(),
                            HealthStatus::Degraded,
                            Some(format!("Publish failed: {}", e)),
                        )
                        .await;
                    sleep(self.config.retry_backoff()).await;
                    self.rewind(&inbound);
                    continue;
                },
            }

            if messages_since_commit >= self.config.batch_size {
                if self.commit(&pending).await {
                    pending = TopicPartitionList::new();
                    messages_since_commit = 0;
                }
                last_commit = Instant::now();
            }
        }

        // Final commit before shutdown
        if messages_since_commit > 0 {
            info!(
                job = %name,
                pending = messages_since_commit,
                "Committing pending offsets before shutdown"
            );
            self.commit(&pending).await;
        }

        if let Err(e) = self.publisher.flush() {
            warn!(job = %name, error = %e, "Publisher flush failed");
        }

        self.health
            .update_component(name.clone(), HealthStatus::Unhealthy, Some("Stopped".to_string()))
            .await;
        info!(job = %name, "Job consumer stopped");
        Ok(())
    }

    async fn commit(&self, offsets: &TopicPartitionList) -> bool {
        match self.consumer.commit(offsets, CommitMode::Sync) {
            Ok(()) => {
                debug!(job = %self.handler.name(), partitions = offsets.count(), "Offsets committed");
                self.health
                    .update_component(
                        self.handler.name().to_string(),
                        HealthStatus::Healthy,
                        Some("Consuming".to_string()),
                    )
                    .await;
                true
            },
            Err(e) => {
                let err = KafkaIntegrationError::OffsetCommitError(e.to_string());
                crate::log_error!(err, "Offset commit failed", job = self.handler.name());
                self.health
                    .update_component(
                        self.handler.name().to_string(),
                        HealthStatus::Degraded,
                        Some(err.to_string()),
                    )
                    .await;
                false
            },
        }
    }

    /// Seek back so a message whose outputs were not delivered is consumed again
    fn rewind(&self, message: &InboundMessage) {
        if let Err(e) = self.consumer.seek(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset),
            Duration::from_secs(5),
        ) {
            error!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "Seek for redelivery failed"
            );
        }
    }
}

impl Drop for JobConsumer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Handle one message and publish its outputs
///
/// Returns the number of messages published. An error means at least one
/// output was not delivered and the input's offset must not be committed.
pub async fn dispatch(
    handler: &dyn MessageHandler,
    publisher: &dyn Publisher,
    message: &InboundMessage,
) -> Result<usize> {
    let timer = Timer::start(format!("{}.handle", handler.name()));

    let outputs = match handler.handle(message) {
        ProcessingResult::Emit(outputs) => outputs,
        ProcessingResult::Dropped(reason) => {
            debug!(
                job = %handler.name(),
                partition = message.partition,
                offset = message.offset,
                reason = %reason,
                "Message dropped"
            );
            timer.stop();
            return Ok(0);
        },
    };

    for output in &outputs {
        publisher.publish(output).await?;
    }

    timer.stop();
    Ok(outputs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::OutboundMessage;
    use crate::test_utils::MockPublisher;
    use serde_json::json;

    struct EchoHandler;

    impl MessageHandler for EchoHandler {
        fn name(&self) -> &str {
            "echo"
        }

        fn topics(&self) -> Vec<String> {
            vec!["in".to_string()]
        }

        fn handle(&self, message: &InboundMessage) -> ProcessingResult {
            match message.payload_json() {
                Ok(value) => ProcessingResult::one(OutboundMessage::new(
                    "out",
                    message.key_str().map(str::to_string),
                    value,
                )),
                Err(e) => ProcessingResult::dropped(e.to_string()),
            }
        }
    }

    #[tokio::test]
    async fn test_dispatch_publishes_outputs() {
        let publisher = MockPublisher::new();
        let message = InboundMessage::json("in", Some("k"), &json!({"a": 1}));

        let published = dispatch(&EchoHandler, &publisher, &message).await.unwrap();
        assert_eq!(published, 1);

        let sent = publisher.messages();
        assert_eq!(sent[0].topic, "out");
        assert_eq!(sent[0].key.as_deref(), Some("k"));
        assert_eq!(sent[0].payload, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_dispatch_dropped_is_committable() {
        let publisher = MockPublisher::new();
        let mut message = InboundMessage::json("in", None, &json!({}));
        message.payload = Some(b"garbage".to_vec());

        assert_eq!(dispatch(&EchoHandler, &publisher, &message).await.unwrap(), 0);
        assert!(publisher.messages().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_publish_failure_is_error() {
        let publisher = MockPublisher::failing();
        let message = InboundMessage::json("in", None, &json!({"a": 1}));

        let result = dispatch(&EchoHandler, &publisher, &message).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_consumer_creation() {
        let result = JobConsumer::new(
            KafkaConfig::default(),
            Arc::new(EchoHandler),
            Arc::new(MockPublisher::new()),
            Arc::new(HealthState::new()),
        );
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_handle() {
        let consumer = JobConsumer::new(
            KafkaConfig::default(),
            Arc::new(EchoHandler),
            Arc::new(MockPublisher::new()),
            Arc::new(HealthState::new()),
        )
        .unwrap();

        let handle = consumer.shutdown_handle();
        assert!(!handle.load(Ordering::Relaxed));
        drop(consumer);
        assert!(handle.load(Ordering::Relaxed));
    }
}
