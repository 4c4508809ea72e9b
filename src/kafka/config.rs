//! Kafka configuration module

use envconfig::Envconfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kafka configuration settings
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct KafkaConfig {
    /// Kafka broker addresses (comma-separated)
    #[serde(default = "default_brokers")]
    #[envconfig(from = "KAFKA_BROKERS", default = "localhost:9092")]
    pub brokers: String,

    /// Prefix of every job's consumer group (`<prefix>-<job>`)
    #[serde(default = "default_consumer_group_prefix")]
    #[envconfig(from = "KAFKA_CONSUMER_GROUP_PREFIX", default = "solarflow")]
    pub consumer_group_prefix: String,

    /// Raw panel telemetry, also the HTTP source's output
    #[serde(default = "default_telemetry_topic")]
    #[envconfig(from = "TELEMETRY_TOPIC", default = "solar-data")]
    pub telemetry_topic: String,

    /// Location configuration (forecast) records
    #[serde(default = "default_config_topic")]
    #[envconfig(from = "CONFIG_TOPIC", default = "weather-forecast")]
    pub config_topic: String,

    /// Windowed average power summaries
    #[serde(default = "default_aggregate_topic")]
    #[envconfig(from = "AGGREGATE_TOPIC", default = "panel-averages")]
    pub aggregate_topic: String,

    /// Readings enriched with configuration
    #[serde(default = "default_enriched_topic")]
    #[envconfig(from = "ENRICHED_TOPIC", default = "enriched-data")]
    pub enriched_topic: String,

    /// Danger alerts
    #[serde(default = "default_alert_topic")]
    #[envconfig(from = "ALERT_TOPIC", default = "danger-alerts")]
    pub alert_topic: String,

    /// Where a new consumer group starts (earliest, latest)
    #[serde(default = "default_auto_offset_reset")]
    #[envconfig(from = "KAFKA_AUTO_OFFSET_RESET", default = "earliest")]
    pub auto_offset_reset: String,

    /// Session timeout in milliseconds
    #[serde(default = "default_session_timeout")]
    #[envconfig(from = "KAFKA_SESSION_TIMEOUT_MS", default = "30000")]
    pub session_timeout_ms: u32,

    /// Maximum poll interval in milliseconds
    #[serde(default = "default_max_poll_interval")]
    #[envconfig(from = "KAFKA_MAX_POLL_INTERVAL_MS", default = "300000")]
    pub max_poll_interval_ms: u32,

    /// Messages processed between offset commits
    #[serde(default = "default_batch_size")]
    #[envconfig(from = "KAFKA_BATCH_SIZE", default = "100")]
    pub batch_size: usize,

    /// Longest time pending offsets stay uncommitted, in milliseconds
    #[serde(default = "default_commit_interval_ms")]
    #[envconfig(from = "KAFKA_COMMIT_INTERVAL_MS", default = "5000")]
    pub commit_interval_ms: u64,

    /// Initial publish retry backoff in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    #[envconfig(from = "KAFKA_RETRY_BACKOFF_MS", default = "200")]
    pub retry_backoff_ms: u64,

    /// Give up publishing a message after this long, in milliseconds
    #[serde(default = "default_publish_timeout_ms")]
    #[envconfig(from = "KAFKA_PUBLISH_TIMEOUT_MS", default = "30000")]
    pub publish_timeout_ms: u64,

    /// Enable idempotent producer
    #[serde(default = "default_idempotent_producer")]
    #[envconfig(from = "KAFKA_IDEMPOTENT_PRODUCER", default = "true")]
    pub idempotent_producer: bool,

    /// Compression type for produced messages
    #[serde(default = "default_compression_type")]
    #[envconfig(from = "KAFKA_COMPRESSION_TYPE", default = "snappy")]
    pub compression_type: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            consumer_group_prefix: default_consumer_group_prefix(),
            telemetry_topic: default_telemetry_topic(),
            config_topic: default_config_topic(),
            aggregate_topic: default_aggregate_topic(),
            enriched_topic: default_enriched_topic(),
            alert_topic: default_alert_topic(),
            auto_offset_reset: default_auto_offset_reset(),
            session_timeout_ms: default_session_timeout(),
            max_poll_interval_ms: default_max_poll_interval(),
            batch_size: default_batch_size(),
            commit_interval_ms: default_commit_interval_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            publish_timeout_ms: default_publish_timeout_ms(),
            idempotent_producer: default_idempotent_producer(),
            compression_type: default_compression_type(),
        }
    }
}

impl KafkaConfig {
    /// Create a new KafkaConfig from environment variables
    pub fn from_env() -> Result<Self, envconfig::Error> {
        <Self as envconfig::Envconfig>::init_from_env()
    }

    /// Get brokers as a vector
    pub fn brokers_list(&self) -> Vec<String> {
        self.brokers.split(',').map(|s| s.trim().to_string()).collect()
    }

    /// Consumer group of one job
    pub fn consumer_group(&self, job: &str) -> String {
        format!("{}-{}", self.consumer_group_prefix, job)
    }

    /// All configured topic names
    pub fn topics(&self) -> [&str; 5] {
        [
            &self.telemetry_topic,
            &self.config_topic,
            &self.aggregate_topic,
            &self.enriched_topic,
            &self.alert_topic,
        ]
    }

    /// Get session timeout as Duration
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms as u64)
    }

    /// Get commit interval as Duration
    pub fn commit_interval(&self) -> Duration {
        Duration::from_millis(self.commit_interval_ms)
    }

    /// Get retry backoff as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Get publish timeout as Duration
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    /// Build rdkafka consumer configuration for one job
    pub fn build_consumer_config(&self, job: &str) -> rdkafka::ClientConfig {
        let mut config = rdkafka::ClientConfig::new();

        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", self.consumer_group(job))
            .set("enable.auto.commit", "false")
            .set("session.timeout.ms", self.session_timeout_ms.to_string())
            .set(
                "max.poll.interval.ms",
                self.max_poll_interval_ms.to_string(),
            )
            .set("enable.partition.eof", "false")
            .set("auto.offset.reset", &self.auto_offset_reset);

        config
    }

    /// Build rdkafka producer configuration
    pub fn build_producer_config(&self) -> rdkafka::ClientConfig {
        let mut config = rdkafka::ClientConfig::new();

        config
            .set("bootstrap.servers", &self.brokers)
            .set("message.timeout.ms", self.publish_timeout_ms.to_string())
            .set("compression.type", &self.compression_type);

        if self.idempotent_producer {
            config
                .set("enable.idempotence", "true")
                .set("acks", "all")
                .set("retries", "10")
                .set("max.in.flight.requests.per.connection", "5");
        } else {
            config.set("acks", "1");
        }

        config
    }
}

// Default value functions
fn default_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_consumer_group_prefix() -> String {
    "solarflow".to_string()
}

fn default_telemetry_topic() -> String {
    "solar-data".to_string()
}

fn default_config_topic() -> String {
    "weather-forecast".to_string()
}

fn default_aggregate_topic() -> String {
    "panel-averages".to_string()
}

fn default_enriched_topic() -> String {
    "enriched-data".to_string()
}

fn default_alert_topic() -> String {
    "danger-alerts".to_string()
}

fn default_auto_offset_reset() -> String {
    "earliest".to_string()
}

fn default_session_timeout() -> u32 {
    30000 // 30 seconds
}

fn default_max_poll_interval() -> u32 {
    300000 // 5 minutes
}

fn default_batch_size() -> usize {
    100
}

fn default_commit_interval_ms() -> u64 {
    5000
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_publish_timeout_ms() -> u64 {
    30000
}

fn default_idempotent_producer() -> bool {
    true
}

fn default_compression_type() -> String {
    "snappy".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KafkaConfig::default();
        assert_eq!(config.brokers, "localhost:9092");
        assert_eq!(config.telemetry_topic, "solar-data");
        assert_eq!(config.alert_topic, "danger-alerts");
        assert_eq!(config.auto_offset_reset, "earliest");
    }

    #[test]
    fn test_consumer_group_per_job() {
        let config = KafkaConfig::default();
        assert_eq!(config.consumer_group("average"), "solarflow-average");
        assert_eq!(config.consumer_group("danger"), "solarflow-danger");
    }

    #[test]
    fn test_brokers_list() {
        let config = KafkaConfig {
            brokers: "broker1:9092, broker2:9092".to_string(),
            ..KafkaConfig::default()
        };
        assert_eq!(config.brokers_list(), vec!["broker1:9092", "broker2:9092"]);
    }

    #[test]
    fn test_duration_conversions() {
        let config = KafkaConfig::default();
        assert_eq!(config.session_timeout(), Duration::from_secs(30));
        assert_eq!(config.commit_interval(), Duration::from_secs(5));
        assert_eq!(config.retry_backoff(), Duration::from_millis(200));
        assert_eq!(config.publish_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_client_configs() {
        let config = KafkaConfig::default();

        let consumer = config.build_consumer_config("enrichment");
        assert_eq!(consumer.get("group.id"), Some("solarflow-enrichment"));
        assert_eq!(consumer.get("enable.auto.commit"), Some("false"));

        let producer = config.build_producer_config();
        assert_eq!(producer.get("enable.idempotence"), Some("true"));
        assert_eq!(producer.get("acks"), Some("all"));
    }
}
