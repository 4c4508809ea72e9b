//! Configuration module for solarflow
//!
//! This module handles loading and validating configuration from environment
//! variables, providing strongly-typed configuration structures for all
//! application components.

use envconfig::Envconfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};
pub use crate::kafka::KafkaConfig;

/// Main configuration structure for solarflow
#[derive(Debug, Clone, Default, Deserialize, Serialize, Envconfig)]
pub struct Config {
    /// Server configuration
    #[serde(flatten)]
    #[envconfig(nested)]
    pub server: ServerConfig,

    /// Kafka configuration
    #[serde(flatten)]
    #[envconfig(nested)]
    pub kafka: KafkaConfig,

    /// Window configuration
    #[serde(flatten)]
    #[envconfig(nested)]
    pub window: WindowConfig,

    /// Which jobs this process runs
    #[serde(flatten)]
    #[envconfig(nested)]
    pub jobs: JobFlags,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct ServerConfig {
    /// Host to bind to
    #[envconfig(from = "HOST", default = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[envconfig(from = "PORT", default = "8080")]
    pub port: u16,

    /// Log level
    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,

    /// Environment (development, staging, production)
    #[envconfig(from = "ENVIRONMENT", default = "development")]
    pub environment: String,

    /// Request timeout in seconds
    #[envconfig(from = "REQUEST_TIMEOUT_SECS", default = "30")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[envconfig(from = "SHUTDOWN_TIMEOUT_SECS", default = "30")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            environment: "development".to_string(),
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Get the server address as a string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Tumbling window settings for the average job
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct WindowConfig {
    /// Window length in seconds
    #[envconfig(from = "WINDOW_LENGTH_SECS", default = "60")]
    pub length_secs: u64,

    /// How long a window stays open after its end, in seconds
    #[envconfig(from = "WINDOW_GRACE_SECS", default = "60")]
    pub grace_secs: u64,

    /// Keep one window engine per location instead of one shared accumulator
    #[envconfig(from = "WINDOW_PER_LOCATION", default = "false")]
    pub per_location: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            length_secs: 60,
            grace_secs: 60,
            per_location: false,
        }
    }
}

impl WindowConfig {
    pub fn length(&self) -> Duration {
        Duration::from_secs(self.length_secs)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

/// Job switches
#[derive(Debug, Clone, Deserialize, Serialize, Envconfig)]
pub struct JobFlags {
    /// Windowed average power per panel
    #[envconfig(from = "ENABLE_AVERAGE_JOB", default = "true")]
    pub average: bool,

    /// Configuration ingest and telemetry enrichment
    #[envconfig(from = "ENABLE_ENRICHMENT_JOB", default = "true")]
    pub enrichment: bool,

    /// Danger detection over enriched data
    #[envconfig(from = "ENABLE_DANGER_JOB", default = "true")]
    pub danger: bool,

    /// HTTP endpoints injecting telemetry
    #[envconfig(from = "ENABLE_HTTP_SOURCE", default = "true")]
    pub http_source: bool,
}

impl Default for JobFlags {
    fn default() -> Self {
        Self {
            average: true,
            enrichment: true,
            danger: true,
            http_source: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenv::dotenv().ok();

        Config::init_from_env().map_err(Error::from)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config("Server port cannot be 0"));
        }

        if self.kafka.brokers.trim().is_empty() {
            return Err(Error::config("Kafka brokers cannot be empty"));
        }

        if self.kafka.topics().iter().any(|topic| topic.trim().is_empty()) {
            return Err(Error::config("Topic names cannot be empty"));
        }

        if self.kafka.batch_size == 0 {
            return Err(Error::config("Kafka batch size must be at least 1"));
        }

        if self.window.length_secs == 0 {
            return Err(Error::config("Window length must be at least 1 second"));
        }

        Ok(())
    }

    /// Log the effective configuration
    pub fn log_config(&self) {
        tracing::info!(
            server_address = %self.server.address(),
            environment = %self.server.environment,
            log_level = %self.server.log_level,
            "Server configuration"
        );

        tracing::info!(
            brokers = %self.kafka.brokers,
            group_prefix = %self.kafka.consumer_group_prefix,
            telemetry_topic = %self.kafka.telemetry_topic,
            config_topic = %self.kafka.config_topic,
            aggregate_topic = %self.kafka.aggregate_topic,
            enriched_topic = %self.kafka.enriched_topic,
            alert_topic = %self.kafka.alert_topic,
            "Kafka configuration"
        );

        tracing::info!(
            length_secs = %self.window.length_secs,
            grace_secs = %self.window.grace_secs,
            per_location = %self.window.per_location,
            "Window configuration"
        );

        tracing::info!(
            average = %self.jobs.average,
            enrichment = %self.jobs.enrichment,
            danger = %self.jobs.danger,
            http_source = %self.jobs.http_source,
            "Enabled jobs"
        );
    }
}
