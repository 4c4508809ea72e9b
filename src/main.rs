//! solarflow - real-time solar panel telemetry pipeline
//!
//! This application runs the stream jobs (windowed averages, configuration
//! ingest, enrichment, danger detection) against Kafka and serves the HTTP
//! source and health endpoints.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use solarflow::api::{self, HealthState};
use solarflow::config::Config;
use solarflow::error::Result;
use solarflow::jobs::{AverageJob, ConfigIngestJob, DangerJob, EnrichmentJob};
use solarflow::kafka::{JobConsumer, KafkaPublisher, MessageHandler, Publisher};
use solarflow::logging;
use solarflow::processing::ConfigCache;
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment
    let config = Arc::new(Config::from_env()?);

    config.validate()?;

    logging::init_tracing(&config.server.log_level, &config.server.environment)?;

    config.log_config();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting solarflow");

    let publisher: Arc<dyn Publisher> = Arc::new(KafkaPublisher::new(&config.kafka)?);
    let health = Arc::new(HealthState::new());
    let cache = Arc::new(ConfigCache::new());
    let kafka = &config.kafka;

    let mut handlers: Vec<Arc<dyn MessageHandler>> = Vec::new();
    if config.jobs.average {
        handlers.push(Arc::new(AverageJob::new(
            kafka.telemetry_topic.as_str(),
            kafka.aggregate_topic.as_str(),
            &config.window,
        )));
    }
    if config.jobs.enrichment {
        handlers.push(Arc::new(ConfigIngestJob::new(
            kafka.config_topic.as_str(),
            Arc::clone(&cache),
        )));
        handlers.push(Arc::new(EnrichmentJob::new(
            kafka.telemetry_topic.as_str(),
            kafka.enriched_topic.as_str(),
            Arc::clone(&cache),
        )));
    }
    if config.jobs.danger {
        handlers.push(Arc::new(DangerJob::new(
            kafka.enriched_topic.as_str(),
            kafka.alert_topic.as_str(),
        )));
    }

    let mut stop_flags: Vec<Arc<AtomicBool>> = Vec::new();
    let mut tasks: Vec<(String, JoinHandle<Result<()>>)> = Vec::new();
    for handler in handlers {
        let name = handler.name().to_string();
        let consumer = JobConsumer::new(
            config.kafka.clone(),
            handler,
            Arc::clone(&publisher),
            Arc::clone(&health),
        )?;
        stop_flags.push(consumer.shutdown_handle());
        tasks.push((name, tokio::spawn(consumer.run())));
    }

    tracing::info!(jobs = tasks.len(), "Job consumers started");

    let app = api::create_router(Arc::clone(&config), Arc::clone(&publisher), Arc::clone(&health));
    let server_result = api::create_server(Arc::clone(&config), app, api::shutdown_signal()).await;

    // Server is down: stop the consumers and let them commit
    for flag in &stop_flags {
        flag.store(true, Ordering::Relaxed);
    }

    let shutdown_timeout = config.server.shutdown_timeout();
    for (name, task) in tasks {
        match tokio::time::timeout(shutdown_timeout, task).await {
            Ok(Ok(Ok(()))) => {},
            Ok(Ok(Err(e))) => tracing::error!(job = %name, error = %e, "Job consumer failed"),
            Ok(Err(e)) => tracing::error!(job = %name, error = %e, "Job consumer task panicked"),
            Err(_) => tracing::warn!(job = %name, "Job consumer did not stop in time"),
        }
    }

    if let Err(e) = publisher.flush() {
        tracing::warn!(error = %e, "Final publisher flush failed");
    }

    server_result?;
    tracing::info!("solarflow shutdown complete");
    Ok(())
}
