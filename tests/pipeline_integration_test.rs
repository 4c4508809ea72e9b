//! End-to-end pipeline tests without a broker
//!
//! Jobs are chained by feeding the messages one job publishes into the next,
//! the way the topics connect them in production.

use serde_json::json;
use std::sync::Arc;
use solarflow::config::WindowConfig;
use solarflow::jobs::{AverageJob, ConfigIngestJob, DangerJob, EnrichmentJob};
use solarflow::kafka::{InboundMessage, MessageHandler, OutboundMessage, ProcessingResult};
use solarflow::processing::ConfigCache;
use solarflow::test_utils::{config_message, telemetry_message};
use solarflow::{AlertDecision, EnrichedObservation, WindowedSummary};

// 2024-01-01T00:00:00Z
const T0: i64 = 1_704_067_200_000_000_000;
const SECOND: i64 = 1_000_000_000;

fn as_inbound(message: &OutboundMessage) -> InboundMessage {
    InboundMessage::json(
        message.topic.as_str(),
        message.key.as_deref(),
        &message.payload,
    )
}

fn hot_reading(panel: &str, location: &str, temperature: f64) -> InboundMessage {
    InboundMessage::json(
        "solar-data",
        None,
        &json!({
            "data": {"panel_id": panel, "location_id": location, "temperature": temperature, "power_output": 100},
            "timestamp": T0
        }),
    )
}

struct Pipeline {
    ingest: ConfigIngestJob,
    enrichment: EnrichmentJob,
    danger: DangerJob,
}

impl Pipeline {
    fn new() -> Self {
        let cache = Arc::new(ConfigCache::new());
        Self {
            ingest: ConfigIngestJob::new("weather-forecast", Arc::clone(&cache)),
            enrichment: EnrichmentJob::new("solar-data", "enriched-data", cache),
            danger: DangerJob::new("enriched-data", "danger-alerts"),
        }
    }

    /// Telemetry through enrichment and detection, returning the alerts
    fn run(&self, telemetry: &InboundMessage) -> Vec<OutboundMessage> {
        let enriched = self.enrichment.handle_at(telemetry, T0);
        enriched
            .outputs()
            .iter()
            .flat_map(|out| self.danger.handle(&as_inbound(out)).outputs().to_vec())
            .collect()
    }
}

#[test]
fn test_alert_after_hot_clear_forecast() {
    let pipeline = Pipeline::new();
    pipeline.ingest.handle(&config_message("L1", 30.0, 10.0));

    let alerts = pipeline.run(&hot_reading("p1", "L1", 31.0));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].topic, "danger-alerts");

    let alert: AlertDecision = serde_json::from_value(alerts[0].payload.clone()).unwrap();
    assert!(alert.danger_detected);
    assert_eq!(alert.panel_id, Some(json!("p1")));
    assert_eq!(alert.panel_temperature, 31.0);
    assert_eq!(alert.forecast_temperature, 30.0);
}

#[test]
fn test_no_alert_before_config_arrives() {
    let pipeline = Pipeline::new();

    let enriched = pipeline.enrichment.handle_at(&hot_reading("p1", "L1", 31.0), T0);
    let observation: EnrichedObservation =
        serde_json::from_value(enriched.outputs()[0].payload.clone()).unwrap();
    assert!(observation.configuration.is_none());

    assert!(pipeline.run(&hot_reading("p1", "L1", 31.0)).is_empty());
}

#[test]
fn test_config_update_changes_decision() {
    let pipeline = Pipeline::new();
    pipeline.ingest.handle(&config_message("L1", 30.0, 10.0));
    assert_eq!(pipeline.run(&hot_reading("p1", "L1", 31.0)).len(), 1);

    // Clouds roll in; the latest config wins
    pipeline.ingest.handle(&config_message("L1", 30.0, 90.0));
    assert!(pipeline.run(&hot_reading("p1", "L1", 31.0)).is_empty());
}

#[test]
fn test_config_is_per_location() {
    let pipeline = Pipeline::new();
    pipeline.ingest.handle(&config_message("L1", 30.0, 10.0));

    assert!(pipeline.run(&hot_reading("p2", "L2", 31.0)).is_empty());
    assert_eq!(pipeline.run(&hot_reading("p1", "L1", 31.0)).len(), 1);
}

#[test]
fn test_numeric_location_joins_string_config() {
    let pipeline = Pipeline::new();
    pipeline.ingest.handle(&config_message("42", 30.0, 10.0));

    let telemetry = InboundMessage::json(
        "solar-data",
        None,
        &json!({"data": {"panel_id": 1, "location_id": 42, "temperature": "29.5"}, "timestamp": T0}),
    );
    let alerts = pipeline.run(&telemetry);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].payload["panel_id"], 1);
}

#[test]
fn test_average_job_over_a_window() {
    let job = AverageJob::new("solar-data", "panel-averages", &WindowConfig::default());

    let mut last = None;
    for (i, (panel, power)) in [("p1", 100.0), ("p2", 200.0), ("p3", 300.0), ("p1", 0.0)]
        .into_iter()
        .enumerate()
    {
        let message = telemetry_message(panel, "L1", power, T0 + i as i64 * SECOND);
        last = Some(job.handle_at(&message, T0 + 5 * SECOND));
    }

    let result = last.unwrap();
    let summary: WindowedSummary =
        serde_json::from_value(result.outputs()[0].payload.clone()).unwrap();
    assert_eq!(summary.summary.panel_count, 3);
    assert_eq!(summary.summary.avg_power_per_panel, 200.0);
    assert_eq!(summary.summary.location_id, Some(json!("L1")));
    assert_eq!(summary.summary.location_name, Some(json!("Site L1")));
    assert_eq!(summary.window_start, T0 / 1_000_000);
    assert_eq!(summary.window_end, T0 / 1_000_000 + 60_000);
}

#[test]
fn test_average_job_late_event_after_retirement() {
    let job = AverageJob::new("solar-data", "panel-averages", &WindowConfig::default());

    // Nothing open: an event two windows behind processing time is dropped
    let stale = telemetry_message("p1", "L1", 10.0, T0);
    let now = T0 + 180 * SECOND;
    assert!(matches!(job.handle_at(&stale, now), ProcessingResult::Dropped(_)));

    // With a window open, it lands there
    job.handle_at(&telemetry_message("p2", "L1", 30.0, now), now);
    let result = job.handle_at(&stale, now);
    let summary = &result.outputs()[0].payload;
    assert_eq!(summary["window_start"], now / 1_000_000);
    assert_eq!(summary["panel_count"], 2);
}

#[test]
fn test_handlers_name_their_topics() {
    let cache = Arc::new(ConfigCache::new());
    let handlers: Vec<Box<dyn MessageHandler>> = vec![
        Box::new(AverageJob::new("solar-data", "panel-averages", &WindowConfig::default())),
        Box::new(ConfigIngestJob::new("weather-forecast", Arc::clone(&cache))),
        Box::new(EnrichmentJob::new("solar-data", "enriched-data", cache)),
        Box::new(DangerJob::new("enriched-data", "danger-alerts")),
    ];

    let names: Vec<&str> = handlers.iter().map(|h| h.name()).collect();
    assert_eq!(names, vec!["average", "config-ingest", "enrichment", "danger"]);
    assert_eq!(handlers[3].topics(), vec!["enriched-data".to_string()]);
}
