//! Stateful streaming core
//!
//! - record normalization of raw telemetry
//! - the panel aggregator plugged into the window engine
//! - the latest-value configuration cache and the enrichment join over it
//! - the danger detector over enriched observations

pub mod config_cache;
pub mod danger;
pub mod enrichment;
pub mod normalizer;
pub mod panel_aggregator;

pub use config_cache::ConfigCache;
pub use enrichment::EnrichmentJoin;
pub use normalizer::{normalize_telemetry, normalize_telemetry_at};
pub use panel_aggregator::{LocationInfo, PanelAggregator, PanelWindowState};
