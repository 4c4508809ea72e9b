//! Stream-to-cache enrichment join
//!
//! Each reading is joined with whatever configuration is current for its
//! location at lookup time. There is no time alignment between the two
//! streams and no buffering of readings that arrive before their config.

use std::sync::Arc;

use tracing::debug;

use crate::models::validation::scalar_identifier;
use crate::models::{render_local_timestamp, EnrichedObservation, PanelReading};

use super::config_cache::ConfigCache;

/// Joins readings against a shared [`ConfigCache`]
#[derive(Debug, Clone)]
pub struct EnrichmentJoin {
    cache: Arc<ConfigCache>,
}

impl EnrichmentJoin {
    pub fn new(cache: Arc<ConfigCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ConfigCache> {
        &self.cache
    }

    /// Build the enriched observation for one reading
    pub fn enrich(&self, reading: PanelReading) -> EnrichedObservation {
        let configuration = scalar_identifier(reading.location_id.as_ref(), "location_id")
            .ok()
            .and_then(|location| self.cache.lookup(&location));

        if configuration.is_none() {
            debug!(
                location_id = ?reading.location_id,
                "No configuration yet for location"
            );
        }

        EnrichedObservation {
            timestamp: render_local_timestamp(reading.event_time),
            data: reading,
            configuration,
        }
    }
}
