//! Latest-value configuration cache shared between config ingest and
//! enrichment
//!
//! Each write replaces the previous record for that location outright. Reads
//! see whatever was written last; there is no versioning, TTL, or snapshot
//! isolation across keys.

use dashmap::DashMap;
use tracing::debug;

use crate::models::ConfigRecord;

/// Concurrent map from location key to its most recent configuration
#[derive(Debug, Default)]
pub struct ConfigCache {
    entries: DashMap<String, ConfigRecord>,
}

impl ConfigCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` for `location`, replacing any previous record
    pub fn upsert(&self, location: impl Into<String>, record: ConfigRecord) {
        let location = location.into();
        let replaced = self.entries.insert(location.clone(), record).is_some();
        debug!(location = %location, replaced, "Configuration stored");
    }

    /// Current configuration for `location`, `None` if none has arrived yet
    pub fn lookup(&self, location: &str) -> Option<ConfigRecord> {
        self.entries.get(location).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, location: &str) -> bool {
        self.entries.contains_key(location)
    }

    /// Number of locations with a known configuration
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
