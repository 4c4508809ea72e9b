//! Window bounds for tumbling windows

use serde::{Deserialize, Serialize};
use std::fmt;

const NANOS_PER_MILLI: i64 = 1_000_000;

/// Half-open `[start, end)` bounds of one tumbling window, in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowKey {
    pub start: i64,
    pub end: i64,
}

impl WindowKey {
    /// The window of length `length` (nanoseconds) containing `event_time`
    ///
    /// Uses floor division so timestamps before the epoch still land in the
    /// window that contains them. `None` when the bounds fall outside `i64`.
    pub fn for_event(event_time: i64, length: i64) -> Option<Self> {
        let start = event_time.div_euclid(length).checked_mul(length)?;
        let end = start.checked_add(length)?;
        Some(Self { start, end })
    }

    /// Check if a timestamp falls within this window
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// A window is retired once processing time has passed `end + grace`
    pub fn is_retired(&self, now: i64, grace: i64) -> bool {
        self.end.saturating_add(grace) <= now
    }

    pub fn start_millis(&self) -> i64 {
        self.start.div_euclid(NANOS_PER_MILLI)
    }

    pub fn end_millis(&self) -> i64 {
        self.end.div_euclid(NANOS_PER_MILLI)
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
