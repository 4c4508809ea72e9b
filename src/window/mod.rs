//! Tumbling-window framework
//!
//! Events are bucketed by event time into fixed-length, non-overlapping
//! windows. The aggregation is pluggable through the [`Aggregator`] trait so
//! domain accumulators can be tested apart from the windowing mechanics.

mod aggregator;
mod engine;
mod types;

pub use aggregator::Aggregator;
pub use engine::{WindowEngine, WindowResult};
pub use types::WindowKey;
