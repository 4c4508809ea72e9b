//! solarflow library
//!
//! This library exposes the streaming core (windowing, aggregation,
//! enrichment, danger detection), the Kafka jobs built on it and the HTTP
//! source, for use by the binary and by integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod jobs;
pub mod kafka;
pub mod logging;
pub mod models;
pub mod processing;
pub mod test_utils;
pub mod window;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use error::{Error, Result};

// Re-export model types
pub use models::{
    AlertDecision, ConfigRecord, EnrichedObservation, PanelReading, PanelSummary,
    ValidationError, ValidationErrorKind, WindowedSummary,
};

// Re-export API server functions
pub use api::server::{create_router, create_server, shutdown_signal};

// Re-export health check types
pub use api::{
    BuildInfo, ComponentHealth, HealthResponse, HealthState, HealthStatus, ReadyResponse,
};
