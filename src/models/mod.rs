//! Data models for solarflow
//!
//! This module contains the typed records that flow through the pipeline:
//! normalized readings, location configuration, enriched observations,
//! window summaries and hazard decisions.

pub mod alert;
pub mod configuration;
pub mod error;
pub mod observation;
pub mod reading;
pub mod summary;
pub mod validation;

// Re-export commonly used types
pub use alert::AlertDecision;
pub use configuration::ConfigRecord;
pub use error::{ValidationError, ValidationErrorKind, ValidationResult};
pub use observation::{render_local_timestamp, EnrichedObservation};
pub use reading::PanelReading;
pub use summary::{PanelSummary, WindowedSummary};
pub use validation::{now_nanos, parse_event_time, parse_f64_or, scalar_identifier};
