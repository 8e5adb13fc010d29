//! Battery telemetry readings, history and incident detection.
//!
//! This module holds the pure parts of the pipeline: decoding an inbound
//! payload into a safety-tagged [`Signature`], the append-only
//! [`SignatureStore`] with its temperature-rank median, and the
//! [`IncidentDetector`] that watches the unsafe tail of the history.

pub mod incident;
pub mod signature;
pub mod store;

// Re-export commonly used items
pub use incident::{DetectorState, Incident, IncidentDetector};
pub use signature::{is_safe, parse_signature, Signature};
pub use store::{AggregatedSnapshot, SignatureStore};
