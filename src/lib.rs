//! # Battery Telemetry
//!
//! Streaming service for battery temperature telemetry. Producers push
//! newline-delimited JSON readings over TCP; every reading is tagged against
//! the safe temperature band, appended to a shared history and pushed, along
//! with the current median, to every dashboard connected over WebSocket.
//!
//! ## Features
//!
//! - **Safety tagging**: readings outside 20–80 °C are flagged unsafe
//! - **Incident detection**: more than three unsafe readings within five
//!   seconds are written to `incidents.log`
//! - **Error log**: undecodable payloads are written to `errors.log`
//! - **Live fan-out**: aggregated snapshots and log updates over WebSocket,
//!   with a log replay for every new subscriber
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use battery_telemetry::{run_service, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::default().with_log_dir("logs");
//!     run_service(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod logs;
pub mod pipeline;
pub mod service;
pub mod telemetry;
pub mod web;

// Re-export public API
pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use logs::{LogClass, LogSink};
pub use pipeline::{IngestOutcome, Pipeline};
pub use service::run_service;
pub use telemetry::{AggregatedSnapshot, IncidentDetector, Signature, SignatureStore};
pub use web::{start_web_server, AppState, BroadcastHub};

/// The default port for inbound telemetry
pub const DEFAULT_INGEST_PORT: u16 = 12000;

/// The default port for the WebSocket push endpoint
pub const DEFAULT_WEB_PORT: u16 = 8080;
