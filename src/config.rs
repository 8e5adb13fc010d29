//! Service configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the ingestion listener and the push endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Host both listeners bind to
    pub host: String,
    /// Port for inbound producer connections
    pub ingest_port: u16,
    /// Port for the HTTP/WebSocket push endpoint
    pub web_port: u16,
    /// Directory holding `errors.log` and `incidents.log`
    pub log_dir: PathBuf,
    /// Whether to enable CORS
    pub enable_cors: bool,
    /// Maximum number of WebSocket subscribers
    pub max_subscribers: usize,
    /// Number of messages a slow subscriber may fall behind before skipping
    pub broadcast_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            ingest_port: crate::DEFAULT_INGEST_PORT,
            web_port: crate::DEFAULT_WEB_PORT,
            log_dir: PathBuf::from("."),
            enable_cors: true,
            max_subscribers: 100,
            broadcast_capacity: 256,
        }
    }
}

impl ServiceConfig {
    /// Create a new configuration with custom host and ports.
    pub fn new(host: impl Into<String>, ingest_port: u16, web_port: u16) -> Self {
        Self {
            host: host.into(),
            ingest_port,
            web_port,
            ..Default::default()
        }
    }

    /// Set the bind host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the inbound telemetry port.
    pub fn with_ingest_port(mut self, port: u16) -> Self {
        self.ingest_port = port;
        self
    }

    /// Set the push endpoint port.
    pub fn with_web_port(mut self, port: u16) -> Self {
        self.web_port = port;
        self
    }

    /// Set the log directory.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    /// Set the maximum number of WebSocket subscribers.
    pub fn with_max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Set the broadcast channel capacity.
    pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Bind address of the ingestion listener.
    pub fn ingest_address(&self) -> String {
        format!("{}:{}", self.host, self.ingest_port)
    }

    /// Bind address of the push endpoint.
    pub fn web_address(&self) -> String {
        format!("{}:{}", self.host, self.web_port)
    }
}
