//! Push endpoint for dashboard subscribers.
//!
//! Subscribers connect over WebSocket (at `/` or `/ws`), receive a replay of
//! the error and incident logs, then every aggregated snapshot and log update
//! as it happens. A few read-only JSON endpoints sit alongside.

pub mod handlers;
pub mod router;
pub mod websocket;

// Re-export commonly used items
pub use router::create_app;
pub use websocket::{BroadcastHub, Subscription};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::logs::LogSink;
use crate::pipeline::Pipeline;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Shared handles available to every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub hub: Arc<BroadcastHub>,
    pub sink: Arc<LogSink>,
}

/// Start the push endpoint and serve until the server fails.
pub async fn start_web_server(config: &ServiceConfig, state: AppState) -> Result<()> {
    let app = create_app(config, state);

    let addr = config
        .web_address()
        .parse::<SocketAddr>()
        .map_err(|e| ServiceError::config_error(format!("Invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ServiceError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    info!("WebSocket endpoint: ws://{}/ws", addr);
    info!("API endpoint: http://{}/api/snapshot", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| ServiceError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}
