//! Wiring of the pipeline, the ingest listener and the push endpoint.

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::ingest::start_ingest_listener;
use crate::logs::LogSink;
use crate::pipeline::Pipeline;
use crate::web::{start_web_server, AppState, BroadcastHub};
use std::sync::Arc;
use tracing::{error, info};

/// Build the shared components for `config`.
pub async fn build_state(config: &ServiceConfig) -> Result<AppState> {
    let sink = Arc::new(LogSink::open(&config.log_dir).await?);
    let hub = Arc::new(BroadcastHub::new(
        sink.clone(),
        config.broadcast_capacity,
        config.max_subscribers,
    ));
    let pipeline = Arc::new(Pipeline::new(sink.clone(), hub.clone()));

    Ok(AppState {
        pipeline,
        hub,
        sink,
    })
}

/// Run both listeners until one of them fails.
pub async fn run_service(config: ServiceConfig) -> Result<()> {
    let state = build_state(&config).await?;
    info!("Writing logs to {:?}", state.sink.dir());

    let ingest_addr = config.ingest_address();
    let ingest = start_ingest_listener(&ingest_addr, state.pipeline.clone());
    let web = start_web_server(&config, state);

    tokio::select! {
        result = ingest => {
            if let Err(e) = &result {
                error!("Ingest listener stopped: {}", e);
            }
            result
        }
        result = web => {
            if let Err(e) = &result {
                error!("Web server stopped: {}", e);
            }
            result
        }
    }
}
