//! Ingestion pipeline: decode, store, detect, persist, broadcast.
//!
//! All mutation of the history, the incident detector and the order of
//! published snapshots goes through one async mutex. Decoding happens before
//! the lock is taken, so producers only contend on accepted readings.

use crate::error::ServiceError;
use crate::logs::{log_message, LogSink};
use crate::telemetry::{parse_signature, IncidentDetector, Signature, SignatureStore};
use crate::web::websocket::BroadcastHub;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// What happened to one inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Appended to the history
    Accepted { incident_raised: bool },
    /// Could not be decoded; recorded in the errors log
    Rejected,
}

#[derive(Debug, Default)]
struct PipelineState {
    store: SignatureStore,
    detector: IncidentDetector,
}

/// Shared handle driving every inbound reading through the pipeline.
#[derive(Debug)]
pub struct Pipeline {
    state: Mutex<PipelineState>,
    sink: Arc<LogSink>,
    hub: Arc<BroadcastHub>,
}

impl Pipeline {
    pub fn new(sink: Arc<LogSink>, hub: Arc<BroadcastHub>) -> Self {
        Self::with_detector(sink, hub, IncidentDetector::default())
    }

    /// Build a pipeline with a custom incident detector.
    pub fn with_detector(
        sink: Arc<LogSink>,
        hub: Arc<BroadcastHub>,
        detector: IncidentDetector,
    ) -> Self {
        Self {
            state: Mutex::new(PipelineState {
                store: SignatureStore::new(),
                detector,
            }),
            sink,
            hub,
        }
    }

    /// Process one framed payload.
    pub async fn ingest(&self, payload: &[u8]) -> IngestOutcome {
        match parse_signature(payload) {
            Ok(signature) => self.accept(signature).await,
            Err(err) => {
                self.report(&err).await;
                IngestOutcome::Rejected
            }
        }
    }

    async fn accept(&self, signature: Signature) -> IngestOutcome {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let unsafe_reading = !signature.is_safe;
        debug!(
            "Accepted reading {:.3} at {} (safe: {})",
            signature.temperature, signature.timestamp, signature.is_safe
        );
        state.store.append(signature);

        match serde_json::to_string(&state.store.aggregated_snapshot()) {
            Ok(json) => {
                self.hub.publish(json);
            }
            Err(e) => error!("Failed to serialize snapshot: {}", e),
        }

        let mut incident_raised = false;
        if unsafe_reading {
            let now = Utc::now().timestamp_millis();
            if let Some(incident) = state.detector.evaluate(state.store.history(), now) {
                self.report(&ServiceError::temperature_incident(incident.details()))
                    .await;
                incident_raised = true;
            }
        }

        IngestOutcome::Accepted { incident_raised }
    }

    /// Persist an error or incident and forward the updated log.
    async fn report(&self, err: &ServiceError) {
        let class = err.log_class();
        warn!("{}", err);

        match self.sink.write(class, &err.to_string()).await {
            Ok(content) => {
                self.hub.publish(log_message(class, &content));
            }
            Err(e) => error!("Failed to write {} log: {}", class, e),
        }
    }

    /// Current aggregated snapshot as JSON.
    pub async fn snapshot_json(&self) -> serde_json::Result<String> {
        let state = self.state.lock().await;
        serde_json::to_string(&state.store.aggregated_snapshot())
    }

    /// Number of accepted readings.
    pub async fn history_len(&self) -> usize {
        self.state.lock().await.store.len()
    }

    /// Owned copy of the accepted history.
    pub async fn history(&self) -> Vec<Signature> {
        self.state.lock().await.store.snapshot_all()
    }
}
