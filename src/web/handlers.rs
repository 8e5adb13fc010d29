//! HTTP handlers for the read-only API endpoints.

use crate::logs::LogClass;
use crate::web::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "subscribers": state.hub.subscriber_count().await,
    }))
}

/// Current aggregated snapshot, same shape as the live push message.
pub async fn get_snapshot(State(state): State<AppState>) -> Response {
    match state.pipeline.snapshot_json().await {
        Ok(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(e) => {
            error!("Failed to serialize snapshot: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Raw content of one log.
pub async fn get_log(State(state): State<AppState>, Path(class): Path<String>) -> Response {
    let class: LogClass = match class.parse() {
        Ok(class) => class,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match state.sink.read(class).await {
        Ok(Some(content)) => content.into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, format!("No {} logged", class)).into_response(),
        Err(e) => {
            error!("Failed to read {} log: {}", class, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
