//! Web application router and middleware setup.

use crate::config::ServiceConfig;
use crate::web::{handlers, websocket, AppState};
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the axum application with all routes and middleware.
pub fn create_app(config: &ServiceConfig, state: AppState) -> Router {
    let mut app = Router::new()
        // The dashboard connects to the bare host
        .route("/", get(websocket::websocket_handler))
        .route("/ws", get(websocket::websocket_handler))
        .route("/api/health", get(handlers::health_check))
        .route("/api/snapshot", get(handlers::get_snapshot))
        .route("/api/logs/:class", get(handlers::get_log))
        .with_state(state);

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
