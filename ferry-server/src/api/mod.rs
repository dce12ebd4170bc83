//! API Module
//!
//! HTTP API layer for the job runner.

pub mod execute;
pub mod health;

use axum::{
    Router,
    routing::{get, post},
};
use ferry_runner::ExecutionService;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared handler state
pub type AppState = Arc<dyn ExecutionService>;

/// Create the main API router with all endpoints
pub fn create_router(service: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/execute", post(execute::execute))
        .route("/invoke", post(execute::invoke))
        // Add state and middleware
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}
