//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection, upload limit)
//! - OpenAPI document at `/api-docs/openapi.json`
//! - Health / heartbeat route
//! - OpenAI-compatible `/v1` routes

pub mod doc;
mod health;
mod v1;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use std::sync::Arc;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(doc::router())
        .nest("/v1", v1::router())
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes()))
        // Outermost layers execute first on the way in.
        .layer(cors::cors_layer(&state.config))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}
