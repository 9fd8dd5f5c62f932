//! Readiness endpoint.
//!
//! Reports whether requests can currently succeed: the whisper CLI must exist
//! and both working directories must accept new files.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::schemas::health::HealthResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Ready to transcribe", body = HealthResponse),
        (status = 503, description = "Engine binary missing or a working directory is not writable", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let readiness = state.pipeline.readiness().await;
    let (status, label) = if readiness.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            engine_binary_found: readiness.engine_binary_found,
            scratch_dir_writable: readiness.scratch_dir_writable,
            output_dir_writable: readiness.output_dir_writable,
        }),
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
