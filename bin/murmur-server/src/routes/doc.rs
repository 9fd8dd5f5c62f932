//! OpenAPI document, served as JSON.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use super::{health, v1};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(title = "murmur", description = "Speech-to-text gateway over whisper.cpp"),
    tags(
        (name = "audio", description = "OpenAI-compatible transcription"),
        (name = "health", description = "Liveness"),
    )
)]
struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.merge(health::HealthApi::openapi());
    doc.merge(v1::api_docs());
    doc
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(get_docs())
}
