//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a `{"error": "..."}` JSON body with an appropriate status code.
//!
//! Missing models are the caller's fault and come back as 400. Conversion and
//! engine failures are 500 with the tool's stderr, which is what a client
//! needs to fix a bad upload. Anything else is logged in full and returned as
//! a generic message.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use murmur_core::PipelineError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Message returned for failures whose detail stays in the server log.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred during transcription";

/// All errors that can occur in the murmur-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded the configured upload limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Propagated from the transcription pipeline.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ServerError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m),
            ServerError::Pipeline(e) => pipeline_response(e),
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

fn pipeline_response(e: PipelineError) -> (StatusCode, String) {
    match e {
        PipelineError::ModelNotFound {
            model, language, ..
        } => (
            StatusCode::BAD_REQUEST,
            format!(
                "Model '{model}' for language '{language}' does not exist. \
                 Please check the model name and language."
            ),
        ),
        PipelineError::Conversion(details) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("ffmpeg conversion failed: {}", or_unknown(&details)),
        ),
        PipelineError::Engine(details) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Whisper CLI failed: {}", or_unknown(&details)),
        ),
        other => {
            error!(error = ?other, "unexpected error during transcription");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                UNEXPECTED_ERROR_MESSAGE.to_owned(),
            )
        }
    }
}

fn or_unknown(details: &str) -> &str {
    if details.trim().is_empty() {
        "Unknown error"
    } else {
        details
    }
}

impl From<MultipartError> for ServerError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(e.body_text())
        } else {
            ServerError::BadRequest(format!("Failed to read multipart body: {}", e.body_text()))
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tracing_test::traced_test;

    use super::*;

    async fn render(err: ServerError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        (status, body["error"].as_str().unwrap().to_owned())
    }

    #[tokio::test]
    async fn missing_model_is_a_client_error() {
        let (status, msg) = render(
            PipelineError::ModelNotFound {
                model: "tiny".into(),
                language: "xx".into(),
                path: "models/ggml-tiny.xx.bin".into(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            msg,
            "Model 'tiny' for language 'xx' does not exist. Please check the model name and language."
        );
    }

    #[tokio::test]
    async fn process_failures_name_the_failing_tool() {
        let (status, msg) = render(PipelineError::Conversion("Invalid data".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, "ffmpeg conversion failed: Invalid data");

        let (status, msg) = render(PipelineError::Engine(String::new()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, "Whisper CLI failed: Unknown error");
    }

    #[tokio::test]
    #[traced_test]
    async fn internal_details_are_not_leaked() {
        let (status, msg) = render(
            PipelineError::OutputShape("transcription contains no segments".into()).into(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, UNEXPECTED_ERROR_MESSAGE);
        assert!(logs_contain("transcription contains no segments"));
    }
}
