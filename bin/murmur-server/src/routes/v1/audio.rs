//! Audio transcription route (whisper.cpp) – synchronous request/response.
//!
//! The upload is normalised to 16 kHz mono PCM WAV with ffmpeg when needed,
//! transcribed by whisper-cli, and the first segment's text is returned in
//! the OpenAI `{"text": ...}` shape.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use murmur_core::{ModelSelector, UploadedAudio};
use tracing::debug;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::v1::audio::{ErrorResponse, TranscriptionResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(transcribe_upload))]
pub struct AudioApi;

/// Register audio routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/audio/transcriptions", post(transcribe_upload))
}

/// Speech-to-text transcription via file upload (`POST /v1/audio/transcriptions`).
///
/// Form fields:
/// - `file` (required): audio payload of any type ffmpeg understands.
/// - `model` (default `"base"`): `"whisper-1"` selects the server's default model.
/// - `language` (default `"en"`).
///
/// Other fields sent by OpenAI clients (`response_format`, `temperature`, …)
/// are accepted and ignored.
#[utoipa::path(
    post,
    path = "/v1/audio/transcriptions",
    tag = "audio",
    request_body(
        content = crate::schemas::v1::audio::TranscriptionUpload,
        content_type = "multipart/form-data",
        description = "Audio file upload"
    ),
    responses(
        (status = 200, description = "Transcribed text", body = TranscriptionResponse),
        (status = 400, description = "Unknown model/language or malformed form", body = ErrorResponse),
        (status = 413, description = "Upload too large", body = ErrorResponse),
        (status = 500, description = "Conversion, engine or internal failure", body = ErrorResponse),
    )
)]
pub async fn transcribe_upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, ServerError> {
    let (upload, selector) = read_form(multipart).await?;

    debug!(
        file_name = upload.file_name.as_deref().unwrap_or(""),
        content_type = upload.content_type.as_deref().unwrap_or(""),
        size_bytes = upload.bytes.len(),
        model = %selector.model,
        language = %selector.language,
        "received transcription request"
    );

    let text = state.pipeline.transcribe(&upload, &selector).await?;
    Ok(Json(TranscriptionResponse { text }))
}

async fn read_form(mut multipart: Multipart) -> Result<(UploadedAudio, ModelSelector), ServerError> {
    let mut upload: Option<UploadedAudio> = None;
    let mut selector = ModelSelector::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().map(str::to_owned);
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await?;
                upload = Some(UploadedAudio {
                    bytes,
                    content_type,
                    file_name,
                });
            }
            "model" => {
                if let Some(model) = non_blank(field.text().await?) {
                    selector.model = model;
                }
            }
            "language" => {
                if let Some(language) = non_blank(field.text().await?) {
                    selector.language = language;
                }
            }
            other => debug!(field = other, "ignoring form field"),
        }
    }

    let upload =
        upload.ok_or_else(|| ServerError::BadRequest("Missing required form field 'file'".into()))?;
    Ok((upload, selector))
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use murmur_core::testing::{config_in, install_model, leftover_files, FakeOutcome, FakeRunner};
    use murmur_core::{Pipeline, PipelineConfig};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::error::UNEXPECTED_ERROR_MESSAGE;
    use crate::routes;
    use crate::state::AppState;

    use super::*;

    const BOUNDARY: &str = "murmur-test-boundary";

    struct Part<'a> {
        name: &'a str,
        file_name: Option<&'a str>,
        content_type: Option<&'a str>,
        data: &'a [u8],
    }

    fn text_part<'a>(name: &'a str, value: &'a str) -> Part<'a> {
        Part {
            name,
            file_name: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }

    fn file_part<'a>(file_name: &'a str, content_type: &'a str, data: &'a [u8]) -> Part<'a> {
        Part {
            name: "file",
            file_name: Some(file_name),
            content_type: Some(content_type),
            data,
        }
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
            if let Some(file_name) = part.file_name {
                disposition.push_str(&format!("; filename=\"{file_name}\""));
            }
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"\r\n");
            if let Some(ct) = part.content_type {
                body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    struct TestServer {
        _dir: tempfile::TempDir,
        cfg: PipelineConfig,
        runner: Arc<FakeRunner>,
        app: Router,
    }

    impl TestServer {
        fn new(runner: FakeRunner) -> Self {
            Self::with_lookup(runner, |_| None)
        }

        /// Server whose non-pipeline settings come from `lookup`.
        fn with_lookup(runner: FakeRunner, lookup: impl Fn(&str) -> Option<String>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let cfg = config_in(dir.path()).unwrap();
            install_model(&cfg, "base", "en").unwrap();
            install_model(&cfg, "small", "en").unwrap();

            let runner = Arc::new(runner);
            let config = Config {
                pipeline: cfg.clone(),
                ..Config::from_lookup(lookup)
            };
            let pipeline = Pipeline::new(cfg.clone(), runner.clone());
            let app = routes::build(Arc::new(AppState::new(config, pipeline)));

            Self {
                _dir: dir,
                cfg,
                runner,
                app,
            }
        }

        async fn post(&self, parts: &[Part<'_>]) -> (StatusCode, Value) {
            let request = Request::builder()
                .method("POST")
                .uri("/v1/audio/transcriptions")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap();

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            (status, serde_json::from_slice(&bytes).unwrap())
        }

        fn assert_no_leftovers(&self) {
            assert_eq!(leftover_files(&self.cfg.scratch_dir), 0);
            assert_eq!(leftover_files(&self.cfg.output_dir), 0);
        }
    }

    #[tokio::test]
    async fn returns_trimmed_text_of_first_segment() {
        let server = TestServer::new(FakeRunner::new());

        let (status, body) = server
            .post(&[file_part("note.webm", "audio/webm", b"webm-bytes")])
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "text": "hello world" }));
        assert_eq!(server.runner.conversion_calls().len(), 1);
        server.assert_no_leftovers();
    }

    #[tokio::test]
    async fn wav_upload_skips_conversion() {
        let server = TestServer::new(FakeRunner::new());

        let (status, _) = server
            .post(&[file_part("a.wav", "audio/wav", b"RIFF....WAVE")])
            .await;

        assert_eq!(status, StatusCode::OK);
        assert!(server.runner.conversion_calls().is_empty());
        server.assert_no_leftovers();
    }

    #[tokio::test]
    async fn unknown_model_is_bad_request_without_engine_run() {
        let server = TestServer::new(FakeRunner::new());

        let (status, body) = server
            .post(&[
                file_part("a.mp3", "audio/mpeg", b"ID3"),
                text_part("model", "tiny"),
                text_part("language", "de"),
            ])
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Model 'tiny' for language 'de' does not exist. Please check the model name and language."
        );
        assert!(server.runner.engine_calls().is_empty());
        server.assert_no_leftovers();
    }

    #[tokio::test]
    async fn whisper_1_uses_default_model() {
        let server = TestServer::new(FakeRunner::new());

        let (status, _) = server
            .post(&[
                file_part("a.ogg", "audio/ogg", b"OggS"),
                text_part("model", "whisper-1"),
                text_part("response_format", "json"),
            ])
            .await;

        assert_eq!(status, StatusCode::OK);
        let call = &server.runner.engine_calls()[0];
        assert_eq!(
            call.value_of("-m").map(PathBuf::from),
            Some(server.cfg.model_path("small", "en"))
        );
    }

    #[tokio::test]
    async fn conversion_failure_reports_ffmpeg_stderr() {
        let server = TestServer::new(
            FakeRunner::new().with_conversion(FakeOutcome::fail(1, "Invalid data found when processing input")),
        );

        let (status, body) = server
            .post(&[file_part("broken.m4a", "audio/mp4", b"not audio")])
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "ffmpeg conversion failed: Invalid data found when processing input"
        );
        assert!(server.runner.engine_calls().is_empty());
        server.assert_no_leftovers();
    }

    #[tokio::test]
    async fn engine_failure_reports_whisper_cli() {
        let server = TestServer::new(FakeRunner::new().with_engine(FakeOutcome::fail(3, "")));

        let (status, body) = server
            .post(&[file_part("a.wav", "audio/x-wav", b"RIFF")])
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Whisper CLI failed: Unknown error");
        server.assert_no_leftovers();
    }

    #[tokio::test]
    async fn empty_transcription_is_internal_error() {
        let server = TestServer::new(FakeRunner::new().with_transcript(r#"{"transcription":[]}"#));

        let (status, body) = server
            .post(&[file_part("a.wav", "audio/wav", b"RIFF")])
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], UNEXPECTED_ERROR_MESSAGE);
        server.assert_no_leftovers();
    }

    #[tokio::test]
    async fn missing_file_field_is_bad_request() {
        let server = TestServer::new(FakeRunner::new());

        let (status, body) = server.post(&[text_part("model", "base")]).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required form field 'file'");
        assert!(server.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_fields_fall_back_to_defaults() {
        let server = TestServer::new(FakeRunner::new());

        let (status, _) = server
            .post(&[
                file_part("a.flac", "audio/flac", b"fLaC"),
                text_part("model", " "),
                text_part("language", ""),
            ])
            .await;

        assert_eq!(status, StatusCode::OK);
        let call = &server.runner.engine_calls()[0];
        assert_eq!(call.value_of("-l"), Some(std::ffi::OsStr::new("en")));
        assert_eq!(
            call.value_of("-m").map(PathBuf::from),
            Some(server.cfg.model_path("base", "en"))
        );
    }

    #[tokio::test]
    async fn trace_id_is_echoed() {
        let server = TestServer::new(FakeRunner::new());
        let trace_id = "7d3c1d8e-2b51-4c1f-9a57-0d6f5c2e9b10";

        let response = server
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .header("x-trace-id", trace_id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-trace-id"], trace_id);
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let server = TestServer::with_lookup(FakeRunner::new(), |key| {
            (key == "MURMUR_MAX_UPLOAD_SIZE_MB").then(|| "1".to_owned())
        });
        let audio = vec![0u8; 2 * 1024 * 1024];

        let (status, body) = server
            .post(&[file_part("long.webm", "audio/webm", &audio)])
            .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("too large"), "got {message:?}");
        assert!(server.runner.calls().is_empty());
        server.assert_no_leftovers();
    }
}
