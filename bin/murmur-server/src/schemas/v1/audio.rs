use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Multipart form accepted by `POST /v1/audio/transcriptions`.
///
/// Documentation only; the handler reads the fields from the stream directly.
#[allow(dead_code)]
#[derive(Debug, ToSchema)]
pub struct TranscriptionUpload {
    /// Audio payload, any container ffmpeg can read.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Model name (default `"base"`); `"whisper-1"` maps to the server default.
    pub model: Option<String>,
    /// Language code (default `"en"`).
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TranscriptionResponse {
    /// Recognised text of the first segment, whitespace-trimmed.
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
