//! Result extraction from whisper-cli's `-ojf` JSON artifact.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::PipelineError;

/// One recognised segment. Only the text is consumed; timing and token
/// detail in the full JSON output are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
}

/// Parsed engine output: an ordered sequence of segments.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Transcript {
    #[serde(rename = "transcription")]
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Parse the JSON artifact text.
    pub fn parse(content: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(content)
            .map_err(|e| PipelineError::OutputShape(format!("invalid transcription JSON: {e}")))
    }

    /// Text of the first segment with surrounding whitespace trimmed.
    pub fn first_text(&self) -> Result<&str, PipelineError> {
        self.segments
            .first()
            .map(|segment| segment.text.trim())
            .ok_or_else(|| PipelineError::OutputShape("transcription contains no segments".into()))
    }
}

/// Decode artifact bytes as UTF-8, replacing invalid sequences instead of failing.
pub fn decode_artifact(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                valid_up_to = e.utf8_error().valid_up_to(),
                "transcription output is not valid UTF-8; decoding with replacement characters"
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

/// Read `json_path` and return the trimmed text of its first segment.
pub async fn read_transcript(json_path: &Path) -> Result<String, PipelineError> {
    let bytes = tokio::fs::read(json_path)
        .await
        .map_err(|source| PipelineError::ResultMissing {
            path: json_path.to_path_buf(),
            source,
        })?;
    debug!(path = %json_path.display(), size_bytes = bytes.len(), "reading transcription output");

    let content = decode_artifact(bytes);
    let transcript = Transcript::parse(&content)?;
    transcript.first_text().map(str::to_owned)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
