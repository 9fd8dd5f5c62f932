use std::path::PathBuf;

use thiserror::Error;

/// Everything that can end a transcription request early.
///
/// Process-level failures never appear here directly: the normaliser and the
/// invoker translate them into [`PipelineError::Conversion`] or
/// [`PipelineError::Engine`] at the call site.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The resolved model file does not exist. Caused by caller input.
    #[error("model '{model}' for language '{language}' not found at {}", .path.display())]
    ModelNotFound {
        model: String,
        language: String,
        path: PathBuf,
    },

    /// ffmpeg exited unsuccessfully, could not be started, or timed out.
    /// Carries the captured stderr (or a description of the failure).
    #[error("ffmpeg conversion failed: {0}")]
    Conversion(String),

    /// whisper-cli exited unsuccessfully, could not be started, or timed out.
    #[error("whisper CLI failed: {0}")]
    Engine(String),

    /// The engine's JSON artifact did not have the expected structure.
    #[error("unexpected transcription output: {0}")]
    OutputShape(String),

    /// The engine reported success but its JSON artifact could not be read.
    #[error("failed to read transcription output {}", .path.display())]
    ResultMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scratch storage I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// `true` when the failure was caused by the request itself.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::ModelNotFound { .. })
    }
}
