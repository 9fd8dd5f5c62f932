//! The per-request transcription pipeline.
//!
//! `resolve model → normalise upload → run engine → extract text`, followed
//! on every path by release of all staged artifacts. The two external
//! processes run strictly one after the other; concurrency exists only
//! between requests, which never share a path.
//!
//! The model is resolved before any process runs, so a request with both an
//! unknown model and an unconvertible upload fails as `ModelNotFound`, not as
//! a conversion error.

use std::sync::Arc;

use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::engine::{ModelSelector, TranscriptionInvoker};
use crate::error::PipelineError;
use crate::extract;
use crate::normalize::{FormatNormalizer, UploadedAudio};
use crate::process::{CommandRunner, ProcessRunner};
use crate::staging::{RequestArtifacts, ScratchArea};

/// Snapshot of whether the pipeline's external dependencies look usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    /// The configured whisper CLI path exists.
    pub engine_binary_found: bool,
    /// A file can be created in the scratch directory.
    pub scratch_dir_writable: bool,
    /// A file can be created in the engine output directory.
    pub output_dir_writable: bool,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.engine_binary_found && self.scratch_dir_writable && self.output_dir_writable
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    scratch: ScratchArea,
    runner: Arc<dyn ProcessRunner>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let scratch = ScratchArea::new(config.scratch_dir.clone());
        Self {
            config,
            scratch,
            runner,
        }
    }

    /// Pipeline that spawns the real ffmpeg and whisper-cli binaries.
    pub fn with_command_runner(config: PipelineConfig) -> Self {
        Self::new(config, Arc::new(CommandRunner))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Create the scratch and output directories if they are missing.
    pub async fn prepare_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.config.scratch_dir).await?;
        tokio::fs::create_dir_all(&self.config.output_dir).await
    }

    /// Check the engine binary and both working directories.
    ///
    /// ffmpeg is usually found through `PATH` and is not checked here.
    pub async fn readiness(&self) -> Readiness {
        Readiness {
            engine_binary_found: tokio::fs::try_exists(&self.config.engine_binary)
                .await
                .unwrap_or(false),
            scratch_dir_writable: self.scratch.is_writable().await,
            output_dir_writable: ScratchArea::new(&self.config.output_dir)
                .is_writable()
                .await,
        }
    }

    /// Transcribe one upload and return the trimmed text.
    ///
    /// All temporary files are released before this returns, whatever the
    /// outcome. If the future is dropped mid-flight, the owned artifacts are
    /// removed on drop and any running child process is killed.
    pub async fn transcribe(
        &self,
        upload: &UploadedAudio,
        selector: &ModelSelector,
    ) -> Result<String, PipelineError> {
        let span = info_span!(
            "transcription",
            request_id = %Uuid::new_v4(),
            model = %selector.model,
            language = %selector.language,
        );

        async move {
            let mut artifacts = RequestArtifacts::new();
            let result = self.run(upload, selector, &mut artifacts).await;
            artifacts.release_all();

            if let Ok(text) = &result {
                info!(text_len = text.len(), "transcription finished");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        upload: &UploadedAudio,
        selector: &ModelSelector,
        artifacts: &mut RequestArtifacts,
    ) -> Result<String, PipelineError> {
        // Checked first so a bad model never costs an ffmpeg run.
        let model = selector.resolve(&self.config).await?;

        let wav = FormatNormalizer {
            scratch: &self.scratch,
            runner: self.runner.as_ref(),
            ffmpeg: &self.config.ffmpeg_binary,
            timeout: self.config.process_timeout,
        }
        .normalize(upload, artifacts)
        .await?;

        let json_path = TranscriptionInvoker {
            runner: self.runner.as_ref(),
            binary: &self.config.engine_binary,
            output_dir: &self.config.output_dir,
            timeout: self.config.process_timeout,
        }
        .invoke(&model, &wav, artifacts)
        .await?;

        extract::read_transcript(&json_path).await
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
