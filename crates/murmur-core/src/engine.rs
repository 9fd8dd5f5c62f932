//! Transcription invoker: model resolution and the whisper-cli call.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::process::{CommandLine, ProcessRunner};
use crate::staging::{OutputPrefix, RequestArtifacts};

/// OpenAI's model id; rewritten to [`PipelineConfig::default_model`].
pub const WHISPER_1_SENTINEL: &str = "whisper-1";

/// Model used when the request does not name one.
pub const DEFAULT_REQUEST_MODEL: &str = "base";

/// Language used when the request does not name one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// The (model, language) pair chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelector {
    pub model: String,
    pub language: String,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self {
            model: DEFAULT_REQUEST_MODEL.to_owned(),
            language: DEFAULT_LANGUAGE.to_owned(),
        }
    }
}

impl ModelSelector {
    pub fn new(model: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            language: language.into(),
        }
    }

    /// Model name after the `whisper-1` rewrite.
    pub fn effective_model<'a>(&'a self, default_model: &'a str) -> &'a str {
        if self.model == WHISPER_1_SENTINEL {
            default_model
        } else {
            &self.model
        }
    }

    /// Resolve to an existing model file.
    ///
    /// Names that could escape the model directory are treated like any
    /// other unknown model.
    pub async fn resolve(&self, config: &PipelineConfig) -> Result<ResolvedModel, PipelineError> {
        let name = self.effective_model(&config.default_model);
        let path = config.model_path(name, &self.language);

        let exists = is_plain_name(name)
            && is_plain_name(&self.language)
            && tokio::fs::try_exists(&path).await.unwrap_or(false);
        if !exists {
            return Err(PipelineError::ModelNotFound {
                model: self.model.clone(),
                language: self.language.clone(),
                path,
            });
        }

        debug!(
            requested = %self.model,
            model = %name,
            language = %self.language,
            path = %path.display(),
            "model resolved"
        );
        Ok(ResolvedModel {
            requested: self.model.clone(),
            name: name.to_owned(),
            language: self.language.clone(),
            path,
        })
    }
}

fn is_plain_name(s: &str) -> bool {
    !s.is_empty() && !s.contains(['/', '\\']) && !s.contains("..")
}

/// A model selector whose model file was found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    /// Model name as sent by the caller (before the `whisper-1` rewrite).
    pub requested: String,
    /// Model name used to build the path.
    pub name: String,
    pub language: String,
    pub path: PathBuf,
}

/// One whisper-cli run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    pub binary: PathBuf,
    pub model_path: PathBuf,
    pub input: PathBuf,
    pub output_prefix: PathBuf,
    pub language: String,
}

impl EngineInvocation {
    /// `<binary> -m <model> -f <wav> -ojf -of <prefix> -l <language>`
    pub fn command_line(&self) -> CommandLine {
        CommandLine::new(&self.binary)
            .arg("-m")
            .arg(&self.model_path)
            .arg("-f")
            .arg(&self.input)
            .arg("-ojf")
            .arg("-of")
            .arg(&self.output_prefix)
            .arg("-l")
            .arg(&self.language)
    }
}

/// Runs whisper-cli against a canonical WAV.
pub struct TranscriptionInvoker<'a> {
    pub runner: &'a dyn ProcessRunner,
    pub binary: &'a Path,
    pub output_dir: &'a Path,
    pub timeout: Duration,
}

impl TranscriptionInvoker<'_> {
    /// Run the engine and return the path of its JSON artifact.
    ///
    /// The freshly allocated output prefix is registered in `artifacts`
    /// before the process starts.
    pub async fn invoke(
        &self,
        model: &ResolvedModel,
        wav: &Path,
        artifacts: &mut RequestArtifacts,
    ) -> Result<PathBuf, PipelineError> {
        let prefix = OutputPrefix::allocate(self.output_dir);
        let invocation = EngineInvocation {
            binary: self.binary.to_path_buf(),
            model_path: model.path.clone(),
            input: wav.to_path_buf(),
            output_prefix: prefix.as_path().to_path_buf(),
            language: model.language.clone(),
        };
        let json_path = prefix.json_path();
        artifacts.output = Some(prefix);

        let command = invocation.command_line();
        info!(
            requested = %model.requested,
            model = %model.name,
            command = %command,
            "running whisper CLI"
        );

        let output = self
            .runner
            .run(&command, self.timeout)
            .await
            .map_err(|e| {
                error!(error = %e, "whisper CLI could not be run");
                PipelineError::Engine(e.to_string())
            })?;

        let stdout = output.stdout_text();
        let stderr = output.stderr_text();
        debug!(stdout = %stdout, "whisper stdout");
        debug!(stderr = %stderr, "whisper stderr");

        if !output.success() {
            let stderr = stderr.trim().to_owned();
            error!(code = ?output.code, stderr = %stderr, "whisper CLI failed");
            return Err(PipelineError::Engine(stderr));
        }

        Ok(json_path)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
