//! Pipeline configuration.
//!
//! Built once at process start (usually from the server's environment-derived
//! config) and shared read-only by every request.

use std::path::PathBuf;
use std::time::Duration;

/// Model path template used by a stock whisper.cpp checkout.
pub const DEFAULT_MODEL_PATH_TEMPLATE: &str = "./whisper.cpp/models/ggml-{model}.{language}.bin";

/// whisper-cli location inside a stock whisper.cpp build tree.
pub const DEFAULT_ENGINE_BINARY: &str = "./whisper.cpp/build/bin/whisper-cli";

/// Model substituted for the OpenAI `whisper-1` alias.
pub const DEFAULT_MODEL: &str = "small";

/// Upper bound for a single ffmpeg or whisper-cli run.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(600);

/// Static settings for the transcription pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model file template; `{model}` and `{language}` are substituted.
    pub model_path_template: String,

    /// Path to the whisper CLI executable.
    pub engine_binary: PathBuf,

    /// Path (or bare name resolved through `PATH`) of the ffmpeg executable.
    pub ffmpeg_binary: PathBuf,

    /// Model name used when the caller asks for `whisper-1`.
    pub default_model: String,

    /// Directory holding staged uploads and converted WAV files.
    pub scratch_dir: PathBuf,

    /// Directory under which engine output prefixes are allocated.
    pub output_dir: PathBuf,

    /// Timeout applied to each external process; the child is killed on expiry.
    pub process_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path_template: DEFAULT_MODEL_PATH_TEMPLATE.to_owned(),
            engine_binary: PathBuf::from(DEFAULT_ENGINE_BINARY),
            ffmpeg_binary: PathBuf::from("ffmpeg"),
            default_model: DEFAULT_MODEL.to_owned(),
            scratch_dir: std::env::temp_dir(),
            output_dir: PathBuf::from("data"),
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    /// Expand the model path template for a concrete model/language pair.
    pub fn model_path(&self, model: &str, language: &str) -> PathBuf {
        PathBuf::from(
            self.model_path_template
                .replace("{model}", model)
                .replace("{language}", language),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_template_matches_whisper_cpp_layout() {
        let cfg = PipelineConfig::default();
        assert_eq!(
            cfg.model_path("base", "en"),
            PathBuf::from("./whisper.cpp/models/ggml-base.en.bin")
        );
    }

    #[test]
    fn template_substitutes_every_placeholder() {
        let cfg = PipelineConfig {
            model_path_template: "/models/{language}/{model}/ggml-{model}.bin".into(),
            ..Default::default()
        };
        assert_eq!(
            cfg.model_path("tiny", "de"),
            PathBuf::from("/models/de/tiny/ggml-tiny.bin")
        );
    }
}
