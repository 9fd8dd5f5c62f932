//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

use murmur_core::config::{
    DEFAULT_ENGINE_BINARY, DEFAULT_MODEL, DEFAULT_MODEL_PATH_TEMPLATE, DEFAULT_PROCESS_TIMEOUT,
};
use murmur_core::PipelineConfig;

/// Runtime configuration for murmur-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// next to a whisper.cpp checkout without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind, built from `HOST` and `PORT` (default: `"0.0.0.0:4444"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Largest accepted request body, in MiB.
    pub max_upload_size_mb: usize,

    /// Comma-separated CORS origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Paths, binaries and limits handed to the transcription pipeline.
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = Env(lookup);

        let host = env.or("HOST", "0.0.0.0");
        let port: u16 = env.parse("PORT", 4444);

        Self {
            bind_address: format!("{host}:{port}"),
            log_level: env.or("MURMUR_LOG", "info"),
            log_json: env
                .get("MURMUR_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            max_upload_size_mb: env.parse("MURMUR_MAX_UPLOAD_SIZE_MB", 100),
            cors_allowed_origins: env.get("MURMUR_CORS_ORIGINS").filter(|v| !v.trim().is_empty()),
            pipeline: PipelineConfig {
                model_path_template: env.or("WHISPER_MODEL_TEMPLATE", DEFAULT_MODEL_PATH_TEMPLATE),
                engine_binary: PathBuf::from(env.or("WHISPER_BINARY", DEFAULT_ENGINE_BINARY)),
                ffmpeg_binary: PathBuf::from(env.or("FFMPEG_BINARY", "ffmpeg")),
                default_model: env.or("WHISPER_DEFAULT_MODEL", DEFAULT_MODEL),
                scratch_dir: env
                    .get("MURMUR_SCRATCH_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(std::env::temp_dir),
                output_dir: PathBuf::from(env.or("MURMUR_OUTPUT_DIR", "data")),
                process_timeout: Duration::from_secs(env.parse(
                    "MURMUR_PROCESS_TIMEOUT_SECS",
                    DEFAULT_PROCESS_TIMEOUT.as_secs(),
                )),
            },
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_owned())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_whisper_cpp_checkout() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.bind_address, "0.0.0.0:4444");
        assert_eq!(cfg.pipeline.engine_binary, PathBuf::from(DEFAULT_ENGINE_BINARY));
        assert_eq!(cfg.pipeline.default_model, "small");
        assert_eq!(cfg.pipeline.output_dir, PathBuf::from("data"));
        assert_eq!(cfg.max_upload_bytes(), 100 * 1024 * 1024);
        assert!(cfg.cors_allowed_origins.is_none());
        assert!(!cfg.log_json);
    }

    #[test]
    fn environment_overrides_are_applied() {
        let cfg = config_from(&[
            ("PORT", "8080"),
            ("WHISPER_BINARY", "/opt/whisper/bin/whisper-cli"),
            ("WHISPER_DEFAULT_MODEL", "medium"),
            ("MURMUR_PROCESS_TIMEOUT_SECS", "30"),
            ("MURMUR_LOG_JSON", "TRUE"),
        ]);
        assert_eq!(cfg.bind_address, "0.0.0.0:8080");
        assert_eq!(cfg.pipeline.engine_binary, PathBuf::from("/opt/whisper/bin/whisper-cli"));
        assert_eq!(cfg.pipeline.default_model, "medium");
        assert_eq!(cfg.pipeline.process_timeout, Duration::from_secs(30));
        assert!(cfg.log_json);
    }

    #[test]
    fn unparseable_numbers_fall_back_to_defaults() {
        let cfg = config_from(&[("PORT", "eighty"), ("MURMUR_MAX_UPLOAD_SIZE_MB", "-1")]);
        assert_eq!(cfg.bind_address, "0.0.0.0:4444");
        assert_eq!(cfg.max_upload_size_mb, 100);
    }
}
