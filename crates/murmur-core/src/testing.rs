//! Test doubles for the process seam.
//!
//! [`FakeRunner`] stands in for both ffmpeg and whisper-cli. It records every
//! command line it receives and, on success, writes the files the real tool
//! would have written so the rest of the pipeline runs unchanged.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::PipelineConfig;
use crate::process::{CommandLine, ProcessError, ProcessOutput, ProcessRunner};

/// Minimal RIFF header, enough to look like a WAV file on disk.
pub const FAKE_WAV: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt ";

/// Engine artifact returned when a test does not provide its own.
pub const DEFAULT_TRANSCRIPT: &str = r#"{"transcription":[{"text":"  hello world  "}]}"#;

/// Scripted behaviour for one of the two external tools.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    /// Exit 0 after writing `output` where the tool would write its result.
    Succeed { output: Vec<u8> },
    /// Exit with `code`, writing `stderr`, producing no files.
    Fail { code: i32, stderr: Vec<u8> },
    /// Behave as if the process never finished.
    TimeOut,
    /// Behave as if the executable does not exist.
    Missing,
}

impl FakeOutcome {
    pub fn fail(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        FakeOutcome::Fail {
            code,
            stderr: stderr.into(),
        }
    }

    pub fn succeed(output: impl Into<Vec<u8>>) -> Self {
        FakeOutcome::Succeed {
            output: output.into(),
        }
    }
}

#[derive(Debug)]
pub struct FakeRunner {
    conversion: FakeOutcome,
    engine: FakeOutcome,
    write_txt: bool,
    undeletable_txt: bool,
    calls: Mutex<Vec<CommandLine>>,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRunner {
    /// Both tools succeed; the engine emits [`DEFAULT_TRANSCRIPT`] and a `.txt` byproduct.
    pub fn new() -> Self {
        Self {
            conversion: FakeOutcome::succeed(FAKE_WAV),
            engine: FakeOutcome::succeed(DEFAULT_TRANSCRIPT),
            write_txt: true,
            undeletable_txt: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_conversion(mut self, outcome: FakeOutcome) -> Self {
        self.conversion = outcome;
        self
    }

    pub fn with_engine(mut self, outcome: FakeOutcome) -> Self {
        self.engine = outcome;
        self
    }

    pub fn with_transcript(self, json: impl Into<Vec<u8>>) -> Self {
        self.with_engine(FakeOutcome::succeed(json))
    }

    /// Make the engine's `.txt` byproduct a non-empty directory, which
    /// `remove_file` cannot delete.
    pub fn with_undeletable_byproduct(mut self) -> Self {
        self.undeletable_txt = true;
        self
    }

    pub fn calls(&self) -> Vec<CommandLine> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn conversion_calls(&self) -> Vec<CommandLine> {
        self.calls().into_iter().filter(|c| !is_engine(c)).collect()
    }

    pub fn engine_calls(&self) -> Vec<CommandLine> {
        self.calls().into_iter().filter(is_engine).collect()
    }
}

fn is_engine(command: &CommandLine) -> bool {
    command.has_flag("-ojf")
}

fn with_ext(prefix: &Path, ext: &str) -> PathBuf {
    let mut path: OsString = prefix.as_os_str().to_owned();
    path.push(".");
    path.push(ext);
    PathBuf::from(path)
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(
        &self,
        command: &CommandLine,
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());

        let engine = is_engine(command);
        let program = command.program.display().to_string();
        let outcome = if engine { &self.engine } else { &self.conversion };

        match outcome {
            FakeOutcome::Succeed { output } => {
                let io_err = |source| ProcessError::Io {
                    program: program.clone(),
                    source,
                };
                if engine {
                    let prefix = PathBuf::from(command.value_of("-of").unwrap_or_default());
                    tokio::fs::write(with_ext(&prefix, "json"), output)
                        .await
                        .map_err(io_err)?;
                    let txt = with_ext(&prefix, "txt");
                    if self.undeletable_txt {
                        tokio::fs::create_dir(&txt).await.map_err(io_err)?;
                        tokio::fs::write(txt.join("byproduct"), b"byproduct")
                            .await
                            .map_err(io_err)?;
                    } else if self.write_txt {
                        tokio::fs::write(&txt, b"byproduct").await.map_err(io_err)?;
                    }
                } else if let Some(target) = command.args.last() {
                    tokio::fs::write(target, output).await.map_err(io_err)?;
                }
                Ok(ProcessOutput {
                    code: Some(0),
                    stdout: b"done".to_vec(),
                    stderr: Vec::new(),
                })
            }
            FakeOutcome::Fail { code, stderr } => Ok(ProcessOutput {
                code: Some(*code),
                stdout: Vec::new(),
                stderr: stderr.clone(),
            }),
            FakeOutcome::TimeOut => Err(ProcessError::TimedOut { program, timeout }),
            FakeOutcome::Missing => Err(ProcessError::Spawn {
                program,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
            }),
        }
    }
}

/// Pipeline config rooted at `root`, with `scratch/`, `out/` and `models/` created.
pub fn config_in(root: &Path) -> std::io::Result<PipelineConfig> {
    let cfg = PipelineConfig {
        model_path_template: root
            .join("models")
            .join("ggml-{model}.{language}.bin")
            .to_string_lossy()
            .into_owned(),
        engine_binary: PathBuf::from("whisper-cli"),
        ffmpeg_binary: PathBuf::from("ffmpeg"),
        scratch_dir: root.join("scratch"),
        output_dir: root.join("out"),
        ..Default::default()
    };
    std::fs::create_dir_all(root.join("models"))?;
    std::fs::create_dir_all(&cfg.scratch_dir)?;
    std::fs::create_dir_all(&cfg.output_dir)?;
    Ok(cfg)
}

/// Create an (empty) model file for `model`/`language` under `cfg`'s template.
pub fn install_model(cfg: &PipelineConfig, model: &str, language: &str) -> std::io::Result<PathBuf> {
    let path = cfg.model_path(model, language);
    std::fs::write(&path, b"")?;
    Ok(path)
}

/// Number of entries left in `dir`.
pub fn leftover_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
