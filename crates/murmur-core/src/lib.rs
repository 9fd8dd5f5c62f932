//! murmur-core – input normalisation and subprocess orchestration for the
//! murmur transcription gateway.
//!
//! A request flows through four stages, all owned by [`Pipeline`]:
//!
//! 1. [`normalize`] stages the upload and, unless it already is a canonical
//!    WAV, converts it with ffmpeg.
//! 2. [`engine`] resolves the model file and runs the whisper CLI.
//! 3. [`extract`] reads the engine's JSON artifact and pulls out the text.
//! 4. [`staging::RequestArtifacts`] removes every file the request created.
//!
//! External tools are reached only through the [`ProcessRunner`] trait so the
//! whole pipeline can be exercised with a fake runner.

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod process;
pub mod staging;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::PipelineConfig;
pub use engine::{ModelSelector, ResolvedModel, WHISPER_1_SENTINEL};
pub use error::PipelineError;
pub use extract::{Segment, Transcript};
pub use normalize::UploadedAudio;
pub use pipeline::{Pipeline, Readiness};
pub use process::{CommandLine, CommandRunner, ProcessError, ProcessOutput, ProcessRunner};
pub use staging::{ArtifactKind, OutputPrefix, RequestArtifacts, ScratchArea, StagedFile};
