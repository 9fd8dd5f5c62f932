//! Format normalisation: turn an arbitrary upload into a canonical WAV.
//!
//! Canonical WAV uploads are written straight to scratch storage. Anything
//! else is staged under a best-guess extension and converted with ffmpeg to
//! 16 kHz mono 16-bit little-endian PCM.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, info};

use crate::error::PipelineError;
use crate::process::{CommandLine, ProcessRunner};
use crate::staging::{ArtifactKind, RequestArtifacts, ScratchArea};

/// Media types accepted by the engine without conversion.
pub const CANONICAL_WAV_TYPES: [&str; 2] = ["audio/wav", "audio/x-wav"];

/// Output sample rate requested from ffmpeg.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Output channel count requested from ffmpeg.
pub const TARGET_CHANNELS: u32 = 1;

/// Output codec requested from ffmpeg (16-bit signed little-endian PCM).
pub const TARGET_CODEC: &str = "pcm_s16le";

/// Suffix used when neither filename nor media type gives a hint.
pub const FALLBACK_SUFFIX: &str = ".tmp";

const MEDIA_TYPE_SUFFIXES: [(&str, &str); 6] = [
    ("audio/webm", ".webm"),
    ("audio/mp4", ".m4a"),
    ("audio/mpeg", ".mp3"),
    ("audio/ogg", ".ogg"),
    ("audio/flac", ".flac"),
    ("audio/aac", ".aac"),
];

/// An uploaded audio payload as received by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct UploadedAudio {
    pub bytes: Bytes,
    /// Declared media type, e.g. `audio/webm`.
    pub content_type: Option<String>,
    /// Client-supplied filename, used only for its extension.
    pub file_name: Option<String>,
}

impl UploadedAudio {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Declared media type without parameters, lower-cased.
    pub fn media_type(&self) -> Option<String> {
        self.content_type.as_deref().map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    pub fn is_canonical_wav(&self) -> bool {
        self.media_type()
            .is_some_and(|mt| CANONICAL_WAV_TYPES.contains(&mt.as_str()))
    }

    /// Suffix for the staged original: filename extension, then the media
    /// type table, then [`FALLBACK_SUFFIX`].
    pub fn source_suffix(&self) -> String {
        if let Some(ext) = self.file_name.as_deref().and_then(file_extension) {
            return ext;
        }
        self.media_type()
            .and_then(|mt| {
                MEDIA_TYPE_SUFFIXES
                    .iter()
                    .find(|(known, _)| *known == mt)
                    .map(|(_, suffix)| (*suffix).to_owned())
            })
            .unwrap_or_else(|| FALLBACK_SUFFIX.to_owned())
    }
}

/// `.ext` of `file_name`, only if the extension is plain ASCII alphanumerics.
fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
}

/// ffmpeg invocation producing canonical WAV at `output` from `input`.
pub fn conversion_command(ffmpeg: &Path, input: &Path, output: &Path) -> CommandLine {
    CommandLine::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(input)
        .arg("-ar")
        .arg(TARGET_SAMPLE_RATE.to_string())
        .arg("-ac")
        .arg(TARGET_CHANNELS.to_string())
        .arg("-c:a")
        .arg(TARGET_CODEC)
        .arg(output)
}

/// Stages an upload and converts it when needed.
pub struct FormatNormalizer<'a> {
    pub scratch: &'a ScratchArea,
    pub runner: &'a dyn ProcessRunner,
    pub ffmpeg: &'a Path,
    pub timeout: Duration,
}

impl FormatNormalizer<'_> {
    /// Produce the path of a canonical WAV for `upload`.
    ///
    /// Every file created here is registered in `artifacts` as soon as it
    /// exists, including on the error paths.
    pub async fn normalize(
        &self,
        upload: &UploadedAudio,
        artifacts: &mut RequestArtifacts,
    ) -> Result<PathBuf, PipelineError> {
        if upload.is_canonical_wav() {
            let wav = self
                .scratch
                .persist(ArtifactKind::Converted, ".wav", &upload.bytes)
                .await?;
            let wav_path = wav.path().to_path_buf();
            artifacts.converted = Some(wav);
            debug!(path = %wav_path.display(), "upload is canonical WAV; skipping conversion");
            return Ok(wav_path);
        }

        let suffix = upload.source_suffix();
        let original = self
            .scratch
            .persist(ArtifactKind::Original, &suffix, &upload.bytes)
            .await?;
        let original_path = original.path().to_path_buf();
        artifacts.original = Some(original);

        let wav = self.scratch.allocate(ArtifactKind::Converted, ".wav");
        let wav_path = wav.path().to_path_buf();
        artifacts.converted = Some(wav);

        let command = conversion_command(self.ffmpeg, &original_path, &wav_path);
        info!(
            content_type = upload.content_type.as_deref().unwrap_or("unknown"),
            command = %command,
            "converting upload to WAV"
        );

        let output = self
            .runner
            .run(&command, self.timeout)
            .await
            .map_err(|e| {
                error!(error = %e, "ffmpeg could not be run");
                PipelineError::Conversion(e.to_string())
            })?;

        if !output.success() {
            let stderr = output.stderr_text().trim().to_owned();
            error!(
                code = ?output.code,
                file_name = upload.file_name.as_deref().unwrap_or(""),
                content_type = upload.content_type.as_deref().unwrap_or("unknown"),
                stderr = %stderr,
                "ffmpeg conversion failed"
            );
            return Err(PipelineError::Conversion(stderr));
        }

        info!(path = %wav_path.display(), "ffmpeg conversion successful");
        Ok(wav_path)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
