//! Temporary artifact management and per-request cleanup.
//!
//! Every file a request creates lives under a request-unique name built from
//! a random UUID, so concurrent requests never share a path and no locking is
//! needed. Ownership is by value: a [`StagedFile`] or [`OutputPrefix`] removes
//! its files when released or dropped, whichever comes first.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// Lifecycle tag of a staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The upload exactly as received, before conversion.
    Original,
    /// The canonical 16 kHz mono WAV handed to the engine.
    Converted,
    /// An engine output artifact.
    Output,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Original => "original",
            ArtifactKind::Converted => "converted",
            ArtifactKind::Output => "output",
        }
    }
}

/// A scratch file owned by exactly one request.
///
/// The file may or may not exist on disk; releasing is idempotent and a
/// missing file is not an error.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    kind: ArtifactKind,
    released: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the underlying file if present. Safe to call any number of times.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        remove_quietly(&self.path, self.kind.as_str());
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        self.release();
    }
}

/// Allocator for [`StagedFile`]s inside one scratch directory.
///
/// Holds no table of live artifacts; uniqueness comes from UUID v4 names.
#[derive(Debug, Clone)]
pub struct ScratchArea {
    dir: PathBuf,
}

impl ScratchArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Whether a file can be created in the scratch directory right now.
    pub async fn is_writable(&self) -> bool {
        let check = self.dir.join(format!(".murmur-write-check-{}", Uuid::new_v4()));
        match tokio::fs::write(&check, b"").await {
            Ok(()) => {
                remove_quietly(&check, "write-check");
                true
            }
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "directory is not writable");
                false
            }
        }
    }

    /// Reserve a unique path ending in `suffix` without creating the file.
    pub fn allocate(&self, kind: ArtifactKind, suffix: &str) -> StagedFile {
        let name = format!("murmur-{}-{}{suffix}", kind.as_str(), Uuid::new_v4());
        StagedFile {
            path: self.dir.join(name),
            kind,
            released: false,
        }
    }

    /// Reserve a unique path and write `bytes` to it.
    ///
    /// If the write fails the partially written file is removed before the
    /// error is returned.
    pub async fn persist(
        &self,
        kind: ArtifactKind,
        suffix: &str,
        bytes: &[u8],
    ) -> io::Result<StagedFile> {
        let staged = self.allocate(kind, suffix);
        tokio::fs::write(staged.path(), bytes).await?;
        debug!(
            path = %staged.path().display(),
            kind = kind.as_str(),
            size_bytes = bytes.len(),
            "staged file written"
        );
        Ok(staged)
    }
}

/// Path prefix under which the engine writes `<prefix>.json` / `<prefix>.txt`.
///
/// Not a single file, hence separate from [`StagedFile`].
#[derive(Debug)]
pub struct OutputPrefix {
    prefix: PathBuf,
    released: bool,
}

impl OutputPrefix {
    /// Engine artifacts this gateway knows about.
    const EXTENSIONS: [&'static str; 2] = ["json", "txt"];

    /// Allocate a fresh `out-<uuid>` prefix inside `dir`.
    pub fn allocate(dir: &Path) -> Self {
        Self {
            prefix: dir.join(format!("out-{}", Uuid::new_v4())),
            released: false,
        }
    }

    pub fn as_path(&self) -> &Path {
        &self.prefix
    }

    /// `<prefix>.<ext>`; appended rather than replaced, the prefix has no extension.
    pub fn artifact(&self, ext: &str) -> PathBuf {
        let mut path: OsString = self.prefix.clone().into_os_string();
        path.push(".");
        path.push(ext);
        PathBuf::from(path)
    }

    pub fn json_path(&self) -> PathBuf {
        self.artifact("json")
    }

    pub fn txt_path(&self) -> PathBuf {
        self.artifact("txt")
    }

    /// Remove every known engine artifact under this prefix. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for ext in Self::EXTENSIONS {
            remove_quietly(&self.artifact(ext), ArtifactKind::Output.as_str());
        }
    }
}

impl Drop for OutputPrefix {
    fn drop(&mut self) {
        self.release();
    }
}

/// Everything one request has staged so far.
///
/// Stages register artifacts here as soon as they exist, so a failure at any
/// point still leaves the full set available to [`RequestArtifacts::release_all`].
#[derive(Debug, Default)]
pub struct RequestArtifacts {
    pub original: Option<StagedFile>,
    pub converted: Option<StagedFile>,
    pub output: Option<OutputPrefix>,
}

impl RequestArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths currently owned by this request.
    pub fn staged_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(3);
        paths.extend(self.converted.iter().map(|f| f.path().to_path_buf()));
        paths.extend(self.original.iter().map(|f| f.path().to_path_buf()));
        paths.extend(self.output.iter().map(|p| p.as_path().to_path_buf()));
        paths
    }

    /// Release converted WAV, original upload and engine artifacts.
    ///
    /// Never fails; removal problems are logged and swallowed so they cannot
    /// replace the request's own result.
    pub fn release_all(&mut self) {
        if let Some(mut converted) = self.converted.take() {
            converted.release();
        }
        if let Some(mut original) = self.original.take() {
            original.release();
        }
        if let Some(mut output) = self.output.take() {
            output.release();
        }
    }
}

fn remove_quietly(path: &Path, kind: &str) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), kind, "removed temporary file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %path.display(),
            kind,
            error = %e,
            "failed to remove temporary file"
        ),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
