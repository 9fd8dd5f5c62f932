use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `"ok"` when every check passes, `"degraded"` otherwise.
    pub status: String,
    pub version: String,
    /// The configured whisper CLI path exists.
    pub engine_binary_found: bool,
    /// Uploads can be staged in the scratch directory.
    pub scratch_dir_writable: bool,
    /// The engine can write its output prefix.
    pub output_dir_writable: bool,
}
