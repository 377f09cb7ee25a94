// crates/crossbridge-artifacts/src/error.rs
// ============================================================================
// Module: Artifact Rendering Errors
// ============================================================================

use thiserror::Error;

/// Failure modes for CI artifact rendering.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The explanation could not be serialized to JSON.
    #[error("failed to serialize explanation artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}
