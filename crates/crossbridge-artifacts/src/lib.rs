// crates/crossbridge-artifacts/src/lib.rs
// ============================================================================
// Crate: crossbridge-artifacts
// Description: Renders classification explanations into the CI-consumable
//              JSON and text artifacts §6 names.
// ============================================================================

//! Turns a [`crossbridge_classify::Classification`] and its linked
//! [`crossbridge_classify::ConfidenceExplanation`] into the two files CI
//! tooling reads per failure: `<failure_id>.json` and `<failure_id>.txt`.

mod error;
mod render;

pub use error::ArtifactError;
pub use render::Artifact;
pub use render::ClassifiedFailure;
pub use render::MAX_SUMMARY_LINES;
