// crates/crossbridge-classify/src/error.rs
// ============================================================================
// Module: Classification Errors
// ============================================================================

use thiserror::Error;

/// Failure modes for the classification pipeline.
///
/// Per §4.4, the classifier itself is infallible from its caller's point of
/// view (it always returns a category, falling back to `ERROR`/0.0 on any
/// internal fault); this type exists for the rare construction-time failures
/// that can still be surfaced, such as malformed explainability input.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// A confidence value fell outside `[0, 1]`.
    #[error("confidence {value} out of range [0, 1]")]
    ConfidenceOutOfRange {
        /// The offending value.
        value: f64,
    },
}
