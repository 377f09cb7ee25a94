// crates/crossbridge-history/src/error.rs
// ============================================================================
// Module: History Errors
// ============================================================================

use thiserror::Error;

/// Failure modes for the flaky detector and confidence monitor.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A confidence value fell outside `[0, 1]`.
    #[error("confidence {value} out of range [0, 1]")]
    ConfidenceOutOfRange {
        /// The offending value.
        value: f64,
    },
}
