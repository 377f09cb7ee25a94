// crates/crossbridge-core/src/error.rs
// ============================================================================
// Module: Core Error Taxonomy
// Description: Errors shared by the canonical event model and domain types.
// ============================================================================

use thiserror::Error;

/// Errors produced while parsing or validating core domain types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The wire payload used an `event_type` this build does not recognize.
    #[error("unrecognized event_type: {0}")]
    UnknownEventType(String),
    /// The wire payload used a `status` this build does not recognize.
    #[error("unrecognized status: {0}")]
    UnknownStatus(String),
    /// A required field was missing from the wire payload.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// The timestamp field could not be parsed as RFC3339.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(#[from] time::error::Parse),
    /// The request body exceeded the configured size cap.
    #[error("payload too large: {actual_bytes} bytes (max {max_bytes})")]
    PayloadTooLarge {
        /// Configured maximum payload size in bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}
