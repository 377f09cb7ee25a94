// crates/crossbridge-store/src/error.rs
// ============================================================================
// Module: Store Errors
// ============================================================================

use thiserror::Error;

/// Failure modes for the coverage graph and event persistence layers.
///
/// # Invariants
/// - Messages avoid embedding raw event payloads.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying filesystem or connection I/O failure.
    #[error("store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("store db error: {0}")]
    Db(#[from] rusqlite::Error),
    /// Stored data failed a consistency check on read.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// A value violated a documented invariant before being written.
    #[error("store invalid data: {0}")]
    Invalid(String),
}
