// crates/crossbridge-core/src/lib.rs
// ============================================================================
// Crate: crossbridge-core
// Description: Canonical event model, shared identifiers, domain vocabulary,
//              and failure-signature hashing used by every other crate in
//              the observability pipeline.
// ============================================================================

//! Canonical types shared across the ingestion, classification, coverage,
//! and history stages: the wire/domain [`event`] model, opaque
//! [`identifiers`], UTC [`time`], the [`domain`] vocabulary every component
//! emits `DriftSignal`s and failure categories against, and the
//! [`hashing`] routine that anchors flaky/deterministic history.

/// Domain vocabulary: drift signals, failure types, and severities.
pub mod domain;
/// Shared error type for the core crate.
pub mod error;
pub mod event;
/// Failure-signature hashing routine.
pub mod hashing;
pub mod identifiers;
pub mod time;

pub use domain::DriftSignal;
pub use domain::DriftSignalType;
pub use domain::FailureType;
pub use domain::Severity;
pub use error::CoreError;
pub use event::EventStatus;
pub use event::EventType;
pub use event::ExecutionEvent;
pub use event::RawExecutionEvent;
pub use identifiers::EventId;
pub use identifiers::FailureId;
pub use identifiers::FailureSignature;
pub use identifiers::Framework;
pub use identifiers::NodeId;
pub use identifiers::RuleId;
pub use identifiers::RunId;
pub use identifiers::TestId;
pub use time::Timestamp;
