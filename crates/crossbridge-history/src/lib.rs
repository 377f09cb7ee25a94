// crates/crossbridge-history/src/lib.rs
// ============================================================================
// Crate: crossbridge-history
// Description: Flaky/deterministic failure history (C6) and confidence drift
//              monitoring (C7).
// ============================================================================

//! Keeps two rolling, in-memory histories classification results feed: a
//! per-[`crossbridge_core::FailureSignature`] occurrence history that labels
//! failures [`flaky::FailureNature`] (C6), and a per-test/framework
//! confidence window that raises drift signals on meaningful change-points
//! (C7).

mod drift;
mod error;
mod flaky;

pub use drift::ConfidenceMeasurement;
pub use drift::ConfidenceMonitor;
pub use drift::ConfidenceMonitorConfig;
pub use drift::DEFAULT_MIN_MEASUREMENTS;
pub use drift::DEFAULT_WINDOW_DAYS;
pub use error::HistoryError;
pub use flaky::DETERMINISTIC_THRESHOLD;
pub use flaky::FLAKY_OCCURRENCE_THRESHOLD;
pub use flaky::FLAKY_VARIANT_THRESHOLD;
pub use flaky::FailureHistory;
pub use flaky::FailureHistoryStore;
pub use flaky::FailureNature;
pub use flaky::PriorOutcome;
