// crates/crossbridge-classify/src/lib.rs
// ============================================================================
// Crate: crossbridge-classify
// Description: Signal extraction (C3), deterministic classification (C4),
//              and the explainability builder (C5).
// ============================================================================

//! Turns a failed test's raw log text into a typed [`signal::Signal`] set
//! (C3), a [`classifier::Classification`] against the framework's rule pack
//! (C4), and a standalone [`explain::ConfidenceExplanation`] (C5).

mod classifier;
mod error;
mod explain;
mod extractor;
mod signal;

pub use classifier::Classification;
pub use classifier::NO_MATCH_CONFIDENCE;
pub use classifier::classify;
pub use error::ClassifyError;
pub use explain::ConfidenceBreakdown;
pub use explain::ConfidenceExplanation;
pub use explain::EvidenceContext;
pub use explain::RuleInfluence;
pub use explain::SignalQuality;
pub use explain::build_explanation;
pub use extractor::Extractor;
pub use extractor::ExtractorPipeline;
pub use extractor::MAX_SCANNED_LINES;
pub use signal::Signal;
pub use signal::SignalType;
