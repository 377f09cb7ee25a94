// crates/crossbridge-ai/src/lib.rs
// ============================================================================
// Crate: crossbridge-ai
// Description: Optional AI enrichment side-stage, side-attached after the
//              deterministic classifier and explainability builder.
// ============================================================================

//! A side-attached stage that may nudge a [`crossbridge_classify::ConfidenceExplanation`]'s
//! `final_confidence` by at most [`enrich::MAX_CONFIDENCE_ADJUSTMENT`], never
//! touching the classifier's category or matched rules. Disabled, unreachable,
//! slow, or malformed endpoints all fall back to returning the deterministic
//! explanation unchanged.

mod enrich;
mod error;

pub use enrich::AI_CONFIDENCE_GATE;
pub use enrich::AiEnrichmentConfig;
pub use enrich::DEFAULT_TIMEOUT_MS;
pub use enrich::MAX_CONFIDENCE_ADJUSTMENT;
pub use enrich::enrich;
pub use error::AiError;
