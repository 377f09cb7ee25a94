// crates/crossbridge-ai/src/error.rs
// ============================================================================
// Module: AI Enrichment Errors
// ============================================================================

use thiserror::Error;

/// Failure modes for the AI enrichment stage.
///
/// Every variant is handled by [`crate::enrich::enrich`] as "return the
/// deterministic explanation unchanged"; callers only see this type if they
/// want to log why enrichment was skipped.
#[derive(Debug, Error)]
pub enum AiError {
    /// The configured endpoint is not a valid, policy-compliant URL.
    #[error("invalid ai enrichment endpoint: {0}")]
    InvalidEndpoint(String),
    /// The endpoint's host failed the scheme/credential/allowlist/private-IP policy.
    #[error("ai enrichment endpoint rejected by policy: {0}")]
    PolicyRejected(String),
    /// The request timed out before the configured deadline.
    #[error("ai enrichment request timed out")]
    Timeout,
    /// The request failed at the transport layer.
    #[error("ai enrichment request failed: {0}")]
    Request(String),
    /// The endpoint returned a non-2xx status.
    #[error("ai enrichment endpoint returned status {0}")]
    BadStatus(u16),
    /// The response body did not match the expected shape.
    #[error("ai enrichment response malformed: {0}")]
    MalformedResponse(String),
}
