// crates/crossbridge-service/src/error.rs
// ============================================================================
// Module: Service Errors
// Description: The §7 error taxonomy, as the one type the HTTP boundary and
//              the pipeline's startup path actually construct and match on.
// Dependencies: crossbridge-config, crossbridge-store, thiserror
// ============================================================================

//! ## Overview
//! Every lower crate's error type stays internal to its own stage (§4.11's
//! per-stage isolation): the pipeline logs and skips a failing stage rather
//! than letting `ClassifyError`/`HistoryError`/etc. propagate. [`ServiceError`]
//! exists for the two places that do need a single, caller-facing type:
//! startup (config load, store open) and request validation at the HTTP
//! boundary.

use thiserror::Error;

/// The §7 error taxonomy, collapsed to the subset the service crate itself
/// needs to construct or match on.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed event body or missing required field (client-visible 4xx).
    #[error("validation error: {0}")]
    Validation(String),
    /// The bounded ingest queue is full (429).
    #[error("ingest queue is full")]
    RateLimited,
    /// The request body exceeded the 10 MB cap (413).
    #[error("request body exceeds the 10 MB limit")]
    BodyTooLarge,
    /// The admin endpoint's bearer token did not match (401).
    #[error("admin endpoint requires a valid bearer token")]
    Unauthorized,
    /// Startup failed to load or validate the unified configuration.
    #[error("config error: {0}")]
    Config(#[from] crossbridge_config::ConfigError),
    /// Startup failed to open a durable store.
    #[error("store error: {0}")]
    Store(#[from] crossbridge_store::StoreError),
    /// Startup failed to bind the configured host/port.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that failed to bind.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
