// crates/crossbridge-rules/src/error.rs
// ============================================================================
// Module: Rule Registry Errors
// ============================================================================

use thiserror::Error;

/// Errors surfaced by the rule pack registry.
///
/// Per §4.2, a missing file at every lookup level is not an error (it yields
/// an empty pack); this enum covers genuine I/O and parse failures, which are
/// themselves non-fatal to the caller (§7 `RuleParseError`: logged, rule or
/// file skipped).
#[derive(Debug, Error)]
pub enum RuleError {
    /// A rule pack file existed but could not be read.
    #[error("failed to read rule pack file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A rule pack file existed but failed to parse as YAML.
    #[error("failed to parse rule pack file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },
}
