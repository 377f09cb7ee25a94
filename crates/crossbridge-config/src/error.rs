// crates/crossbridge-config/src/error.rs
// ============================================================================
// Module: Config Errors
// ============================================================================

use thiserror::Error;

/// Failure modes for loading and validating the unified configuration.
///
/// Every variant is a fatal, startup-time error (§7): the service refuses to
/// start rather than run with a config it could not fully load or validate.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The supplied config path is implausibly long.
    #[error("config path exceeds max length")]
    PathTooLong,
    /// One path component is implausibly long.
    #[error("config path component too long")]
    PathComponentTooLong,
    /// The config file is larger than [`crate::MAX_CONFIG_FILE_BYTES`].
    #[error("config file exceeds size limit")]
    FileTooLarge,
    /// The config file is not valid UTF-8.
    #[error("config file must be utf-8")]
    NotUtf8,
    /// The config file could not be read.
    #[error("failed to read config file at {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file's contents are not valid YAML for this schema.
    #[error("failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// A loaded config failed `additionalProperties`/range/required-field
    /// checks in [`crate::schema::config_schema`].
    #[error("config failed schema validation: {0}")]
    Schema(String),
    /// A loaded config failed a semantic validation rule.
    #[error("{0}")]
    Validation(String),
}
