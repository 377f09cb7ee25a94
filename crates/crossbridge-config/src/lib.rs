// crates/crossbridge-config/src/lib.rs
// ============================================================================
// Crate: crossbridge-config
// Description: Loads, validates, and documents the unified YAML config (§6).
// ============================================================================

//! The one canonical config file every other crate reads through: API bind,
//! queue sizing, retention windows, flaky/drift thresholds, and the inline
//! per-framework rule lists `execution.intelligence.rules` names as the
//! primary rule source (§4.2).

mod config;
mod env;
mod error;
mod schema;

pub use config::AiConfig;
pub use config::ApiConfig;
pub use config::CrossBridgeConfig;
pub use config::DriftConfig;
pub use config::DriftThresholds;
pub use config::ExecutionConfig;
pub use config::FlakyConfig;
pub use config::IntelligenceConfig;
pub use config::MAX_CONFIG_FILE_BYTES;
pub use config::MAX_CONFIG_PATH_BYTES;
pub use config::MAX_PATH_COMPONENT_BYTES;
pub use config::ObserverConfig;
pub use config::QueueConfig;
pub use config::RetentionConfig;
pub use config::RuntimeConfig;
pub use config::ShutdownConfig;
pub use env::apply_env_overrides;
pub use error::ConfigError;
pub use schema::config_docs_markdown;
pub use schema::config_schema;
pub use schema::config_yaml_example;
