// crates/crossbridge-config/src/config.rs
// ============================================================================
// Module: Unified Configuration Model
// Description: The one canonical YAML config (§6): API bind, queue sizing,
//              retention windows, flaky/drift thresholds, and inline
//              per-framework rules.
// Dependencies: crossbridge-rules, serde_yaml
// ============================================================================

//! ## Overview
//! [`CrossBridgeConfig::load`] reads one YAML file at process root (or, with
//! `path = None`, falls back to all-defaults rather than refusing to start
//! per §7's "never fails the service" posture for config-adjacent concerns
//! that aren't strictly required). [`CrossBridgeConfig::validate`] then
//! checks the semantic constraints no serde `#[serde(default)]` can express:
//! positive queue sizes, ascending drift thresholds, in-range inline rule
//! confidences.

use std::collections::BTreeMap;
use std::path::Path;

use jsonschema::Draft;
use serde::Deserialize;
use serde::Serialize;

use crossbridge_rules::Rule;
use crossbridge_rules::RulePack;

use crate::error::ConfigError;

/// Config files larger than this are rejected outright (§7 fail-closed).
pub const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576;
/// Config paths longer than this are rejected before any filesystem access.
pub const MAX_CONFIG_PATH_BYTES: usize = 4_096;
/// Individual path components longer than this are rejected.
pub const MAX_PATH_COMPONENT_BYTES: usize = 255;

/// The unified configuration (§6 "Configuration (unified file)").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossBridgeConfig {
    /// Observer-core settings: API, queue, retention, flaky, drift, shutdown.
    #[serde(default)]
    pub observer: ObserverConfig,
    /// Execution-intelligence settings: inline per-framework rule packs.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Process-level settings with no `observer.*` home of their own: the
    /// ones env vars in §6 override (`CROSSBRIDGE_DB_URL`,
    /// `CROSSBRIDGE_LOG_LEVEL`, `CROSSBRIDGE_HOOKS_ENABLED`).
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// `runtime.*`: settings env vars override that have no `observer.*` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Storage backend connection string. Default `sqlite://crossbridge.db`.
    pub db_url: String,
    /// `tracing` filter directive applied at startup. Default `info`.
    pub log_level: String,
    /// Whether the optional pre-commit/CI hook installer runs at startup.
    /// Default `true`.
    pub hooks_enabled: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { db_url: "sqlite://crossbridge.db".to_string(), log_level: "info".to_string(), hooks_enabled: true }
    }
}

/// `observer.*` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// `observer.api.*`.
    pub api: ApiConfig,
    /// `observer.queue.*`.
    pub queue: QueueConfig,
    /// `observer.retention.*`.
    pub retention: RetentionConfig,
    /// `observer.flaky.*`.
    pub flaky: FlakyConfig,
    /// `observer.drift.*`.
    pub drift: DriftConfig,
    /// `observer.shutdown.*`.
    pub shutdown: ShutdownConfig,
    /// `observer.ai.*`.
    pub ai: AiConfig,
    /// `observer.artifacts_dir`: directory the Explainability Builder writes
    /// `<failure_id>.json`/`<failure_id>.txt` CI artifacts into.
    pub artifacts_dir: String,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            queue: QueueConfig::default(),
            retention: RetentionConfig::default(),
            flaky: FlakyConfig::default(),
            drift: DriftConfig::default(),
            shutdown: ShutdownConfig::default(),
            ai: AiConfig::default(),
            artifacts_dir: "artifacts".to_string(),
        }
    }
}

/// `observer.api.host`/`observer.api.port`/`observer.api.admin_token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind host. Default `0.0.0.0`.
    pub host: String,
    /// Bind port. Default `8765`.
    pub port: u16,
    /// Shared secret `POST /admin/reload` requires as `Authorization: Bearer
    /// <token>`. `None` (the default) leaves the endpoint open, matching a
    /// local/dev posture; operators set this for any reachable deployment.
    pub admin_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8765, admin_token: None }
    }
}

/// `observer.ai.*`: the optional AI enrichment side-stage (§9 design notes).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Whether the enrichment stage runs at all. Default `false`.
    pub enabled: bool,
    /// The operator-configured enrichment endpoint.
    pub endpoint: String,
    /// Request timeout, in milliseconds. Default `2000`.
    pub timeout_ms: u64,
    /// Allow cleartext `http://` endpoints. Default `false`.
    pub allow_http: bool,
    /// Optional host allowlist; empty permits any host passing the rest of
    /// the policy.
    pub allowed_hosts: Vec<String>,
    /// Allow requests to private/link-local/loopback addresses. Default `false`.
    pub allow_private_networks: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            timeout_ms: 2_000,
            allow_http: false,
            allowed_hosts: Vec::new(),
            allow_private_networks: false,
        }
    }
}

/// `observer.queue.*`: the ingest pipeline's bounded queue and worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Bounded queue capacity. Default `10_000`.
    pub capacity: usize,
    /// Worker pool size. Default `0`, meaning "derive from CPU count"
    /// (§4.11: default `N = CPU * 2`) at the call site, not here.
    pub workers: usize,
    /// Queue shard count, for reduced lock contention under load.
    pub shards: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 10_000, workers: 0, shards: 1 }
    }
}

/// `observer.retention.*`: how long each data class is kept before pruning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Raw event retention, in days. Default `90`.
    pub events_days: u32,
    /// Flaky/deterministic history retention, in days. Default `180`.
    pub history_days: u32,
    /// Confidence-drift measurement retention, in days. Default `60`.
    pub drift_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { events_days: 90, history_days: 180, drift_days: 60 }
    }
}

/// `observer.flaky.*`: thresholds feeding the flaky/deterministic labeler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlakyConfig {
    /// Consecutive failures before a signature is eligible for
    /// `DETERMINISTIC`. Default `3`.
    pub consecutive_threshold: u32,
    /// Passes observed between failures before a signature is eligible for
    /// `FLAKY`. Default `1`.
    pub passes_between_threshold: u32,
    /// Minimum total occurrences before `FLAKY` applies. Default `3`.
    pub min_occurrences: u32,
}

impl Default for FlakyConfig {
    fn default() -> Self {
        Self { consecutive_threshold: 3, passes_between_threshold: 1, min_occurrences: 3 }
    }
}

/// `observer.drift.*`: rolling window and severity thresholds for
/// confidence-drift monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Rolling window size, in days. Default `30`.
    pub window_days: u32,
    /// Percent-delta thresholds per severity band.
    pub thresholds: DriftThresholds,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self { window_days: 30, thresholds: DriftThresholds::default() }
    }
}

/// `observer.drift.thresholds.*`, as absolute percent deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftThresholds {
    /// Low severity floor, in percent. Default `5.0`.
    pub low: f64,
    /// Moderate severity floor, in percent. Default `10.0`.
    pub moderate: f64,
    /// High severity floor, in percent. Default `20.0`.
    pub high: f64,
    /// Critical severity floor, in percent. Default `30.0`.
    pub critical: f64,
}

impl Default for DriftThresholds {
    fn default() -> Self {
        Self { low: 5.0, moderate: 10.0, high: 20.0, critical: 30.0 }
    }
}

/// `observer.shutdown.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Seconds allotted to graceful shutdown before forcing. Default `30`.
    pub graceful_seconds: u32,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { graceful_seconds: 30 }
    }
}

/// `execution.*` keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// `execution.intelligence.*`.
    pub intelligence: IntelligenceConfig,
}

/// `execution.intelligence.*`: the primary source of classification rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelligenceConfig {
    /// `execution.intelligence.rules.<framework>`: inline rule lists, keyed
    /// by framework name, taking priority over rule-pack files (§4.2).
    pub rules: BTreeMap<String, Vec<Rule>>,
}

impl CrossBridgeConfig {
    /// Loads config from `path`, or returns all-defaults when `path` is
    /// `None`.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `path` is implausibly long, the file is
    /// missing/unreadable, too large, not UTF-8, fails to parse as YAML, or
    /// fails [`Self::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            let mut config = Self::default();
            crate::env::apply_env_overrides(&mut config);
            config.validate_schema()?;
            config.validate()?;
            return Ok(config);
        };
        if path.as_os_str().len() > MAX_CONFIG_PATH_BYTES {
            return Err(ConfigError::PathTooLong);
        }
        for component in path.components() {
            if component.as_os_str().len() > MAX_PATH_COMPONENT_BYTES {
                return Err(ConfigError::PathComponentTooLong);
            }
        }
        let metadata = std::fs::metadata(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        if metadata.len() > MAX_CONFIG_FILE_BYTES {
            return Err(ConfigError::FileTooLarge);
        }
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        let raw = std::str::from_utf8(&bytes).map_err(|_utf8_error| ConfigError::NotUtf8)?;
        let mut config: Self = serde_yaml::from_str(raw)?;
        crate::env::apply_env_overrides(&mut config);
        config.validate_schema()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates `self` against [`crate::schema::config_schema`] (Draft
    /// 2020-12): `additionalProperties: false`, numeric ranges, and required
    /// inline-rule fields the typed model's `#[serde(default)]` fields can't
    /// enforce by themselves. Runs after env overrides, before
    /// [`Self::validate`]'s semantic checks.
    ///
    /// # Errors
    /// Returns [`ConfigError::Schema`] listing every violation found.
    fn validate_schema(&self) -> Result<(), ConfigError> {
        let schema = crate::schema::config_schema();
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .map_err(|err| ConfigError::Schema(format!("invalid schema: {err}")))?;
        let document = serde_json::to_value(self).map_err(|err| ConfigError::Schema(err.to_string()))?;
        let messages: Vec<String> = validator.iter_errors(&document).map(|err| err.to_string()).collect();
        if messages.is_empty() { Ok(()) } else { Err(ConfigError::Schema(messages.join("; "))) }
    }

    /// Checks every constraint `#[serde(default)]` cannot express: positive
    /// sizes, ascending drift thresholds, in-range inline rule confidences.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] describing the first constraint
    /// violated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.observer.api.host.trim().is_empty() {
            return Err(ConfigError::Validation("observer.api.host must be non-empty".to_string()));
        }
        if self.observer.api.port == 0 {
            return Err(ConfigError::Validation("observer.api.port must be greater than zero".to_string()));
        }
        if self.observer.queue.capacity == 0 {
            return Err(ConfigError::Validation("observer.queue.capacity must be greater than zero".to_string()));
        }
        if self.observer.queue.shards == 0 {
            return Err(ConfigError::Validation("observer.queue.shards must be greater than zero".to_string()));
        }
        if self.observer.retention.events_days == 0 {
            return Err(ConfigError::Validation("observer.retention.events_days must be greater than zero".to_string()));
        }
        if self.observer.retention.history_days == 0 {
            return Err(ConfigError::Validation("observer.retention.history_days must be greater than zero".to_string()));
        }
        if self.observer.retention.drift_days == 0 {
            return Err(ConfigError::Validation("observer.retention.drift_days must be greater than zero".to_string()));
        }
        if self.observer.flaky.consecutive_threshold == 0 {
            return Err(ConfigError::Validation("observer.flaky.consecutive_threshold must be greater than zero".to_string()));
        }
        if self.observer.flaky.min_occurrences == 0 {
            return Err(ConfigError::Validation("observer.flaky.min_occurrences must be greater than zero".to_string()));
        }
        if self.observer.drift.window_days == 0 {
            return Err(ConfigError::Validation("observer.drift.window_days must be greater than zero".to_string()));
        }
        self.observer.drift.thresholds.validate()?;
        if self.observer.ai.enabled && self.observer.ai.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation("observer.ai.endpoint must be set when observer.ai.enabled is true".to_string()));
        }
        if self.observer.artifacts_dir.trim().is_empty() {
            return Err(ConfigError::Validation("observer.artifacts_dir must be non-empty".to_string()));
        }
        if self.observer.shutdown.graceful_seconds == 0 {
            return Err(ConfigError::Validation("observer.shutdown.graceful_seconds must be greater than zero".to_string()));
        }
        for (framework, rules) in &self.execution.intelligence.rules {
            for rule in rules {
                if !(0.0..=1.0).contains(&rule.confidence) {
                    return Err(ConfigError::Validation(format!(
                        "execution.intelligence.rules.{framework}.{} confidence out of range [0, 1]",
                        rule.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Builds the inline `RuleRegistry` seed: one [`RulePack`] per framework
    /// from `execution.intelligence.rules`, ready to pass to
    /// `RuleRegistry::new` alongside the rule-pack directory.
    #[must_use]
    pub fn rule_packs(&self) -> BTreeMap<String, RulePack> {
        self.execution
            .intelligence
            .rules
            .iter()
            .map(|(framework, rules)| {
                let mut pack = RulePack { framework: framework.clone(), version: "inline".to_string(), rules: rules.clone() };
                pack.sort_stable();
                (framework.clone(), pack)
            })
            .collect()
    }
}

impl DriftThresholds {
    /// Checks the thresholds are positive and strictly ascending
    /// (`low < moderate < high < critical`), the order severity lookup
    /// (§4.7) assumes.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.low <= 0.0 {
            return Err(ConfigError::Validation("observer.drift.thresholds.low must be greater than zero".to_string()));
        }
        if !(self.low < self.moderate && self.moderate < self.high && self.high < self.critical) {
            return Err(ConfigError::Validation(
                "observer.drift.thresholds must be strictly ascending (low < moderate < high < critical)".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let config = CrossBridgeConfig::load(None).expect("defaults always validate");
        assert_eq!(config.observer.api.port, 8765);
    }

    #[test]
    fn load_rejects_path_too_long() {
        let long_path = "a".repeat(5_000);
        let err = CrossBridgeConfig::load(Some(Path::new(&long_path))).expect_err("too long");
        assert!(matches!(err, ConfigError::PathTooLong));
    }

    #[test]
    fn load_rejects_non_utf8_file() {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(&[0xFF, 0xFE, 0xFF]).expect("write");
        let err = CrossBridgeConfig::load(Some(file.path())).expect_err("not utf8");
        assert!(matches!(err, ConfigError::NotUtf8));
    }

    #[test]
    fn load_rejects_oversized_file() {
        let mut file = NamedTempFile::new().expect("tempfile");
        let payload = vec![b'a'; 1_048_577];
        file.write_all(&payload).expect("write");
        let err = CrossBridgeConfig::load(Some(file.path())).expect_err("too large");
        assert!(matches!(err, ConfigError::FileTooLarge));
    }

    #[test]
    fn validate_rejects_zero_port() {
        let mut config = CrossBridgeConfig::default();
        config.observer.api.port = 0;
        let err = config.validate().expect_err("zero port");
        assert!(err.to_string().contains("observer.api.port must be greater than zero"));
    }

    #[test]
    fn validate_rejects_ai_enabled_without_endpoint() {
        let mut config = CrossBridgeConfig::default();
        config.observer.ai.enabled = true;
        let err = config.validate().expect_err("missing endpoint");
        assert!(err.to_string().contains("observer.ai.endpoint"));
    }

    #[test]
    fn validate_rejects_empty_artifacts_dir() {
        let mut config = CrossBridgeConfig::default();
        config.observer.artifacts_dir = String::new();
        let err = config.validate().expect_err("empty artifacts_dir");
        assert!(err.to_string().contains("observer.artifacts_dir"));
    }

    #[test]
    fn validate_rejects_non_ascending_drift_thresholds() {
        let mut config = CrossBridgeConfig::default();
        config.observer.drift.thresholds.high = 2.0;
        config.observer.drift.thresholds.moderate = 5.0;
        let err = config.validate().expect_err("non-ascending");
        assert!(err.to_string().contains("strictly ascending"));
    }

    #[test]
    fn validate_rejects_out_of_range_inline_rule_confidence() {
        let mut config = CrossBridgeConfig::default();
        let rule = Rule {
            id: crossbridge_core::RuleId::new("bad"),
            description: "d".to_string(),
            match_any: vec!["x".to_string()],
            requires_all: vec![],
            excludes: vec![],
            failure_type: crossbridge_core::FailureType::Unknown,
            confidence: 1.5,
            priority: 1,
        };
        config.execution.intelligence.rules.insert("pytest".to_string(), vec![rule]);
        let err = config.validate().expect_err("out of range");
        assert!(err.to_string().contains("confidence out of range"));
    }

    #[test]
    fn round_trips_through_yaml() {
        let yaml = "observer:\n  api:\n    host: 127.0.0.1\n    port: 9999\n";
        let config: CrossBridgeConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(config.observer.api.host, "127.0.0.1");
        assert_eq!(config.observer.api.port, 9999);
        assert_eq!(config.observer.queue.capacity, 10_000, "unset keys keep their defaults");
    }
}
