// crates/crossbridge-config/src/schema.rs
// ============================================================================
// Module: Config Schema & Example Generation
// Description: A hand-maintained JSON Schema for the unified config, plus
//              an example file and docs generator kept in sync with it.
// Dependencies: serde_json
// ============================================================================

//! Keeps the config model, the example YAML operators copy, and the schema
//! validators run against it from drifting apart: all three are generated
//! from this one module, not hand-copied in three places.

use serde_json::Value;
use serde_json::json;

/// Returns the JSON Schema (2020-12) for [`crate::CrossBridgeConfig`].
///
/// Every key is optional: an empty document `{}` validates, matching
/// [`crate::CrossBridgeConfig::default`]'s all-defaults posture.
#[must_use]
pub fn config_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "CrossBridge Configuration",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "observer": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "api": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "host": { "type": "string" },
                            "port": { "type": "integer", "minimum": 1, "maximum": 65535 },
                            "admin_token": { "type": ["string", "null"] },
                        },
                    },
                    "queue": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "capacity": { "type": "integer", "minimum": 1 },
                            "workers": { "type": "integer", "minimum": 0 },
                            "shards": { "type": "integer", "minimum": 1 },
                        },
                    },
                    "retention": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "events_days": { "type": "integer", "minimum": 1 },
                            "history_days": { "type": "integer", "minimum": 1 },
                            "drift_days": { "type": "integer", "minimum": 1 },
                        },
                    },
                    "flaky": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "consecutive_threshold": { "type": "integer", "minimum": 1 },
                            "passes_between_threshold": { "type": "integer", "minimum": 0 },
                            "min_occurrences": { "type": "integer", "minimum": 1 },
                        },
                    },
                    "drift": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "window_days": { "type": "integer", "minimum": 1 },
                            "thresholds": {
                                "type": "object",
                                "additionalProperties": false,
                                "properties": {
                                    "low": { "type": "number", "exclusiveMinimum": 0 },
                                    "moderate": { "type": "number", "exclusiveMinimum": 0 },
                                    "high": { "type": "number", "exclusiveMinimum": 0 },
                                    "critical": { "type": "number", "exclusiveMinimum": 0 },
                                },
                            },
                        },
                    },
                    "shutdown": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "graceful_seconds": { "type": "integer", "minimum": 1 },
                        },
                    },
                    "artifacts_dir": { "type": "string" },
                    "ai": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "enabled": { "type": "boolean" },
                            "endpoint": { "type": "string" },
                            "timeout_ms": { "type": "integer", "minimum": 1 },
                            "allow_http": { "type": "boolean" },
                            "allowed_hosts": { "type": "array", "items": { "type": "string" } },
                            "allow_private_networks": { "type": "boolean" },
                        },
                    },
                },
            },
            "runtime": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "db_url": { "type": "string" },
                    "log_level": { "type": "string" },
                    "hooks_enabled": { "type": "boolean" },
                },
            },
            "execution": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "intelligence": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "rules": {
                                "type": "object",
                                "additionalProperties": {
                                    "type": "array",
                                    "items": {
                                        "type": "object",
                                        "required": ["id", "description", "failure_type", "confidence", "priority"],
                                        "properties": {
                                            "id": { "type": "string" },
                                            "description": { "type": "string" },
                                            "match_any": { "type": "array", "items": { "type": "string" } },
                                            "requires_all": { "type": "array", "items": { "type": "string" } },
                                            "excludes": { "type": "array", "items": { "type": "string" } },
                                            "failure_type": { "type": "string" },
                                            "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
                                            "priority": { "type": "integer" },
                                        },
                                    },
                                },
                            },
                        },
                    },
                },
            },
        },
    })
}

/// Returns an example unified config, covering every `observer.*` key at
/// its documented default plus one inline rule, for operators to copy.
#[must_use]
pub fn config_yaml_example() -> String {
    r#"observer:
  api:
    host: 0.0.0.0
    port: 8765
  queue:
    capacity: 10000
    workers: 0
    shards: 1
  retention:
    events_days: 90
    history_days: 180
    drift_days: 60
  flaky:
    consecutive_threshold: 3
    passes_between_threshold: 1
    min_occurrences: 3
  drift:
    window_days: 30
    thresholds:
      low: 5.0
      moderate: 10.0
      high: 20.0
      critical: 30.0
  shutdown:
    graceful_seconds: 30
  artifacts_dir: artifacts
  ai:
    enabled: false
    endpoint: ""
    timeout_ms: 2000
    allow_http: false
    allowed_hosts: []
    allow_private_networks: false

execution:
  intelligence:
    rules:
      pytest:
        - id: PYTEST_ASSERT_001
          description: "assertion failure"
          match_any: ["AssertionError"]
          failure_type: PRODUCT_DEFECT
          confidence: 0.8
          priority: 10
"#
    .to_string()
}

/// Renders a short Markdown reference of every recognized key, its default,
/// and the section it belongs to (§6), for docs sites and `--help` output.
#[must_use]
pub fn config_docs_markdown() -> String {
    let mut out = String::from("# crossbridge.yaml Configuration\n\n");
    out.push_str("| Key | Default | Description |\n");
    out.push_str("|---|---|---|\n");
    for (key, default, description) in CONFIG_KEYS {
        out.push_str(&format!("| `{key}` | `{default}` | {description} |\n"));
    }
    out
}

/// `(key, default, description)` rows backing [`config_docs_markdown`].
const CONFIG_KEYS: &[(&str, &str, &str)] = &[
    ("observer.api.host", "0.0.0.0", "API bind host"),
    ("observer.api.port", "8765", "API bind port"),
    ("observer.queue.capacity", "10000", "Bounded ingest queue capacity"),
    ("observer.queue.workers", "0 (CPU * 2)", "Worker pool size"),
    ("observer.queue.shards", "1", "Queue shard count"),
    ("observer.retention.events_days", "90", "Raw event retention, in days"),
    ("observer.retention.history_days", "180", "Flaky/deterministic history retention, in days"),
    ("observer.retention.drift_days", "60", "Confidence-drift measurement retention, in days"),
    ("observer.flaky.consecutive_threshold", "3", "Consecutive failures before DETERMINISTIC is eligible"),
    ("observer.flaky.passes_between_threshold", "1", "Passes between failures before FLAKY is eligible"),
    ("observer.flaky.min_occurrences", "3", "Minimum occurrences before FLAKY applies"),
    ("observer.drift.window_days", "30", "Confidence-drift rolling window, in days"),
    ("observer.drift.thresholds.low", "5.0", "Low severity floor, percent delta"),
    ("observer.drift.thresholds.moderate", "10.0", "Moderate severity floor, percent delta"),
    ("observer.drift.thresholds.high", "20.0", "High severity floor, percent delta"),
    ("observer.drift.thresholds.critical", "30.0", "Critical severity floor, percent delta"),
    ("observer.shutdown.graceful_seconds", "30", "Graceful shutdown budget, in seconds"),
    ("observer.api.admin_token", "(none)", "Shared secret required by POST /admin/reload"),
    ("observer.artifacts_dir", "artifacts", "Directory the Explainability Builder writes CI artifacts into"),
    ("observer.ai.enabled", "false", "Whether the optional AI enrichment stage runs"),
    ("observer.ai.endpoint", "(none)", "AI enrichment HTTP endpoint"),
    ("observer.ai.timeout_ms", "2000", "AI enrichment request timeout, in milliseconds"),
    ("observer.ai.allow_http", "false", "Allow cleartext http:// AI enrichment endpoints"),
    ("observer.ai.allowed_hosts", "(none)", "AI enrichment host allowlist; empty permits any host"),
    ("observer.ai.allow_private_networks", "false", "Allow AI enrichment endpoints on private/link-local addresses"),
    ("execution.intelligence.rules.<framework>", "(none)", "Inline rule packs, primary source per framework"),
];

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use jsonschema::Draft;

    use super::*;
    use crate::CrossBridgeConfig;

    #[test]
    fn schema_accepts_empty_document() {
        let schema = config_schema();
        let validator = jsonschema::options().with_draft(Draft::Draft202012).build(&schema).expect("compile schema");
        assert!(validator.is_valid(&json!({})));
    }

    #[test]
    fn schema_accepts_the_example_config() {
        let schema = config_schema();
        let validator = jsonschema::options().with_draft(Draft::Draft202012).build(&schema).expect("compile schema");
        let example = config_yaml_example();
        let config: CrossBridgeConfig = serde_yaml::from_str(&example).expect("example parses");
        config.validate().expect("example validates");
        let as_json = serde_json::to_value(&config).expect("serializes");
        assert!(validator.is_valid(&as_json), "example config should validate against schema");
    }

    #[test]
    fn docs_markdown_mentions_every_key() {
        let docs = config_docs_markdown();
        assert!(docs.contains("observer.api.port"));
        assert!(docs.contains("execution.intelligence.rules"));
    }
}
