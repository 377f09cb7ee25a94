// crates/crossbridge-config/src/env.rs
// ============================================================================
// Module: Environment Variable Overrides
// Description: Applies the five `CROSSBRIDGE_*` overrides §6 names, after
//              file load and before schema validation.
// ============================================================================

//! Each override replaces the corresponding key only if the environment
//! variable is set and parses; an unset or unparsable variable leaves the
//! file (or default) value untouched rather than failing startup.

use crate::config::CrossBridgeConfig;

/// Applies `CROSSBRIDGE_API_HOST`, `CROSSBRIDGE_API_PORT`,
/// `CROSSBRIDGE_DB_URL`, `CROSSBRIDGE_LOG_LEVEL`, and
/// `CROSSBRIDGE_HOOKS_ENABLED` on top of `config`, in that order.
pub fn apply_env_overrides(config: &mut CrossBridgeConfig) {
    apply_from(config, |key| std::env::var(key).ok());
}

/// Testable core of [`apply_env_overrides`], reading through `lookup`
/// instead of the real process environment.
fn apply_from(config: &mut CrossBridgeConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("CROSSBRIDGE_API_HOST") {
        config.observer.api.host = host;
    }
    if let Some(port) = lookup("CROSSBRIDGE_API_PORT").and_then(|raw| raw.parse().ok()) {
        config.observer.api.port = port;
    }
    if let Some(db_url) = lookup("CROSSBRIDGE_DB_URL") {
        config.runtime.db_url = db_url;
    }
    if let Some(log_level) = lookup("CROSSBRIDGE_LOG_LEVEL") {
        config.runtime.log_level = log_level;
    }
    if let Some(hooks_enabled) = lookup("CROSSBRIDGE_HOOKS_ENABLED").and_then(|raw| parse_bool(&raw)) {
        config.runtime.hooks_enabled = hooks_enabled;
    }
}

/// Parses the loose boolean spellings operators tend to set env vars to.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup_from<'a>(map: &'a BTreeMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| map.get(key).map(|value| (*value).to_string())
    }

    #[test]
    fn overrides_apply_only_the_set_variables() {
        let mut config = CrossBridgeConfig::default();
        let mut env = BTreeMap::new();
        env.insert("CROSSBRIDGE_API_PORT", "9000");
        env.insert("CROSSBRIDGE_HOOKS_ENABLED", "false");
        apply_from(&mut config, lookup_from(&env));
        assert_eq!(config.observer.api.port, 9000);
        assert!(!config.runtime.hooks_enabled);
        assert_eq!(config.observer.api.host, "0.0.0.0", "unset host stays default");
    }

    #[test]
    fn unparsable_port_leaves_the_default_untouched() {
        let mut config = CrossBridgeConfig::default();
        let mut env = BTreeMap::new();
        env.insert("CROSSBRIDGE_API_PORT", "not-a-port");
        apply_from(&mut config, lookup_from(&env));
        assert_eq!(config.observer.api.port, 8765);
    }

    #[test]
    fn db_url_and_log_level_override_runtime_config() {
        let mut config = CrossBridgeConfig::default();
        let mut env = BTreeMap::new();
        env.insert("CROSSBRIDGE_DB_URL", "sqlite:///var/crossbridge/data.db");
        env.insert("CROSSBRIDGE_LOG_LEVEL", "debug");
        apply_from(&mut config, lookup_from(&env));
        assert_eq!(config.runtime.db_url, "sqlite:///var/crossbridge/data.db");
        assert_eq!(config.runtime.log_level, "debug");
    }
}
