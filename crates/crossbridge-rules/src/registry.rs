// crates/crossbridge-rules/src/registry.rs
// ============================================================================
// Module: Rule Pack Registry (C2)
// Description: Loads per-framework rule packs with priority fallback and
//              hot-reloadable, atomically-swapped storage.
// Purpose: One handle every classifier call site reads through; reload never
//          exposes a torn state.
// Dependencies: crossbridge-core, serde_yaml, tracing
// ============================================================================

//! ## Overview
//! [`RuleRegistry`] resolves a framework's [`RulePack`] in the order the
//! classifier needs: an inline pack the caller already parsed from unified
//! config, a framework-specific file, then a generic fallback file. Loaded
//! packs are cached in an `Arc`-swapped slot so [`RuleRegistry::reload`]
//! replaces the whole registry atomically; readers never observe a torn mix
//! of old and new packs (§4.2).

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::RwLock;

use tracing::warn;

use crate::error::RuleError;
use crate::rule::RulePack;

/// Generic fallback framework name, matching
/// [`crossbridge_core::Framework::GENERIC`].
pub const GENERIC_FRAMEWORK: &str = "generic";

/// Read-mostly store of loaded rule packs, keyed by framework.
///
/// # Invariants
/// - `reload` replaces the entire map atomically; a reader sees either the
///   pack set before or after a reload, never a mix.
pub struct RuleRegistry {
    /// Directory searched for `<framework>.yaml` and `generic.yaml`.
    rules_dir: PathBuf,
    /// Inline packs from unified config, keyed by framework; checked first.
    inline: BTreeMap<String, RulePack>,
    /// Loaded/cached packs, swapped as a whole unit on reload.
    packs: RwLock<BTreeMap<String, RulePack>>,
}

impl RuleRegistry {
    /// Builds a registry over `rules_dir`, with `inline` packs (typically
    /// from `execution.intelligence.rules.<framework>` in unified config)
    /// taking priority per §4.2's lookup order.
    #[must_use]
    pub fn new(rules_dir: impl Into<PathBuf>, inline: BTreeMap<String, RulePack>) -> Self {
        Self { rules_dir: rules_dir.into(), inline, packs: RwLock::new(BTreeMap::new()) }
    }

    /// Loads (or returns the cached) pack for `framework`, applying the
    /// three-level lookup order in §4.2: inline config, then
    /// `rules/<framework>.yaml`, then `rules/generic.yaml`. Never fails: a
    /// framework with nothing at any level yields [`RulePack::empty`].
    pub fn load_pack(&self, framework: &str) -> RulePack {
        if let Ok(guard) = self.packs.read()
            && let Some(pack) = guard.get(framework)
        {
            return pack.clone();
        }
        let mut pack = self.inline.get(framework).cloned().unwrap_or_else(|| self.load_from_disk(framework));
        pack.sort_stable();
        if let Ok(mut guard) = self.packs.write() {
            guard.insert(framework.to_string(), pack.clone());
        }
        pack
    }

    /// Reads `<framework>.yaml`, falling back to `generic.yaml`, from
    /// `rules_dir`. A missing file at both levels returns an empty pack;
    /// a file that exists but fails to parse is logged and also yields an
    /// empty pack (§7 `RuleParseError`: non-fatal).
    fn load_from_disk(&self, framework: &str) -> RulePack {
        if let Some(pack) = self.read_pack_file(&self.rules_dir.join(format!("{framework}.yaml")), framework) {
            return pack;
        }
        if let Some(pack) = self.read_pack_file(&self.rules_dir.join("generic.yaml"), GENERIC_FRAMEWORK) {
            return pack;
        }
        RulePack::empty(framework)
    }

    /// Reads and parses one rule pack file, returning `None` (and logging)
    /// on any I/O or parse failure, or if the file does not exist.
    fn read_pack_file(&self, path: &Path, framework: &str) -> Option<RulePack> {
        if !path.exists() {
            return None;
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|source| RuleError::Io { path: path.display().to_string(), source })
            .inspect_err(|err| warn!(%err, "rule pack file unreadable"))
            .ok()?;
        serde_yaml::from_str::<RulePack>(&raw)
            .map_err(|source| RuleError::Parse { path: path.display().to_string(), source })
            .inspect_err(|err| warn!(%err, "rule pack file failed to parse"))
            .ok()
            .map(|mut pack| {
                if pack.framework.is_empty() {
                    pack.framework = framework.to_string();
                }
                pack
            })
    }

    /// Atomically replaces every cached pack, forcing the next
    /// [`RuleRegistry::load_pack`] call per framework to re-resolve from
    /// inline config or disk (§4.2 `Reload`).
    pub fn reload(&self) {
        if let Ok(mut guard) = self.packs.write() {
            guard.clear();
        }
    }

    /// Lists the currently cached packs' framework names and rule ids, for
    /// the `GET /rules/:framework` introspection endpoint.
    #[must_use]
    pub fn list(&self, framework: &str) -> RulePack {
        self.load_pack(framework)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]

    use std::collections::BTreeMap;

    use tempfile::tempdir;

    use super::*;
    use crate::rule::Rule;
    use crossbridge_core::FailureType;
    use crossbridge_core::RuleId;

    #[test]
    fn missing_framework_and_generic_yields_empty_pack() {
        let dir = tempdir().expect("tempdir");
        let registry = RuleRegistry::new(dir.path(), BTreeMap::new());
        let pack = registry.load_pack("pytest");
        assert!(pack.rules.is_empty());
    }

    #[test]
    fn inline_pack_takes_priority_over_disk() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("pytest.yaml"), "framework: pytest\nrules: []\n").expect("write");
        let mut inline = BTreeMap::new();
        let mut pack = RulePack { framework: "pytest".to_string(), version: "inline".to_string(), rules: vec![] };
        pack.rules.push(Rule {
            id: RuleId::new("r1"),
            description: "d".to_string(),
            match_any: vec!["x".to_string()],
            requires_all: vec![],
            excludes: vec![],
            failure_type: FailureType::Unknown,
            confidence: 0.5,
            priority: 1,
        });
        inline.insert("pytest".to_string(), pack);
        let registry = RuleRegistry::new(dir.path(), inline);
        let loaded = registry.load_pack("pytest");
        assert_eq!(loaded.version, "inline");
    }

    #[test]
    fn reload_clears_cache_and_allows_picking_up_changes() {
        let dir = tempdir().expect("tempdir");
        let registry = RuleRegistry::new(dir.path(), BTreeMap::new());
        assert!(registry.load_pack("selenium").rules.is_empty());
        std::fs::write(dir.path().join("selenium.yaml"), "framework: selenium\nrules: []\n").expect("write");
        registry.reload();
        let reloaded = registry.load_pack("selenium");
        assert_eq!(reloaded.framework, "selenium");
    }
}
