// crates/crossbridge-rules/src/rule.rs
// ============================================================================
// Module: Rule & RulePack Types (C2 data model)
// Description: One classification rule and the ordered pack it belongs to.
// Dependencies: crossbridge-core, serde
// ============================================================================

use ret_logic::KleeneLogic;
use ret_logic::Requirement;
use ret_logic::TriState;
use ret_logic::TriStateConditionEval;
use serde::Deserialize;
use serde::Serialize;

use crossbridge_core::FailureType;
use crossbridge_core::RuleId;

/// A single "this substring appears in the log text" leaf condition.
///
/// The evidence source is the whole log text rather than a row-indexed
/// table, so `row` is always `0` and carries no meaning here.
struct SubstringPresent(String);

impl TriStateConditionEval for SubstringPresent {
    type Reader<'a> = &'a str;

    fn eval_row_tristate(&self, reader: &Self::Reader<'_>, _row: usize) -> TriState {
        TriState::from(reader.contains(self.0.as_str()))
    }
}

/// One classification rule: a pattern match against normalized log text,
/// paired with the category and confidence it asserts when it matches.
///
/// # Invariants
/// - `confidence` is in `[0, 1]`.
/// - `priority` breaks ties on selection; lower tries first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Stable identifier, unique within its pack.
    pub id: RuleId,
    /// Human-readable description, used to build explanation sentences.
    pub description: String,
    /// Any of these substrings appearing triggers a candidate match.
    #[serde(default)]
    pub match_any: Vec<String>,
    /// All of these substrings must also appear (vacuously true if empty).
    #[serde(default)]
    pub requires_all: Vec<String>,
    /// Presence of any of these substrings suppresses the match.
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Category asserted when this rule matches.
    pub failure_type: FailureType,
    /// Confidence asserted when this rule matches, in `[0, 1]`.
    pub confidence: f64,
    /// Selection priority; lower values are tried, and win ties, first.
    pub priority: i32,
}

impl Rule {
    /// Returns `true` when `log_text` satisfies this rule's match contract
    /// (§4.4 step 2): any of `match_any`, all of `requires_all`, none of
    /// `excludes`.
    ///
    /// Built as a [`Requirement`] tree over Kleene logic rather than three
    /// hand-rolled booleans so the vacuous-truth cases (empty `match_any`,
    /// empty `excludes`) fall out of the tree's own fold identities instead
    /// of needing a separate `is_empty()` check per clause.
    #[must_use]
    pub fn matches(&self, log_text: &str) -> bool {
        let any_of = |patterns: &[String]| -> Requirement<SubstringPresent> {
            Requirement::or(patterns.iter().cloned().map(SubstringPresent).map(Requirement::condition).collect())
        };
        let all_of = |patterns: &[String]| -> Requirement<SubstringPresent> {
            Requirement::and(patterns.iter().cloned().map(SubstringPresent).map(Requirement::condition).collect())
        };

        let match_any = if self.match_any.is_empty() { all_of(&[]) } else { any_of(&self.match_any) };
        let requires_all = all_of(&self.requires_all);
        let excludes = Requirement::negate(any_of(&self.excludes));

        let tree = Requirement::and(vec![match_any, requires_all, excludes]);
        tree.eval_tristate(&log_text, 0, &KleeneLogic).is_true()
    }
}

/// An ordered set of rules for one test framework.
///
/// # Invariants
/// - `id` is unique among `rules` within one pack.
/// - `rules` is kept in priority order (ascending, `id` breaking ties).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RulePack {
    /// Framework this pack applies to, or `Framework::GENERIC`.
    pub framework: String,
    /// Pack version, opaque to the registry.
    #[serde(default)]
    pub version: String,
    /// Rules in priority order.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RulePack {
    /// Sorts `rules` by `(priority, id)`, the tie-break order §4.2/§4.4 require.
    pub fn sort_stable(&mut self) {
        self.rules.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.as_str().cmp(b.id.as_str())));
    }

    /// Returns an empty pack for `framework`, used when no file or config
    /// section defines one (§4.2: "never fails the service").
    #[must_use]
    pub fn empty(framework: impl Into<String>) -> Self {
        Self { framework: framework.into(), version: String::new(), rules: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, match_any: &[&str], requires_all: &[&str], excludes: &[&str]) -> Rule {
        Rule {
            id: RuleId::new(id),
            description: "test rule".to_string(),
            match_any: match_any.iter().map(|s| (*s).to_string()).collect(),
            requires_all: requires_all.iter().map(|s| (*s).to_string()).collect(),
            excludes: excludes.iter().map(|s| (*s).to_string()).collect(),
            failure_type: FailureType::ProductDefect,
            confidence: 0.9,
            priority: 10,
        }
    }

    #[test]
    fn matches_requires_all_of_requires_all() {
        let r = rule("r1", &["expected"], &["500"], &[]);
        assert!(r.matches("expected 200 got 500"));
        assert!(!r.matches("expected 200 got 404"));
    }

    #[test]
    fn excludes_suppress_an_otherwise_matching_rule() {
        let r = rule("r1", &["timeout"], &[], &["retrying"]);
        assert!(r.matches("timeout after 5s"));
        assert!(!r.matches("timeout after 5s, retrying"));
    }

    #[test]
    fn empty_match_any_is_vacuously_satisfied() {
        let r = rule("r1", &[], &["assert"], &[]);
        assert!(r.matches("assertion failed: assert 1 == 2"));
    }
}
