// crates/crossbridge-classify/src/classifier.rs
// ============================================================================
// Module: Deterministic Classifier (C4)
// Description: Combines extracted signals with a framework's rule pack to
//              assign a failure category, confidence, and matched rule ids.
// Dependencies: crossbridge-classify::signal, crossbridge-rules
// ============================================================================

//! ## Overview
//! [`classify`] implements §4.4: every rule in the framework's pack is
//! evaluated against the normalized log text in priority order; the
//! highest-confidence match wins, ties broken by lowest `priority` then
//! lexically smallest rule id. No match falls back to `UNKNOWN` at a fixed
//! confidence of 0.2. The function is infallible: any internal fault is
//! logged and mapped to `ERROR` at confidence 0.0, never propagated as a panic.

use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;

use crossbridge_core::FailureType;
use crossbridge_core::RuleId;
use crossbridge_rules::RulePack;
use tracing::error;

/// Confidence assigned when no rule matches (§4.4).
pub const NO_MATCH_CONFIDENCE: f64 = 0.2;

/// The outcome of running [`classify`].
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Assigned failure category.
    pub category: FailureType,
    /// Raw, pre-blend confidence in `[0, 1]`.
    pub raw_confidence: f64,
    /// Ids of every rule that matched, in the order they were evaluated.
    pub matched_rule_ids: Vec<RuleId>,
}

/// Classifies a failure against `pack`, per §4.4. `log_text` is the
/// rule-matching text: the concatenation of `error_message`, `stack_trace`,
/// and the extracted signals' `evidence` strings, built by the caller — not
/// the raw log blob extraction ran against.
#[must_use]
pub fn classify(log_text: &str, pack: &RulePack) -> Classification {
    let outcome = catch_unwind(AssertUnwindSafe(|| classify_inner(log_text, pack)));
    match outcome {
        Ok(classification) => classification,
        Err(_) => {
            error!("classifier panicked internally, falling back to ERROR");
            Classification { category: FailureType::Error, raw_confidence: 0.0, matched_rule_ids: Vec::new() }
        }
    }
}

/// The real classification logic, isolated behind `catch_unwind` in [`classify`].
fn classify_inner(log_text: &str, pack: &RulePack) -> Classification {
    let matches: Vec<_> = pack.rules.iter().filter(|rule| rule.matches(log_text)).collect();

    let Some(best) = matches
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence).then_with(|| b.priority.cmp(&a.priority)))
    else {
        return Classification {
            category: FailureType::Unknown,
            raw_confidence: NO_MATCH_CONFIDENCE,
            matched_rule_ids: Vec::new(),
        };
    };

    Classification {
        category: best.failure_type,
        raw_confidence: best.confidence,
        matched_rule_ids: matches.iter().map(|rule| rule.id.clone()).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use crossbridge_rules::Rule;

    use super::*;

    fn rule(id: &str, match_any: &[&str], confidence: f64, priority: i32, category: FailureType) -> Rule {
        Rule {
            id: RuleId::new(id),
            description: "test".to_string(),
            match_any: match_any.iter().map(|s| (*s).to_string()).collect(),
            requires_all: Vec::new(),
            excludes: Vec::new(),
            failure_type: category,
            confidence,
            priority,
        }
    }

    #[test]
    fn no_match_falls_back_to_unknown_at_fixed_confidence() {
        let pack = RulePack::empty("generic");
        let outcome = classify("nothing interesting", &pack);
        assert_eq!(outcome.category, FailureType::Unknown);
        assert!((outcome.raw_confidence - NO_MATCH_CONFIDENCE).abs() < f64::EPSILON);
        assert!(outcome.matched_rule_ids.is_empty());
    }

    #[test]
    fn highest_confidence_rule_wins() {
        let pack = RulePack {
            framework: "generic".to_string(),
            version: "1".to_string(),
            rules: vec![
                rule("low", &["timeout"], 0.5, 10, FailureType::EnvironmentIssue),
                rule("high", &["timeout"], 0.9, 10, FailureType::AutomationDefect),
            ],
        };
        let outcome = classify("timeout while waiting", &pack);
        assert_eq!(outcome.category, FailureType::AutomationDefect);
        assert!((outcome.raw_confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(outcome.matched_rule_ids.len(), 2);
    }

    #[test]
    fn equal_confidence_ties_break_on_lower_priority() {
        let pack = RulePack {
            framework: "generic".to_string(),
            version: "1".to_string(),
            rules: vec![
                rule("b", &["timeout"], 0.8, 20, FailureType::EnvironmentIssue),
                rule("a", &["timeout"], 0.8, 5, FailureType::AutomationDefect),
            ],
        };
        let outcome = classify("timeout occurred", &pack);
        assert_eq!(outcome.category, FailureType::AutomationDefect);
    }
}
