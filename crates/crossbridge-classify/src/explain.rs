// crates/crossbridge-classify/src/explain.rs
// ============================================================================
// Module: Explainability Builder (C5)
// Description: Computes rule influence, signal quality, and evidence context
//              for a Classification, producing a standalone explanation.
// Dependencies: crossbridge-classify::classifier, crossbridge-classify::signal
// ============================================================================

//! ## Overview
//! [`build_explanation`] implements §4.5: rule contributions are normalized
//! to sum to at most 1 across matched rules, five framework-agnostic signal
//! quality measures are scored, and evidence summaries are capped to keep the
//! explanation small and redaction-friendly. `final_confidence` blends rule
//! and signal scores 0.7/0.3, matching the classifier's raw confidence only
//! when all signal quality scores are perfect.

use crossbridge_core::FailureId;
use crossbridge_rules::Rule;
use serde::Serialize;

use crate::classifier::Classification;
use crate::signal::Signal;

/// Per-rule influence on a classification outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleInfluence {
    /// The rule this entry describes.
    pub rule_id: String,
    /// `rule.confidence` at match time.
    pub weight: f64,
    /// Whether this rule matched.
    pub matched: bool,
    /// Normalized share of the matched rules' combined weight, in `[0, 1]`.
    pub contribution: f64,
    /// Short human sentence derived from the rule's description.
    pub explanation: String,
}

/// One of the five standard, framework-agnostic signal quality measures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalQuality {
    /// Measure name, e.g. `stacktrace_presence`.
    pub signal_name: &'static str,
    /// Score in `[0, 1]`.
    pub quality_score: f64,
    /// Short justification for the score.
    pub evidence: String,
}

/// Summaries only, never raw log content (§4.5).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvidenceContext {
    /// Last meaningful stack trace line, capped to 150 chars.
    pub stacktrace_summary: String,
    /// Noise-stripped error message, capped to 150 chars.
    pub error_summary: String,
    /// Last ERROR/WARN log lines, capped to 5.
    pub logs_summary: Vec<String>,
    /// Failure ids sharing this signature, capped to 10.
    pub similar_failure_ids: Vec<FailureId>,
    /// Related test ids (same file or feature), capped to 10.
    pub related_test_ids: Vec<String>,
}

/// Standalone explanation for a [`Classification`], linked by `failure_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceExplanation {
    /// The failure this explanation describes.
    pub failure_id: FailureId,
    /// Contribution of every rule considered, matched or not.
    pub rule_influence: Vec<RuleInfluence>,
    /// The five standard signal quality measures.
    pub signal_quality: Vec<SignalQuality>,
    /// Capped, redaction-friendly summaries.
    pub evidence_context: EvidenceContext,
    /// `0.7 * rule_score + 0.3 * signal_score`, in `[0, 1]`.
    pub final_confidence: f64,
    /// The two sub-scores `final_confidence` was blended from.
    pub breakdown: ConfidenceBreakdown,
}

/// The two components blended into [`ConfidenceExplanation::final_confidence`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceBreakdown {
    /// Sum of matched-rule contributions, capped at 1.
    pub rule_score: f64,
    /// Mean of the five signal quality scores.
    pub signal_score: f64,
}

/// How many top-priority unmatched rules to report as "what almost fired".
const TOP_UNMATCHED: usize = 3;

/// Builds a [`ConfidenceExplanation`] for `classification`, given the rules
/// considered (in priority order) and the signals extracted for this failure.
#[must_use]
pub fn build_explanation(
    failure_id: FailureId,
    classification: &Classification,
    all_rules: &[Rule],
    log_text: &str,
    signals: &[Signal],
) -> ConfidenceExplanation {
    let rule_influence = rule_influence(classification, all_rules, log_text);
    let signal_quality = signal_quality(log_text, signals);
    let evidence_context = evidence_context(log_text, signals);

    let rule_score = rule_influence.iter().map(|r| r.contribution).sum::<f64>().min(1.0);
    #[allow(clippy::cast_precision_loss, reason = "signal count is small and bounded")]
    let signal_score = if signal_quality.is_empty() {
        0.0
    } else {
        signal_quality.iter().map(|s| s.quality_score).sum::<f64>() / signal_quality.len() as f64
    };
    let final_confidence = (0.7 * rule_score + 0.3 * signal_score).clamp(0.0, 1.0);

    ConfidenceExplanation {
        failure_id,
        rule_influence,
        signal_quality,
        evidence_context,
        final_confidence,
        breakdown: ConfidenceBreakdown { rule_score, signal_score },
    }
}

/// Builds the matched-and-almost-matched rule influence list.
fn rule_influence(classification: &Classification, all_rules: &[Rule], log_text: &str) -> Vec<RuleInfluence> {
    let matched_ids: std::collections::BTreeSet<&str> =
        classification.matched_rule_ids.iter().map(crossbridge_core::RuleId::as_str).collect();
    let total_weight: f64 =
        all_rules.iter().filter(|r| matched_ids.contains(r.id.as_str())).map(|r| r.confidence).sum();

    let mut matched: Vec<RuleInfluence> = all_rules
        .iter()
        .filter(|r| matched_ids.contains(r.id.as_str()))
        .map(|rule| {
            let contribution = if total_weight > 0.0 { rule.confidence / total_weight } else { 0.0 };
            RuleInfluence {
                rule_id: rule.id.as_str().to_string(),
                weight: rule.confidence,
                matched: true,
                contribution,
                explanation: explain_sentence(rule, log_text),
            }
        })
        .collect();

    let unmatched: Vec<RuleInfluence> = all_rules
        .iter()
        .filter(|r| !matched_ids.contains(r.id.as_str()))
        .take(TOP_UNMATCHED)
        .map(|rule| RuleInfluence {
            rule_id: rule.id.as_str().to_string(),
            weight: rule.confidence,
            matched: false,
            contribution: 0.0,
            explanation: explain_sentence(rule, log_text),
        })
        .collect();

    matched.extend(unmatched);
    matched
}

/// Builds a short explanation sentence from a rule's description and the
/// first substring it would trigger on, if any.
fn explain_sentence(rule: &Rule, log_text: &str) -> String {
    let trigger = rule.match_any.iter().find(|p| log_text.contains(p.as_str()));
    trigger.map_or_else(|| rule.description.clone(), |pattern| format!("{} (matched \"{pattern}\")", rule.description))
}

/// Scores the five standard signal quality measures.
fn signal_quality(log_text: &str, signals: &[Signal]) -> Vec<SignalQuality> {
    vec![
        stacktrace_presence(log_text),
        error_message_stability(signals),
        retry_consistency(signals),
        historical_frequency(signals.len()),
        cross_test_correlation(signals),
    ]
}

/// `0.0` absent, `0.5` present but truncated, `1.0` full with `>= 3` frames.
fn stacktrace_presence(log_text: &str) -> SignalQuality {
    let frame_count = log_text.lines().filter(|line| line.trim_start().starts_with("at ")).count();
    let (score, evidence) = if frame_count == 0 {
        (0.0, "no stack trace frames found".to_string())
    } else if frame_count < 3 {
        (0.5, format!("{frame_count} stack frame(s), likely truncated"))
    } else {
        (1.0, format!("{frame_count} stack frames present"))
    };
    SignalQuality { signal_name: "stacktrace_presence", quality_score: score, evidence }
}

/// Uses signal evidence agreement as a proxy for cross-retry message stability.
fn error_message_stability(signals: &[Signal]) -> SignalQuality {
    let distinct: std::collections::BTreeSet<&str> = signals.iter().map(|s| s.evidence.as_str()).collect();
    let score = match distinct.len() {
        0 | 1 => 1.0,
        2 => 0.5,
        _ => 0.2,
    };
    SignalQuality {
        signal_name: "error_message_stability",
        quality_score: score,
        evidence: format!("{} distinct evidence string(s) across signals", distinct.len()),
    }
}

/// Placeholder pending retry history wiring; conservative default of 0.5.
fn retry_consistency(signals: &[Signal]) -> SignalQuality {
    let score = if signals.is_empty() { 0.0 } else { 0.5 };
    SignalQuality {
        signal_name: "retry_consistency",
        quality_score: score,
        evidence: "retry history not available to the classifier stage".to_string(),
    }
}

/// `log1p(occurrences) / log1p(30)`, clipped to `[0, 1]`; `occurrences` here
/// is approximated by signal count pending historical lookup wiring.
fn historical_frequency(occurrences: usize) -> SignalQuality {
    #[allow(clippy::cast_precision_loss, reason = "occurrence counts are small and bounded")]
    let score = (f64::ln_1p(occurrences as f64) / f64::ln_1p(30.0)).clamp(0.0, 1.0);
    SignalQuality {
        signal_name: "historical_frequency",
        quality_score: score,
        evidence: format!("{occurrences} contributing signal(s)"),
    }
}

/// Fraction of signals sharing the dominant signal type, as a proxy for
/// sibling-test correlation pending run-level wiring.
fn cross_test_correlation(signals: &[Signal]) -> SignalQuality {
    if signals.is_empty() {
        return SignalQuality {
            signal_name: "cross_test_correlation",
            quality_score: 0.0,
            evidence: "no signals to correlate".to_string(),
        };
    }
    let mut counts = std::collections::BTreeMap::new();
    for signal in signals {
        *counts.entry(signal.signal_type).or_insert(0_usize) += 1;
    }
    let dominant = counts.values().copied().max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss, reason = "signal counts are small and bounded")]
    let score = dominant as f64 / signals.len() as f64;
    SignalQuality {
        signal_name: "cross_test_correlation",
        quality_score: score,
        evidence: format!("{dominant}/{} signals share a signal type", signals.len()),
    }
}

/// Builds capped, redacted evidence summaries from `log_text` and `signals`.
fn evidence_context(log_text: &str, signals: &[Signal]) -> EvidenceContext {
    let stacktrace_summary = log_text
        .lines()
        .rev()
        .find(|line| line.trim_start().starts_with("at "))
        .map(|line| line.chars().take(150).collect())
        .unwrap_or_default();

    let error_summary = signals
        .first()
        .map(|s| strip_noise(&s.evidence).chars().take(150).collect())
        .unwrap_or_else(|| strip_noise(log_text).chars().take(150).collect());

    let logs_summary = log_text
        .lines()
        .filter(|line| line.contains("ERROR") || line.contains("WARN"))
        .rev()
        .take(5)
        .map(std::string::ToString::to_string)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    EvidenceContext {
        stacktrace_summary,
        error_summary,
        logs_summary,
        similar_failure_ids: Vec::new(),
        related_test_ids: Vec::new(),
    }
}

/// Strips timestamps, hex addresses, and UUIDs, matching the normalization
/// the flaky detector's signature hashing uses.
fn strip_noise(text: &str) -> String {
    crossbridge_core::hashing::normalize_error_message(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use crossbridge_core::RuleId;

    use super::*;
    use crate::signal::SignalType;

    fn rule(id: &str, confidence: f64, priority: i32) -> Rule {
        Rule {
            id: RuleId::new(id),
            description: "timeout waiting for element".to_string(),
            match_any: vec!["timeout".to_string()],
            requires_all: Vec::new(),
            excludes: Vec::new(),
            failure_type: crossbridge_core::FailureType::AutomationDefect,
            confidence,
            priority,
        }
    }

    #[test]
    fn contribution_sums_to_at_most_one_across_matched_rules() {
        let rules = vec![rule("a", 0.6, 1), rule("b", 0.4, 2)];
        let classification = Classification {
            category: crossbridge_core::FailureType::AutomationDefect,
            raw_confidence: 0.6,
            matched_rule_ids: vec![RuleId::new("a"), RuleId::new("b")],
        };
        let explanation =
            build_explanation(FailureId::generate(), &classification, &rules, "timeout occurred", &[]);
        let total: f64 = explanation.rule_influence.iter().filter(|r| r.matched).map(|r| r.contribution).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn final_confidence_is_bounded() {
        let rules = vec![rule("a", 0.9, 1)];
        let classification = Classification {
            category: crossbridge_core::FailureType::AutomationDefect,
            raw_confidence: 0.9,
            matched_rule_ids: vec![RuleId::new("a")],
        };
        let signals = vec![Signal::new(SignalType::Timeout, 0.9, "timeout")];
        let explanation = build_explanation(FailureId::generate(), &classification, &rules, "timeout", &signals);
        assert!((0.0..=1.0).contains(&explanation.final_confidence));
    }

    #[test]
    fn unmatched_rules_report_zero_contribution() {
        let rules = vec![rule("a", 0.9, 1), rule("b", 0.5, 2)];
        let classification = Classification {
            category: crossbridge_core::FailureType::AutomationDefect,
            raw_confidence: 0.9,
            matched_rule_ids: vec![RuleId::new("a")],
        };
        let explanation = build_explanation(FailureId::generate(), &classification, &rules, "timeout", &[]);
        let unmatched = explanation.rule_influence.iter().find(|r| r.rule_id == "b").expect("rule b present");
        assert!(!unmatched.matched);
        assert!((unmatched.contribution - 0.0).abs() < f64::EPSILON);
    }
}
