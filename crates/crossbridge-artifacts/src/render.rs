// crates/crossbridge-artifacts/src/render.rs
// ============================================================================
// Module: CI Artifact Renderer
// Description: Renders a classification's explanation into the two files §6
//              names: a compact JSON document and a <=40-line text summary,
//              both byte-identical for identical inputs.
// Dependencies: crossbridge-classify, crossbridge-core, serde_json
// ============================================================================

//! ## Overview
//! [`Artifact::render`] is a pure function of its inputs: no wall-clock
//! reads, no random ids, stable key ordering via `serde_json`'s struct field
//! order. This is what makes the output byte-identical for identical inputs
//! (§8 property 3, explanation determinism).

use crossbridge_classify::Classification;
use crossbridge_classify::ConfidenceExplanation;
use crossbridge_core::FailureId;

use crate::error::ArtifactError;

/// Cap on the plain-text summary's line count (§6).
pub const MAX_SUMMARY_LINES: usize = 40;

/// The two files produced for one failure's classification (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Filename stem shared by both files (`<failure_id>`).
    pub failure_id: String,
    /// Contents of `<failure_id>.json`.
    pub json: String,
    /// Contents of `<failure_id>.txt`, at most [`MAX_SUMMARY_LINES`] lines.
    pub text: String,
}

/// Wraps a `Classification` with its `ConfidenceExplanation` for rendering;
/// kept separate from [`ConfidenceExplanation`] itself so the explanation
/// type stays independently queryable per §4.5.
#[derive(Debug, Clone)]
pub struct ClassifiedFailure<'a> {
    /// The failure this artifact describes.
    pub failure_id: FailureId,
    /// The deterministic classification outcome.
    pub classification: &'a Classification,
    /// The linked explanation.
    pub explanation: &'a ConfidenceExplanation,
}

impl Artifact {
    /// Renders both files for `failure`.
    ///
    /// # Errors
    /// Returns [`ArtifactError::Serialize`] if the explanation cannot be
    /// serialized to JSON, which only happens for non-finite f64 fields.
    pub fn render(failure: &ClassifiedFailure<'_>) -> Result<Self, ArtifactError> {
        let failure_id = failure.failure_id.to_string();
        let json = render_json(failure)?;
        let text = render_text(failure);
        Ok(Self { failure_id, json, text })
    }
}

/// Renders the compact JSON document: category, raw and final confidence,
/// matched rule ids, and the full explanation.
fn render_json(failure: &ClassifiedFailure<'_>) -> Result<String, ArtifactError> {
    let document = serde_json::json!({
        "failure_id": failure.failure_id.to_string(),
        "category": failure.classification.category.as_str(),
        "raw_confidence": failure.classification.raw_confidence,
        "matched_rule_ids": failure.classification.matched_rule_ids.iter().map(|id| id.as_str().to_string()).collect::<Vec<_>>(),
        "explanation": failure.explanation,
    });
    serde_json::to_string(&document).map_err(ArtifactError::from)
}

/// Renders the human-readable summary, capped to [`MAX_SUMMARY_LINES`] lines.
fn render_text(failure: &ClassifiedFailure<'_>) -> String {
    let mut lines = Vec::new();
    lines.push(format!("failure {}", failure.failure_id));
    lines.push(format!(
        "category: {} (raw_confidence={:.2}, final_confidence={:.2})",
        failure.classification.category.as_str(),
        failure.classification.raw_confidence,
        failure.explanation.final_confidence,
    ));
    lines.push(String::new());
    lines.push("matched rules:".to_string());
    for influence in failure.explanation.rule_influence.iter().filter(|r| r.matched) {
        lines.push(format!("  - {} (contribution={:.2}): {}", influence.rule_id, influence.contribution, influence.explanation));
    }
    lines.push(String::new());
    lines.push("signal quality:".to_string());
    for signal in &failure.explanation.signal_quality {
        lines.push(format!("  - {}: {:.2} ({})", signal.signal_name, signal.quality_score, signal.evidence));
    }
    if !failure.explanation.evidence_context.error_summary.is_empty() {
        lines.push(String::new());
        lines.push(format!("error: {}", failure.explanation.evidence_context.error_summary));
    }
    if !failure.explanation.evidence_context.stacktrace_summary.is_empty() {
        lines.push(format!("stacktrace: {}", failure.explanation.evidence_context.stacktrace_summary));
    }

    lines.truncate(MAX_SUMMARY_LINES);
    lines.join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use crossbridge_classify::ConfidenceBreakdown;
    use crossbridge_classify::EvidenceContext;
    use crossbridge_classify::RuleInfluence;
    use crossbridge_core::FailureType;
    use crossbridge_core::RuleId;

    use super::*;

    fn sample() -> (Classification, ConfidenceExplanation) {
        let classification =
            Classification { category: FailureType::AutomationDefect, raw_confidence: 0.9, matched_rule_ids: vec![RuleId::new("SEL_001")] };
        let explanation = ConfidenceExplanation {
            failure_id: FailureId::generate(),
            rule_influence: vec![RuleInfluence {
                rule_id: "SEL_001".to_string(),
                weight: 0.9,
                matched: true,
                contribution: 1.0,
                explanation: "locator not found".to_string(),
            }],
            signal_quality: Vec::new(),
            evidence_context: EvidenceContext::default(),
            final_confidence: 0.85,
            breakdown: ConfidenceBreakdown { rule_score: 1.0, signal_score: 0.0 },
        };
        (classification, explanation)
    }

    #[test]
    fn identical_inputs_render_byte_identical_artifacts() {
        let (classification, explanation) = sample();
        let failure_id = FailureId::generate();
        let failure = ClassifiedFailure { failure_id, classification: &classification, explanation: &explanation };
        let first = Artifact::render(&failure).expect("render once");
        let second = Artifact::render(&failure).expect("render again");
        assert_eq!(first.json, second.json);
        assert_eq!(first.text, second.text);
    }

    #[test]
    fn text_summary_stays_within_line_cap() {
        let (classification, explanation) = sample();
        let failure_id = FailureId::generate();
        let failure = ClassifiedFailure { failure_id, classification: &classification, explanation: &explanation };
        let artifact = Artifact::render(&failure).expect("render");
        assert!(artifact.text.lines().count() <= MAX_SUMMARY_LINES);
    }
}
