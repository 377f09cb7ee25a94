// system-tests/tests/properties.rs
// ============================================================================
// Suite: Quantified Properties
// Description: Randomized checks for the invariants §8 states as
//              properties rather than named scenarios: idempotent graph
//              upserts, deterministic classification, bounded contribution
//              and confidence scores, and monotonic occurrence counts.
// ============================================================================

//! Randomized checks for the invariants §8 states as properties rather than
//! named scenarios: idempotent graph upserts, deterministic classification,
//! bounded contribution and confidence scores, and monotonic occurrence
//! counts.

use crossbridge_core::FailureType;
use crossbridge_core::NodeId;
use crossbridge_core::RuleId;
use crossbridge_core::TestId;
use crossbridge_core::Timestamp;
use crossbridge_core::hashing::failure_signature;
use crossbridge_history::FailureHistoryStore;
use crossbridge_history::PriorOutcome;
use crossbridge_rules::Rule;
use crossbridge_rules::RulePack;
use crossbridge_store::CoverageGraph;
use proptest::prelude::*;

fn arbitrary_rule(id: String, confidence: f64, priority: i32) -> Rule {
    Rule {
        id: RuleId::new(id),
        description: "generated for property testing".to_string(),
        match_any: vec!["needle".to_string()],
        requires_all: Vec::new(),
        excludes: Vec::new(),
        failure_type: FailureType::AutomationDefect,
        confidence,
        priority,
    }
}

proptest! {
    /// Upserting the same node any number of extra times never creates a
    /// second row and only the first upsert reports "first observation".
    #[test]
    fn coverage_graph_node_upsert_is_idempotent(id in "[a-z]{1,16}", extra_upserts in 0u32..20) {
        let graph = CoverageGraph::open_in_memory().expect("open graph");
        let node = NodeId::new(format!("test:{id}"));
        let now = Timestamp::now();

        let first = graph.upsert_node(&node, "test", now).expect("first upsert");
        prop_assert!(first);

        for _ in 0..extra_upserts {
            let repeat = graph.upsert_node(&node, "test", now).expect("repeat upsert");
            prop_assert!(!repeat);
        }
    }

    /// Classifying the same log text against the same rule pack twice always
    /// yields the same category, confidence, and matched rule ids (§4.4's
    /// infallible-and-deterministic contract).
    #[test]
    fn classification_is_deterministic(
        confidence in 0.0f64..1.0,
        priority in -100i32..100,
        log_text in "[a-z needle]{0,64}",
    ) {
        let pack = RulePack {
            framework: "pytest".to_string(),
            version: "1".to_string(),
            rules: vec![arbitrary_rule("R1".to_string(), confidence, priority)],
        };
        let first = crossbridge_classify::classify(&log_text, &pack);
        let second = crossbridge_classify::classify(&log_text, &pack);
        prop_assert_eq!(first, second);
    }

    /// Matched-rule contributions in an explanation never sum past 1, and
    /// never go negative, regardless of how many rules matched or their
    /// relative weights.
    #[test]
    fn rule_contribution_is_normalized(weights in proptest::collection::vec(0.01f64..1.0, 1..6)) {
        let rules: Vec<Rule> = weights
            .iter()
            .enumerate()
            .map(|(i, weight)| arbitrary_rule(format!("R{i}"), *weight, 0))
            .collect();
        let matched_rule_ids: Vec<RuleId> = rules.iter().map(|r| r.id.clone()).collect();
        let classification = crossbridge_classify::Classification {
            category: FailureType::AutomationDefect,
            raw_confidence: weights[0],
            matched_rule_ids,
        };
        let explanation = crossbridge_classify::build_explanation(
            crossbridge_core::FailureId::generate(),
            &classification,
            &rules,
            "needle",
            &[],
        );
        let total: f64 = explanation.rule_influence.iter().filter(|r| r.matched).map(|r| r.contribution).sum();
        prop_assert!(total <= 1.0 + 1e-9);
        prop_assert!(total >= 0.0);
        prop_assert!((0.0..=1.0).contains(&explanation.final_confidence));
    }

    /// Recording the same failure signature repeatedly only ever grows its
    /// occurrence count; it never resets or decreases mid-sequence.
    #[test]
    fn failure_history_occurrences_are_monotonic(
        outcomes in proptest::collection::vec(proptest::bool::ANY, 1..20),
    ) {
        let mut store = FailureHistoryStore::new();
        let test_id = TestId::new("tests/test_property.py::test_x");
        let signature = failure_signature(test_id.as_str(), "PRODUCT_DEFECT", "boom");

        let mut previous = 0u32;
        for (i, passed_before) in outcomes.iter().enumerate() {
            let prior = if i == 0 {
                PriorOutcome::None
            } else if *passed_before {
                PriorOutcome::Passed
            } else {
                PriorOutcome::Failed
            };
            let (history, _drift) = store.record(
                signature.clone(),
                test_id.clone(),
                FailureType::ProductDefect,
                false,
                prior,
                Timestamp::now(),
            );
            prop_assert!(history.occurrences >= previous);
            previous = history.occurrences;
        }
        prop_assert_eq!(previous, u32::try_from(outcomes.len()).unwrap_or(u32::MAX));
    }
}
