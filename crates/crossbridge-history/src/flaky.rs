// crates/crossbridge-history/src/flaky.rs
// ============================================================================
// Module: Flaky/Deterministic Detector (C6)
// Description: Per-signature failure history; labels a test's failure nature
//              as DETERMINISTIC, FLAKY, or UNKNOWN.
// Dependencies: crossbridge-core
// ============================================================================

//! ## Overview
//! [`FailureHistory`] accumulates per-[`FailureSignature`] counters across
//! runs; [`FailureHistoryStore::record`] implements §4.6's upsert-then-label
//! algorithm and returns any [`DriftSignal`] a nature transition should raise.

use std::collections::BTreeMap;

use crossbridge_core::DriftSignal;
use crossbridge_core::DriftSignalType;
use crossbridge_core::FailureSignature;
use crossbridge_core::FailureType;
use crossbridge_core::NodeId;
use crossbridge_core::Severity;
use crossbridge_core::TestId;
use crossbridge_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

/// Minimum consecutive failures before a signature is labeled `DETERMINISTIC`.
pub const DETERMINISTIC_THRESHOLD: u32 = 3;
/// Minimum total occurrences before a signature can be labeled `FLAKY` on
/// the passes-between branch.
pub const FLAKY_OCCURRENCE_THRESHOLD: u32 = 3;
/// Minimum distinct error variants under one signature root before `FLAKY`.
pub const FLAKY_VARIANT_THRESHOLD: u32 = 2;

/// The nature the flaky detector assigns to a failure signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureNature {
    /// Consistently reproduces; not flaky.
    Deterministic,
    /// Passes and fails across runs without a clear environmental cause.
    Flaky,
    /// Not enough data yet to decide.
    Unknown,
}

/// Accumulated counters for one [`FailureSignature`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureHistory {
    /// The signature this history tracks.
    pub signature: FailureSignature,
    /// Test this signature was last observed for.
    pub test_id: TestId,
    /// Total times this signature has been observed.
    pub occurrences: u32,
    /// Times a `passed` result was observed between two occurrences.
    pub passes_between: u32,
    /// Current streak of consecutive failures under this signature.
    pub consecutive_failures: u32,
    /// Distinct normalized error message variants seen under this signature root.
    pub distinct_error_variants: u32,
    /// Most recently assigned nature.
    pub nature: FailureNature,
}

impl FailureHistory {
    /// Starts a fresh history for `signature`, as if freshly observed.
    #[must_use]
    pub fn new(signature: FailureSignature, test_id: TestId) -> Self {
        Self {
            signature,
            test_id,
            occurrences: 0,
            passes_between: 0,
            consecutive_failures: 0,
            distinct_error_variants: 1,
            nature: FailureNature::Unknown,
        }
    }

    /// Applies §4.6 step 3's labeling rules given the current counters.
    fn label(&self, category: FailureType) -> FailureNature {
        if self.consecutive_failures >= DETERMINISTIC_THRESHOLD
            && matches!(category, FailureType::ProductDefect | FailureType::AutomationDefect)
        {
            return FailureNature::Deterministic;
        }
        if (self.passes_between >= 1 && self.occurrences >= FLAKY_OCCURRENCE_THRESHOLD)
            || self.distinct_error_variants >= FLAKY_VARIANT_THRESHOLD
        {
            return FailureNature::Flaky;
        }
        FailureNature::Unknown
    }
}

/// Whether the test passed, failed, or hasn't been observed before this record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorOutcome {
    /// The test's previous recorded run passed.
    Passed,
    /// The test's previous recorded run failed.
    Failed,
    /// No prior run is on record.
    None,
}

/// In-memory per-signature failure history, keyed by [`FailureSignature`].
#[derive(Debug, Default)]
pub struct FailureHistoryStore {
    histories: BTreeMap<FailureSignature, FailureHistory>,
}

impl FailureHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { histories: BTreeMap::new() }
    }

    /// Records one failure occurrence, returning the updated history and any
    /// [`DriftSignal`] a nature transition raises (§4.6 step 4).
    pub fn record(
        &mut self,
        signature: FailureSignature,
        test_id: TestId,
        category: FailureType,
        is_new_error_variant: bool,
        prior_outcome: PriorOutcome,
        observed_at: Timestamp,
    ) -> (FailureHistory, Option<DriftSignal>) {
        let entry =
            self.histories.entry(signature.clone()).or_insert_with(|| FailureHistory::new(signature, test_id));

        entry.occurrences += 1;
        if is_new_error_variant {
            entry.distinct_error_variants += 1;
        }
        match prior_outcome {
            PriorOutcome::Passed => {
                entry.passes_between += 1;
                entry.consecutive_failures = 1;
            }
            PriorOutcome::Failed => entry.consecutive_failures += 1,
            PriorOutcome::None => entry.consecutive_failures = 1,
        }

        let previous_nature = entry.nature;
        entry.nature = entry.label(category);

        let drift = transition_signal(previous_nature, entry.nature, &entry.test_id, observed_at);
        (entry.clone(), drift)
    }

    /// Looks up the current history for `signature`, if any is on record.
    #[must_use]
    pub fn get(&self, signature: &FailureSignature) -> Option<&FailureHistory> {
        self.histories.get(signature)
    }
}

/// Builds the `flaky` [`DriftSignal`] for a nature transition, if any is warranted.
fn transition_signal(
    previous: FailureNature,
    current: FailureNature,
    test_id: &TestId,
    observed_at: Timestamp,
) -> Option<DriftSignal> {
    if previous == current {
        return None;
    }
    let severity = match current {
        FailureNature::Flaky => Severity::High,
        FailureNature::Deterministic => Severity::Critical,
        FailureNature::Unknown => return None,
    };
    tracing::info!(%test_id, ?previous, ?current, "failure nature transition");
    Some(DriftSignal {
        signal_type: DriftSignalType::Flaky,
        target_id: NodeId::new(format!("test:{}", test_id.as_str())),
        severity,
        detected_at: observed_at,
        details: format!("{test_id} transitioned from {previous:?} to {current:?}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]
mod tests {
    use crossbridge_core::hashing::failure_signature;

    use super::*;

    fn sig(n: u32) -> FailureSignature {
        failure_signature("tests/test_login.py::test_valid", "PRODUCT_DEFECT", &format!("boom {n}"))
    }

    #[test]
    fn three_consecutive_failures_labels_deterministic() {
        let mut store = FailureHistoryStore::new();
        let signature = sig(1);
        let test_id = TestId::new("t2");
        let mut last = None;
        for i in 0..3 {
            let prior = if i == 0 { PriorOutcome::None } else { PriorOutcome::Failed };
            let (history, drift) = store.record(
                signature.clone(),
                test_id.clone(),
                FailureType::ProductDefect,
                false,
                prior,
                Timestamp::now(),
            );
            last = Some((history, drift));
        }
        let (history, drift) = last.expect("three iterations ran");
        assert_eq!(history.nature, FailureNature::Deterministic);
        assert!(drift.is_some());
        assert_eq!(drift.expect("drift emitted").severity, Severity::Critical);
    }

    #[test]
    fn pass_then_repeated_failure_labels_flaky() {
        let mut store = FailureHistoryStore::new();
        let signature = sig(2);
        let test_id = TestId::new("t3");
        store.record(
            signature.clone(),
            test_id.clone(),
            FailureType::ProductDefect,
            false,
            PriorOutcome::None,
            Timestamp::now(),
        );
        store.record(
            signature.clone(),
            test_id.clone(),
            FailureType::ProductDefect,
            false,
            PriorOutcome::Passed,
            Timestamp::now(),
        );
        let (history, _) = store.record(
            signature,
            test_id,
            FailureType::ProductDefect,
            false,
            PriorOutcome::Failed,
            Timestamp::now(),
        );
        assert_eq!(history.nature, FailureNature::Flaky);
    }

    #[test]
    fn single_occurrence_is_unknown() {
        let mut store = FailureHistoryStore::new();
        let (history, drift) = store.record(
            sig(3),
            TestId::new("t4"),
            FailureType::ProductDefect,
            false,
            PriorOutcome::None,
            Timestamp::now(),
        );
        assert_eq!(history.nature, FailureNature::Unknown);
        assert!(drift.is_none());
    }
}
