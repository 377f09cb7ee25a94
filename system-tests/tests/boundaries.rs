// system-tests/tests/boundaries.rs
// ============================================================================
// Suite: Boundary Conditions
// Description: Edge cases named across §4: an empty log body, an oversized
//              stack trace, a failing event with no error message, and a
//              queue that fills faster than its workers can drain it.
// ============================================================================

use crossbridge_core::ExecutionEvent;
use crossbridge_service::CrossBridgeService;
use crossbridge_service::ServiceError;

fn failing_event(test_id: &str, error_message: &str, stack_trace: &str) -> ExecutionEvent {
    let raw = serde_json::from_value(serde_json::json!({
        "event_type": "test_end",
        "framework": "pytest",
        "test_id": test_id,
        "status": "failed",
        "error_message": error_message,
        "stack_trace": stack_trace,
    }))
    .expect("fixture payload parses");
    ExecutionEvent::from_wire(raw).expect("fixture payload normalizes")
}

/// An empty log body still yields the composite fallback signal rather than
/// nothing, and classification against an empty rule pack falls back to
/// `UNKNOWN` at the fixed no-match confidence.
#[test]
fn empty_log_text_falls_back_cleanly() {
    let extractors = crossbridge_classify::ExtractorPipeline::default();
    assert!(extractors.run("").is_empty(), "an empty body should not synthesize signals out of nothing");

    let pack = crossbridge_rules::RulePack::empty("pytest");
    let classification = crossbridge_classify::classify("", &pack);
    assert_eq!(classification.category, crossbridge_core::FailureType::Unknown);
    assert!((classification.raw_confidence - crossbridge_classify::NO_MATCH_CONFIDENCE).abs() < f64::EPSILON);
}

/// A stack trace well past the extractor pipeline's scanned-line cap is
/// processed without panicking or growing unbounded: lines past the cap are
/// dropped before any pattern matching runs.
#[test]
fn oversized_stack_trace_is_capped_not_rejected() {
    let oversized_line_count = crossbridge_classify::MAX_SCANNED_LINES + 5_000;
    let mut stack_trace = String::with_capacity(oversized_line_count * 8);
    for i in 0..oversized_line_count {
        stack_trace.push_str(&format!("  at frame.{i}()\n"));
    }
    stack_trace.push_str("AssertionError: expected 200 got 500");

    let event = failing_event("tests/test_huge_trace.py::test_x", "AssertionError: expected 200 got 500", &stack_trace);
    let log_text = format!("{}\n{}", event.error_message, event.stack_trace);

    let extractors = crossbridge_classify::ExtractorPipeline::default();
    let signals = extractors.run(&log_text);
    assert!(!signals.is_empty(), "capping the scan must not suppress every signal");

    let pack = crossbridge_rules::RulePack::empty("pytest");
    let classification = crossbridge_classify::classify(&log_text, &pack);
    assert_eq!(classification.category, crossbridge_core::FailureType::Unknown);
}

/// A `failed` status with no `error_message` field on the wire normalizes to
/// an empty string, not an error, and still produces a classification
/// rather than panicking.
#[test]
fn failed_status_without_error_message_does_not_panic_the_pipeline() {
    let raw = serde_json::from_value(serde_json::json!({
        "event_type": "test_end",
        "framework": "pytest",
        "test_id": "tests/test_bare.py::test_x",
        "status": "failed",
    }))
    .expect("payload with no error_message still parses");
    let event = ExecutionEvent::from_wire(raw).expect("normalizes with an empty error_message");
    assert!(event.error_message.is_empty());
    assert!(event.is_failing_test_end());

    let pack = crossbridge_rules::RulePack::empty("pytest");
    let classification = crossbridge_classify::classify(&event.error_message, &pack);
    assert_eq!(classification.category, crossbridge_core::FailureType::Unknown);
}

/// A one-slot, single-worker queue under a rapid burst eventually rejects
/// with `RateLimited` rather than blocking the caller indefinitely.
#[tokio::test]
async fn a_saturated_queue_rejects_rather_than_blocks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = crossbridge_config::CrossBridgeConfig::default();
    config.observer.queue.capacity = 1;
    config.observer.queue.workers = 1;

    let service = CrossBridgeService::from_config(&config, dir.path()).expect("from_config");
    let pipeline = service.pipeline();

    let mut rejected = false;
    for i in 0..256 {
        let event = failing_event(&format!("tests/test_burst.py::test_{i}"), "boom", "");
        match pipeline.submit(event) {
            Ok(()) => {}
            Err(ServiceError::RateLimited) => {
                rejected = true;
                break;
            }
            Err(other) => panic!("unexpected error from a saturated queue: {other}"),
        }
    }
    assert!(rejected, "a single-slot queue under a burst of 256 submissions should reject at least one");
}
