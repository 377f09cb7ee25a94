// crates/ret-logic/tests/support.rs
// ============================================================================
// Module: Integration Test Support
// Description: Shared assertion helper for ret-logic integration tests.
// ============================================================================

//! Shared assertion helper for ret-logic integration tests.

/// Result type returned by every integration test in this crate.
pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Fails the test with `message` unless `condition` holds.
pub fn ensure(condition: bool, message: impl Into<String>) -> TestResult {
    if condition { Ok(()) } else { Err(message.into().into()) }
}
