// crates/crossbridge-core/src/event.rs
// ============================================================================
// Module: Canonical Event Model (C1)
// Description: Wire schema and normalized in-memory form of one test
//              execution event.
// Purpose: One parse path for every ingest entry point; everything past this
//          module works with [`ExecutionEvent`], never raw JSON.
// Dependencies: serde_json, crate::identifiers, crate::time, crate::error
// ============================================================================

//! ## Overview
//! [`RawExecutionEvent`] mirrors the JSON wire format byte-for-byte (every
//! field optional, status accepted as the empty string) so `serde_json` can
//! reject malformed JSON before domain validation runs.
//! [`ExecutionEvent::from_wire`] then applies the C1 contract: reject unknown
//! `event_type`, require `framework` and `test_id`, stamp a receipt timestamp
//! when the wire payload omits one, and fold any field this build does not
//! recognize into `metadata` so older/newer producers stay compatible.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::identifiers::EventId;
use crate::identifiers::Framework;
use crate::identifiers::RunId;
use crate::identifiers::TestId;
use crate::time::Timestamp;

/// Default schema version stamped on events that omit one.
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0";

/// The kind of execution event being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A test began executing.
    TestStart,
    /// A test finished executing.
    TestEnd,
    /// The test made an API call.
    ApiCall,
    /// The test performed a UI interaction.
    UiInteraction,
    /// A keyword/BDD step boundary.
    Step,
    /// A Robot Framework keyword invocation.
    Keyword,
}

impl EventType {
    /// Parses an `event_type` string exactly as it appears on the wire.
    ///
    /// # Errors
    /// Returns [`CoreError::UnknownEventType`] for any value this build does
    /// not recognize.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "test_start" => Ok(Self::TestStart),
            "test_end" => Ok(Self::TestEnd),
            "api_call" => Ok(Self::ApiCall),
            "ui_interaction" => Ok(Self::UiInteraction),
            "step" => Ok(Self::Step),
            "keyword" => Ok(Self::Keyword),
            other => Err(CoreError::UnknownEventType(other.to_string())),
        }
    }
}

/// Outcome of a test, as reported on `test_end` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// The test passed.
    Passed,
    /// The test failed an assertion or raised an error under test.
    Failed,
    /// The test was skipped.
    Skipped,
    /// The test run itself errored (fixture failure, crash, etc).
    Error,
}

impl EventStatus {
    /// Parses a `status` string, treating the empty string as "not applicable".
    ///
    /// # Errors
    /// Returns [`CoreError::UnknownStatus`] for any non-empty value this
    /// build does not recognize.
    pub fn parse(raw: &str) -> Result<Option<Self>, CoreError> {
        match raw {
            "" => Ok(None),
            "passed" => Ok(Some(Self::Passed)),
            "failed" => Ok(Some(Self::Failed)),
            "skipped" => Ok(Some(Self::Skipped)),
            "error" => Ok(Some(Self::Error)),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }

    /// Returns `true` for statuses the pipeline treats as failures.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }
}

/// The wire representation of one execution event, exactly as received.
///
/// Every field besides `event_type`, `framework`, and `test_id` is optional
/// on the wire; [`ExecutionEvent::from_wire`] fills in defaults and stamps
/// server-assigned fields.
#[derive(Debug, Clone, Deserialize)]
pub struct RawExecutionEvent {
    /// Kind of event, as a wire string (validated during normalization).
    pub event_type: String,
    /// Name of the originating test framework.
    pub framework: String,
    /// Stable per-test identifier assigned by the framework.
    pub test_id: String,
    /// Human-readable test name, if different from `test_id`.
    #[serde(default)]
    pub test_name: Option<String>,
    /// RFC3339 timestamp; stamped on receipt if absent.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Outcome of the test, or `""`/absent for events with no outcome.
    #[serde(default)]
    pub status: Option<String>,
    /// Duration of the reported unit of work, in milliseconds.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Error message, if any.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Stack trace text, if any.
    #[serde(default)]
    pub stack_trace: Option<String>,
    /// Opaque identifier grouping events from one run.
    #[serde(default)]
    pub run_id: Option<String>,
    /// Wire schema version; defaults to [`DEFAULT_SCHEMA_VERSION`].
    #[serde(default)]
    pub schema_version: Option<String>,
    /// Free-form metadata. Unknown top-level wire fields are folded in here
    /// too, so producers ahead of this build's schema degrade gracefully.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Catch-all for any field not named above.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A normalized, validated execution event, immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// Server-assigned identifier for this event.
    pub event_id: EventId,
    /// Kind of event.
    pub event_type: EventType,
    /// Originating test framework.
    pub framework: Framework,
    /// Stable per-test identifier.
    pub test_id: TestId,
    /// Human-readable test name.
    pub test_name: String,
    /// UTC receipt or reported timestamp.
    pub timestamp: Timestamp,
    /// Outcome of the test, if applicable.
    pub status: Option<EventStatus>,
    /// Duration of the reported unit of work, in milliseconds.
    pub duration_ms: u64,
    /// Error message, if any.
    pub error_message: String,
    /// Stack trace text, if any.
    pub stack_trace: String,
    /// Identifier grouping events from one run.
    pub run_id: RunId,
    /// Wire schema version this event was received under.
    pub schema_version: String,
    /// Free-form metadata, including any wire field this build did not name
    /// explicitly.
    pub metadata: BTreeMap<String, Value>,
}

impl ExecutionEvent {
    /// Normalizes a [`RawExecutionEvent`] into a validated [`ExecutionEvent`],
    /// per the C1 contract.
    ///
    /// # Errors
    /// Returns [`CoreError::UnknownEventType`], [`CoreError::UnknownStatus`],
    /// or [`CoreError::InvalidTimestamp`] when the corresponding field is
    /// present but malformed. `framework` and `test_id` are required by the
    /// wire schema's type system (both are non-optional `String` fields), so
    /// this function does not separately check for their absence.
    pub fn from_wire(raw: RawExecutionEvent) -> Result<Self, CoreError> {
        let event_type = EventType::parse(&raw.event_type)?;
        let status = raw.status.as_deref().map(EventStatus::parse).transpose()?.flatten();
        let timestamp = match raw.timestamp {
            Some(value) => Timestamp::parse(&value)?,
            None => Timestamp::now(),
        };

        let mut metadata = raw.metadata;
        for (key, value) in raw.extra {
            metadata.entry(key).or_insert(value);
        }

        Ok(Self {
            event_id: EventId::generate(),
            test_name: raw.test_name.unwrap_or_else(|| raw.test_id.clone()),
            test_id: TestId::new(raw.test_id),
            framework: Framework::new(raw.framework),
            event_type,
            timestamp,
            status,
            duration_ms: raw.duration_ms.unwrap_or(0),
            error_message: raw.error_message.unwrap_or_default(),
            stack_trace: raw.stack_trace.unwrap_or_default(),
            run_id: RunId::new(raw.run_id.unwrap_or_default()),
            schema_version: raw.schema_version.unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string()),
            metadata,
        })
    }

    /// Returns `true` when this is a failing `test_end` event, the trigger
    /// for signal extraction and classification (§4.11 step 3).
    #[must_use]
    pub fn is_failing_test_end(&self) -> bool {
        self.event_type == EventType::TestEnd && self.status.is_some_and(EventStatus::is_failure)
    }

    /// Returns `metadata.api_calls` as a list of endpoint strings, if present.
    #[must_use]
    pub fn api_calls(&self) -> Vec<String> {
        string_list(&self.metadata, "api_calls")
    }

    /// Returns `metadata.pages_visited` as a list of page identifiers, if present.
    #[must_use]
    pub fn pages_visited(&self) -> Vec<String> {
        string_list(&self.metadata, "pages_visited")
    }

    /// Returns `metadata.ui_components` as a list of component identifiers, if present.
    #[must_use]
    pub fn ui_components(&self) -> Vec<String> {
        string_list(&self.metadata, "ui_components")
    }

    /// Returns `metadata.feature`, if present.
    #[must_use]
    pub fn feature(&self) -> Option<String> {
        self.metadata.get("feature").and_then(Value::as_str).map(str::to_string)
    }

    /// Returns `metadata.logs` joined as a single block of text, if present.
    #[must_use]
    pub fn logs_text(&self) -> String {
        string_list(&self.metadata, "logs").join("\n")
    }
}

/// Reads a JSON array of strings out of a metadata map, ignoring non-string entries.
fn string_list(metadata: &BTreeMap<String, Value>, key: &str) -> Vec<String> {
    metadata
        .get(key)
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions only")]

    use super::*;

    fn sample_raw() -> RawExecutionEvent {
        serde_json::from_value(serde_json::json!({
            "event_type": "test_end",
            "framework": "pytest",
            "test_id": "tests/test_login.py::test_valid",
            "status": "failed",
            "error_message": "AssertionError: expected 200 got 500",
            "run_id": "r-abc",
            "metadata": {"api_calls": ["/api/login"], "retries": 2},
        }))
        .expect("sample payload parses")
    }

    #[test]
    fn from_wire_stamps_timestamp_when_absent() {
        let event = ExecutionEvent::from_wire(sample_raw()).expect("valid event");
        assert_eq!(event.framework.as_str(), "pytest");
        assert!(event.is_failing_test_end());
    }

    #[test]
    fn from_wire_rejects_unknown_event_type() {
        let mut raw = sample_raw();
        raw.event_type = "not_a_real_type".to_string();
        let err = ExecutionEvent::from_wire(raw).unwrap_err();
        assert!(matches!(err, CoreError::UnknownEventType(_)));
    }

    #[test]
    fn unknown_wire_fields_fold_into_metadata() {
        let raw: RawExecutionEvent = serde_json::from_value(serde_json::json!({
            "event_type": "step",
            "framework": "cucumber",
            "test_id": "features/login.feature:12",
            "browser_version": "127.0",
        }))
        .expect("payload with an extra field parses");
        let event = ExecutionEvent::from_wire(raw).expect("valid event");
        assert_eq!(event.metadata.get("browser_version").and_then(Value::as_str), Some("127.0"));
    }

    #[test]
    fn api_calls_reads_from_metadata() {
        let event = ExecutionEvent::from_wire(sample_raw()).expect("valid event");
        assert_eq!(event.api_calls(), vec!["/api/login".to_string()]);
    }
}
