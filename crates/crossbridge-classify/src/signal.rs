// crates/crossbridge-classify/src/signal.rs
// ============================================================================
// Module: Signal Model (C3 data model)
// Description: Typed, confidence-weighted evidence extracted from log text.
// Dependencies: serde
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// The kind of evidence a [`crate::extractor::Extractor`] found in log text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    /// An operation exceeded its deadline.
    Timeout,
    /// An assertion failed.
    Assertion,
    /// A UI locator could not be resolved.
    Locator,
    /// An HTTP call returned an error status.
    HttpError,
    /// A network connection could not be established.
    ConnectionError,
    /// DNS resolution failed.
    DnsError,
    /// An operation was denied for lack of permission.
    PermissionError,
    /// A module or symbol failed to import.
    ImportError,
    /// The process ran out of memory.
    MemoryError,
    /// A null/None dereference occurred.
    NullPointer,
    /// A referenced file did not exist.
    FileNotFound,
    /// The test script itself failed to parse.
    SyntaxError,
    /// A UI wait exceeded its timeout.
    UiTimeout,
    /// A UI element reference went stale.
    UiStale,
    /// A keyword-driven test referenced an unknown keyword.
    KeywordNotFound,
    /// A framework/test library raised an internal error.
    LibraryError,
    /// A test fixture failed to set up or tear down.
    FixtureError,
    /// No more specific signal type matched.
    Unknown,
}

/// One piece of typed evidence extracted from a failure's log text.
///
/// # Invariants
/// - `confidence` is in `[0, 1]`.
/// - `evidence` is at most 150 characters (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// The kind of evidence found.
    pub signal_type: SignalType,
    /// How strongly this pattern indicates its `signal_type`.
    pub confidence: f64,
    /// Shortest disambiguating substring, truncated to 150 chars.
    pub evidence: String,
    /// Type-specific attributes (`locator_type`, `status_code`, `timeout_ms`, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl Signal {
    /// Maximum length of the `evidence` field, per §4.3.
    pub const MAX_EVIDENCE_CHARS: usize = 150;

    /// Builds a signal, truncating `evidence` to [`Signal::MAX_EVIDENCE_CHARS`].
    #[must_use]
    pub fn new(signal_type: SignalType, confidence: f64, evidence: impl Into<String>) -> Self {
        let mut evidence = evidence.into();
        if evidence.chars().count() > Self::MAX_EVIDENCE_CHARS {
            evidence = evidence.chars().take(Self::MAX_EVIDENCE_CHARS).collect();
        }
        Self { signal_type, confidence, evidence, metadata: BTreeMap::new() }
    }

    /// Adds one metadata attribute, returning `self` for chaining.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
