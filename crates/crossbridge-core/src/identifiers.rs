// crates/crossbridge-core/src/identifiers.rs
// ============================================================================
// Module: Canonical Identifiers
// Description: Opaque, strongly typed identifiers shared across every stage
//              of the observability pipeline.
// Purpose: Keep test ids, run ids, rule ids and the rest from being
//          interchanged by accident at call sites.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Every identifier here is a transparent newtype over a `String` or `Uuid`.
//! None of them normalize or validate their contents beyond what the wire
//! schema in `crossbridge-config`'s JSON Schema already enforces; they exist
//! purely to stop `test_id` and `run_id` (both plain strings upstream) from
//! being swapped at a call site.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Server-assigned identifier for one accepted [`crate::event::ExecutionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Generates a fresh, random event identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID as an event identifier.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn get(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stable identifier for one test, assigned by the originating framework.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    /// Creates a new test identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TestId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TestId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Opaque identifier grouping every event emitted by one test run.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Creates a new run identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RunId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Name of a test framework emitting events (`pytest`, `selenium`, `robot`, ...).
///
/// # Invariants
/// - Opaque UTF-8 string; lower-cased framework names are conventional but not enforced.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Framework(String);

impl Framework {
    /// Creates a new framework identifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the framework name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fallback framework name used when no specific rule pack exists.
    pub const GENERIC: &'static str = "generic";
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Framework {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Framework {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Stable identifier for a single classification rule, unique within its pack.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    /// Creates a new rule identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RuleId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier for one classification, independent of the explanation it anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureId(Uuid);

impl FailureId {
    /// Generates a fresh, random failure identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID as a failure identifier.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn get(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for FailureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Deterministic hash identifying a class of failures, used to anchor
/// [`crate`]-level flaky/deterministic history.
///
/// # Invariants
/// - Always a lower-case hex string; constructed only via
///   [`crate::hashing::failure_signature`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureSignature(String);

impl FailureSignature {
    /// Wraps an already-computed hex digest as a failure signature.
    ///
    /// Prefer [`crate::hashing::failure_signature`] to construct one from raw
    /// inputs; this constructor exists for deserialization and storage
    /// round-trips.
    #[must_use]
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Returns the digest as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FailureSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Namespaced identifier for one node in the coverage graph, e.g.
/// `test:tests/test_login.py::test_valid` or `api:/api/login`.
///
/// # Invariants
/// - Opaque UTF-8 string; the `<kind>:<name>` namespacing convention is
///   enforced by [`crate::graph`] constructors, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new coverage graph node identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trips_through_display() {
        let id = TestId::new("tests/test_login.py::test_valid");
        assert_eq!(id.as_str(), id.to_string());
    }

    #[test]
    fn event_id_generate_yields_unique_values() {
        assert_ne!(EventId::generate(), EventId::generate());
    }
}
