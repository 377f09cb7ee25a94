// crates/crossbridge-core/src/domain.rs
// ============================================================================
// Module: Shared Domain Vocabulary
// Description: Enums and the DriftSignal type shared by the classifier,
//              coverage graph, flaky detector, and drift monitor.
// Purpose: Give every component that emits or reads a DriftSignal the same
//          type, instead of each crate defining its own.
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::NodeId;
use crate::time::Timestamp;

/// Root cause category assigned to a failed test (GLOSSARY: "Failure category").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureType {
    /// The application under test is broken.
    ProductDefect,
    /// The test or its automation harness is broken.
    AutomationDefect,
    /// The test environment (network, OS, infra) caused the failure.
    EnvironmentIssue,
    /// The test or environment was misconfigured.
    ConfigurationIssue,
    /// No rule matched; cause is unknown.
    Unknown,
    /// The classifier itself failed; see §4.4's infallibility contract.
    Error,
}

impl FailureType {
    /// Returns the wire string for this category, matching the GLOSSARY spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProductDefect => "PRODUCT_DEFECT",
            Self::AutomationDefect => "AUTOMATION_DEFECT",
            Self::EnvironmentIssue => "ENVIRONMENT_ISSUE",
            Self::ConfigurationIssue => "CONFIGURATION_ISSUE",
            Self::Unknown => "UNKNOWN",
            Self::Error => "ERROR",
        }
    }
}

/// Severity assigned to a [`DriftSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; no action implied.
    Low,
    /// Worth a look during the next triage pass.
    Moderate,
    /// Should be investigated soon.
    High,
    /// Needs immediate attention.
    Critical,
}

/// The kind of change a [`DriftSignal`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftSignalType {
    /// A test was observed for the first time.
    NewTest,
    /// An API endpoint was observed for the first time.
    NewApi,
    /// A failure signature transitioned to or was confirmed as flaky.
    Flaky,
    /// Expected coverage for a feature or API dropped off.
    CoverageGap,
    /// A test's confidence measurements shifted meaningfully.
    ConfidenceDrift,
}

/// A detected, actionable change in a tracked metric (GLOSSARY: "Drift").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftSignal {
    /// The kind of change detected.
    pub signal_type: DriftSignalType,
    /// The entity the signal is about (a test id, API node id, etc).
    pub target_id: NodeId,
    /// How urgently this should be looked at.
    pub severity: Severity,
    /// When the signal was detected.
    pub detected_at: Timestamp,
    /// Free-form human-readable detail.
    pub details: String,
}
