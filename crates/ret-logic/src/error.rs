// crates/ret-logic/src/error.rs
// ============================================================================
// Module: Requirement Errors
// Description: Error taxonomy for requirement evaluation failures, with both
//              a developer-facing Display and an end-user-facing message.
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Errors produced while evaluating or validating a requirement tree.
///
/// [`RequirementError::Display`] produces a diagnostic string suitable for
/// logs; [`RequirementError::user_message`] produces a shorter string safe to
/// surface to an end user.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RequirementError {
    /// A `require_group` threshold was not met.
    #[error("Group requirement failed (passed {passed}, needed {required})")]
    GroupRequirementFailed {
        /// Members that were satisfied.
        passed: usize,
        /// Members required for the group to pass.
        required: usize,
    },
    /// Every alternative in an OR requirement failed.
    #[error("All alternatives in OR requirement failed")]
    OrAllFailed,
    /// A NOT requirement's inner requirement was satisfied.
    #[error("NOT requirement failed: inner requirement was satisfied")]
    NotFailed,
    /// No subject was available to evaluate conditions against.
    #[error("Subject not available in evaluation context")]
    SubjectNotAvailable,
    /// No target was available to evaluate conditions against.
    #[error("Target not available in evaluation context")]
    TargetNotAvailable,
    /// World state could not be read.
    #[error("World state unavailable or inaccessible")]
    WorldStateUnavailable,
    /// A single condition evaluated to false.
    #[error("Requirement not met: {0}")]
    ConditionFailed(String),
    /// A condition could not be evaluated at all.
    #[error("Condition evaluation error: {0}")]
    ConditionError(String),
    /// The requirement tree itself was malformed.
    #[error("Invalid requirement structure: {0}")]
    InvalidStructure(String),
    /// The requirement tree exceeded the allowed nesting depth.
    #[error("Requirement too deep: {actual_depth} levels (max {max_depth})")]
    TooDeep {
        /// Configured maximum nesting depth.
        max_depth: usize,
        /// Actual nesting depth encountered.
        actual_depth: usize,
    },
    /// Any other requirement failure not covered above.
    #[error("Requirement error: {0}")]
    Other(String),
}

impl RequirementError {
    /// Builds a [`RequirementError::ConditionFailed`] from any displayable message.
    pub fn condition_failed(message: impl Into<String>) -> Self {
        Self::ConditionFailed(message.into())
    }

    /// Builds a [`RequirementError::ConditionError`] from any displayable message.
    pub fn condition_error(message: impl Into<String>) -> Self {
        Self::ConditionError(message.into())
    }

    /// Builds a [`RequirementError::InvalidStructure`] from any displayable message.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure(message.into())
    }

    /// Builds a [`RequirementError::Other`] from any displayable message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Returns a short message appropriate to show an end user, collapsing
    /// internal-only variants to a generic description.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::GroupRequirementFailed {
                passed,
                required,
            } => {
                let remaining = required.saturating_sub(*passed);
                let noun = if remaining == 1 { "requirement" } else { "requirements" };
                format!("You need {remaining} more {noun}")
            }
            Self::OrAllFailed => "None of the alternative requirements were met".to_string(),
            Self::NotFailed => "A condition that should not be true was satisfied".to_string(),
            Self::SubjectNotAvailable => "Cannot evaluate requirement: no subject available".to_string(),
            Self::TargetNotAvailable => "Cannot evaluate requirement: no target available".to_string(),
            Self::WorldStateUnavailable => {
                "Cannot evaluate requirement: world state unavailable".to_string()
            }
            Self::ConditionFailed(message) => message.clone(),
            Self::ConditionError(_) => {
                "An internal error occurred while checking requirements".to_string()
            }
            Self::InvalidStructure(_) => "Invalid requirement configuration".to_string(),
            Self::TooDeep {
                ..
            } => "Requirement too complex to evaluate".to_string(),
            Self::Other(message) => format!("Requirement not met: {message}"),
        }
    }
}

impl From<&str> for RequirementError {
    fn from(value: &str) -> Self {
        Self::Other(value.to_string())
    }
}

impl From<String> for RequirementError {
    fn from(value: String) -> Self {
        Self::Other(value)
    }
}
