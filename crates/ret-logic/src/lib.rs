// crates/ret-logic/src/lib.rs
// ============================================================================
// Crate: ret-logic
// Description: Fail-closed three-valued boolean algebra and requirement
//              trees, used wherever "not enough evidence yet" must stay
//              distinct from "evaluated and false".
// ============================================================================

//! Three-valued (`True`/`False`/`Unknown`) logic for requirement evaluation.
//!
//! [`TriState`] is the value type; [`TriLogic`] is the pluggable
//! interpretation of AND/OR/NOT/group-threshold over it ([`KleeneLogic`] and
//! [`BochvarLogic`] are provided, selectable at runtime via [`LogicMode`]);
//! [`Requirement`] is a boolean tree of domain conditions evaluated under one
//! of those logics, optionally while recording a [`RequirementTrace`] of
//! every condition visited.

mod error;
mod requirement;
mod tristate;

pub use error::RequirementError;
pub use requirement::Requirement;
pub use requirement::RequirementTrace;
pub use requirement::TriStateConditionEval;
pub use tristate::BochvarLogic;
pub use tristate::GroupCounts;
pub use tristate::KleeneLogic;
pub use tristate::LogicMode;
pub use tristate::TriLogic;
pub use tristate::TriState;
