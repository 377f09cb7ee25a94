// crates/ret-logic/src/requirement.rs
// ============================================================================
// Module: Requirement Tree
// Description: A boolean tree over domain conditions, evaluated under a
//              pluggable tri-state logic with optional per-condition tracing.
// Dependencies: crate::tristate
// ============================================================================

use crate::tristate::GroupCounts;
use crate::tristate::TriLogic;
use crate::tristate::TriState;

/// Evaluates a single condition against a row of evidence.
///
/// `Reader` is the evidence source type for condition `Self`; it is
/// associated rather than a free type parameter so a `Requirement<P>` only
/// ever needs one reader type per condition type.
pub trait TriStateConditionEval {
    /// The evidence source this condition reads from.
    type Reader<'a>;

    /// Evaluates this condition for the given row of evidence.
    fn eval_row_tristate(&self, reader: &Self::Reader<'_>, row: usize) -> TriState;
}

/// Observes each condition evaluated while walking a [`Requirement`] tree.
///
/// Useful for explaining *why* a requirement resolved the way it did without
/// re-walking the tree a second time.
pub trait RequirementTrace<P> {
    /// Called once for every condition leaf visited, in evaluation order.
    fn on_condition_evaluated(&mut self, condition: &P, result: TriState);
}

/// A boolean requirement tree over conditions of type `P`.
///
/// Built with the [`Requirement::condition`], [`Requirement::and`],
/// [`Requirement::or`], [`Requirement::negate`], and
/// [`Requirement::require_group`] constructors, then evaluated with
/// [`Requirement::eval_tristate`] or [`Requirement::eval_tristate_with_trace`].
#[derive(Debug, Clone)]
pub enum Requirement<P> {
    /// A leaf condition.
    Condition(P),
    /// All of the inner requirements must hold.
    And(Vec<Requirement<P>>),
    /// At least one of the inner requirements must hold.
    Or(Vec<Requirement<P>>),
    /// The inner requirement must not hold.
    Not(Box<Requirement<P>>),
    /// At least `min` of the member requirements must hold.
    RequireGroup {
        /// Minimum number of satisfied members required.
        min: u8,
        /// The requirements counted toward the threshold.
        members: Vec<Requirement<P>>,
    },
}

impl<P> Requirement<P> {
    /// Builds a leaf requirement over a single condition.
    pub fn condition(condition: P) -> Self {
        Self::Condition(condition)
    }

    /// Builds a requirement that holds only if every member holds.
    pub fn and(members: Vec<Self>) -> Self {
        Self::And(members)
    }

    /// Builds a requirement that holds if any member holds.
    pub fn or(members: Vec<Self>) -> Self {
        Self::Or(members)
    }

    /// Builds a requirement that holds only if `inner` does not.
    pub fn negate(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Builds a requirement that holds once at least `min` members hold.
    pub fn require_group(min: u8, members: Vec<Self>) -> Self {
        Self::RequireGroup {
            min,
            members,
        }
    }
}

impl<P: TriStateConditionEval> Requirement<P> {
    /// Evaluates this requirement for one row of evidence under `logic`.
    pub fn eval_tristate<L: TriLogic>(
        &self,
        reader: &P::Reader<'_>,
        row: usize,
        logic: &L,
    ) -> TriState {
        match self {
            Self::Condition(condition) => condition.eval_row_tristate(reader, row),
            Self::And(members) => members
                .iter()
                .fold(TriState::True, |acc, member| {
                    logic.and(acc, member.eval_tristate(reader, row, logic))
                }),
            Self::Or(members) => members
                .iter()
                .fold(TriState::False, |acc, member| {
                    logic.or(acc, member.eval_tristate(reader, row, logic))
                }),
            Self::Not(inner) => logic.not(inner.eval_tristate(reader, row, logic)),
            Self::RequireGroup {
                min,
                members,
            } => {
                let counts = tally(members.iter().map(|member| member.eval_tristate(reader, row, logic)));
                logic.require_group(*min, counts)
            }
        }
    }

    /// Evaluates this requirement like [`Requirement::eval_tristate`], while
    /// reporting every condition leaf visited to `trace` in evaluation order.
    pub fn eval_tristate_with_trace<L: TriLogic, T: RequirementTrace<P>>(
        &self,
        reader: &P::Reader<'_>,
        row: usize,
        logic: &L,
        trace: &mut T,
    ) -> TriState {
        match self {
            Self::Condition(condition) => {
                let result = condition.eval_row_tristate(reader, row);
                trace.on_condition_evaluated(condition, result);
                result
            }
            Self::And(members) => members.iter().fold(TriState::True, |acc, member| {
                logic.and(acc, member.eval_tristate_with_trace(reader, row, logic, trace))
            }),
            Self::Or(members) => members.iter().fold(TriState::False, |acc, member| {
                logic.or(acc, member.eval_tristate_with_trace(reader, row, logic, trace))
            }),
            Self::Not(inner) => logic.not(inner.eval_tristate_with_trace(reader, row, logic, trace)),
            Self::RequireGroup {
                min,
                members,
            } => {
                let counts = tally(
                    members.iter().map(|member| member.eval_tristate_with_trace(reader, row, logic, trace)),
                );
                logic.require_group(*min, counts)
            }
        }
    }
}

/// Folds an iterator of member results into [`GroupCounts`] for threshold evaluation.
fn tally(results: impl Iterator<Item = TriState>) -> GroupCounts {
    let mut satisfied = 0u32;
    let mut unknown = 0u32;
    let mut total = 0u32;
    for result in results {
        total += 1;
        match result {
            TriState::True => satisfied += 1,
            TriState::Unknown => unknown += 1,
            TriState::False => {}
        }
    }
    GroupCounts {
        satisfied,
        unknown,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    struct AlwaysTrue;

    impl TriStateConditionEval for AlwaysTrue {
        type Reader<'a> = ();

        fn eval_row_tristate(&self, (): &Self::Reader<'_>, _row: usize) -> TriState {
            TriState::True
        }
    }

    #[test]
    fn and_of_single_true_condition_is_true() {
        let req = Requirement::and(vec![Requirement::condition(AlwaysTrue)]);
        assert_eq!(req.eval_tristate(&(), 0, &crate::tristate::KleeneLogic), TriState::True);
    }

    #[test]
    fn negated_true_condition_is_false() {
        let req = Requirement::negate(Requirement::condition(AlwaysTrue));
        assert_eq!(req.eval_tristate(&(), 0, &crate::tristate::KleeneLogic), TriState::False);
    }
}
