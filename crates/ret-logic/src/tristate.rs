// crates/ret-logic/src/tristate.rs
// ============================================================================
// Module: Tri-State Primitive
// Description: Three-valued logic (True/False/Unknown) and the Kleene and
//              Bochvar interpretations of AND/OR/NOT over it.
// Purpose: Give fail-closed matching code an "I don't know yet" value instead
//          of forcing a premature True/False guess on incomplete evidence.
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

/// A three-valued truth value: known true, known false, or not yet determined.
///
/// `Unknown` is returned whenever evidence is missing or still arriving; it is
/// never coerced to `False` by callers that need a fail-closed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriState {
    /// The condition is known to hold.
    True,
    /// The condition is known not to hold.
    False,
    /// Insufficient evidence to decide either way.
    Unknown,
}

impl TriState {
    /// Returns `true` if this value is [`TriState::True`].
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    /// Returns `true` if this value is [`TriState::False`].
    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::False)
    }

    /// Returns `true` if this value is [`TriState::Unknown`].
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

/// Tallies used to evaluate a "require at least N of these" group.
///
/// `satisfied + unknown + failed == total` always holds by construction;
/// [`GroupCounts::failed`] derives the failed count rather than storing it.
#[derive(Debug, Clone, Copy)]
pub struct GroupCounts {
    /// Number of members that evaluated to [`TriState::True`].
    pub satisfied: u32,
    /// Number of members that evaluated to [`TriState::Unknown`].
    pub unknown: u32,
    /// Total number of members in the group.
    pub total: u32,
}

impl GroupCounts {
    /// Number of members that evaluated to [`TriState::False`].
    ///
    /// Uses saturating subtraction so malformed counts (more satisfied+unknown
    /// than total) never underflow.
    #[must_use]
    pub const fn failed(self) -> u32 {
        self.total.saturating_sub(self.satisfied).saturating_sub(self.unknown)
    }
}

/// A three-valued boolean algebra: an interpretation of AND/OR/NOT, plus the
/// threshold rule for "require at least N" groups.
///
/// Two standard interpretations are provided: [`KleeneLogic`] (absorbing
/// False/True) and [`BochvarLogic`] (infectious Unknown). Both share the same
/// `require_group` threshold rule, since group semantics are about counting,
/// not about how a single AND/OR/NOT behaves.
pub trait TriLogic {
    /// Evaluates `a AND b` under this logic.
    fn and(&self, a: TriState, b: TriState) -> TriState;

    /// Evaluates `a OR b` under this logic.
    fn or(&self, a: TriState, b: TriState) -> TriState;

    /// Evaluates `NOT a` under this logic.
    fn not(&self, a: TriState) -> TriState;

    /// Evaluates whether at least `min` members of a group are satisfied.
    ///
    /// Returns `True` once enough members are already satisfied, `False` once
    /// the threshold is provably out of reach, and `Unknown` while the
    /// outcome still depends on members that haven't resolved yet.
    fn require_group(&self, min: u8, counts: GroupCounts) -> TriState {
        let min = u32::from(min);
        if counts.satisfied >= min {
            TriState::True
        } else if counts.satisfied + counts.unknown < min {
            TriState::False
        } else {
            TriState::Unknown
        }
    }
}

/// Strong Kleene logic: `False` absorbs in AND, `True` absorbs in OR, and
/// `Unknown` only surfaces when the result genuinely depends on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct KleeneLogic;

impl TriLogic for KleeneLogic {
    fn and(&self, a: TriState, b: TriState) -> TriState {
        match (a, b) {
            (TriState::False, _) | (_, TriState::False) => TriState::False,
            (TriState::Unknown, _) | (_, TriState::Unknown) => TriState::Unknown,
            (TriState::True, TriState::True) => TriState::True,
        }
    }

    fn or(&self, a: TriState, b: TriState) -> TriState {
        match (a, b) {
            (TriState::True, _) | (_, TriState::True) => TriState::True,
            (TriState::Unknown, _) | (_, TriState::Unknown) => TriState::Unknown,
            (TriState::False, TriState::False) => TriState::False,
        }
    }

    fn not(&self, a: TriState) -> TriState {
        match a {
            TriState::True => TriState::False,
            TriState::False => TriState::True,
            TriState::Unknown => TriState::Unknown,
        }
    }
}

/// Bochvar (internal) logic: `Unknown` is infectious and propagates through
/// AND/OR regardless of the other operand.
#[derive(Debug, Clone, Copy, Default)]
pub struct BochvarLogic;

impl TriLogic for BochvarLogic {
    fn and(&self, a: TriState, b: TriState) -> TriState {
        if a.is_unknown() || b.is_unknown() {
            return TriState::Unknown;
        }
        TriState::from(a.is_true() && b.is_true())
    }

    fn or(&self, a: TriState, b: TriState) -> TriState {
        if a.is_unknown() || b.is_unknown() {
            return TriState::Unknown;
        }
        TriState::from(a.is_true() || b.is_true())
    }

    fn not(&self, a: TriState) -> TriState {
        match a {
            TriState::True => TriState::False,
            TriState::False => TriState::True,
            TriState::Unknown => TriState::Unknown,
        }
    }
}

/// Runtime selector between the two built-in logics, for callers that choose
/// an interpretation from configuration rather than at compile time.
#[derive(Debug, Clone, Copy)]
pub enum LogicMode {
    /// Strong Kleene semantics, see [`KleeneLogic`].
    Kleene,
    /// Bochvar semantics, see [`BochvarLogic`].
    Bochvar,
}

impl TriLogic for LogicMode {
    fn and(&self, a: TriState, b: TriState) -> TriState {
        match self {
            Self::Kleene => KleeneLogic.and(a, b),
            Self::Bochvar => BochvarLogic.and(a, b),
        }
    }

    fn or(&self, a: TriState, b: TriState) -> TriState {
        match self {
            Self::Kleene => KleeneLogic.or(a, b),
            Self::Bochvar => BochvarLogic.or(a, b),
        }
    }

    fn not(&self, a: TriState) -> TriState {
        match self {
            Self::Kleene => KleeneLogic.not(a),
            Self::Bochvar => BochvarLogic.not(a),
        }
    }
}
