//! The lattice contract every abstract domain implements.
//!
//! Boundary cases against the bottom and top sentinels are handled once by
//! the provided `lub`, `widening` and `less_or_equal` methods; concrete
//! domains only implement the `*_aux` forms for two non-sentinel operands.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Error;

/// An element of a lattice with canonical top and bottom sentinels.
///
/// `lub(x, y)` must be an upper bound of both operands. `widening` must
/// make every ascending chain stabilize in finitely many steps, even on
/// infinite-height domains; it defaults to `lub`, which is only correct
/// for finite-height domains. `less_or_equal` is the approximation order:
/// reflexive, transitive, and antisymmetric up to `==`.
pub trait Lattice: Clone + fmt::Debug + PartialEq + Sized {
    /// The canonical top element.
    fn top() -> Self;

    /// The canonical bottom element.
    fn bottom() -> Self;

    fn is_top(&self) -> bool;

    fn is_bottom(&self) -> bool;

    /// The least upper bound of two non-sentinel, non-equal elements.
    fn lub_aux(&self, other: &Self) -> Result<Self, Error>;

    /// Widening of two non-sentinel, non-equal elements. Defaults to
    /// `lub_aux`, which terminates only over finite-height domains.
    fn widening_aux(&self, other: &Self) -> Result<Self, Error> {
        self.lub_aux(other)
    }

    /// The ordering of two non-sentinel, non-equal elements.
    fn less_or_equal_aux(&self, other: &Self) -> Result<bool, Error>;

    /// The least upper bound of this element and `other`.
    fn lub(&self, other: &Self) -> Result<Self, Error> {
        if self.is_bottom() || other.is_top() || self == other {
            Ok(other.clone())
        } else if other.is_bottom() || self.is_top() {
            Ok(self.clone())
        } else {
            self.lub_aux(other)
        }
    }

    /// Widening of this element with `other`, where `self` is the older
    /// iterate and `other` the newer one.
    fn widening(&self, other: &Self) -> Result<Self, Error> {
        if self.is_bottom() || other.is_top() || self == other {
            Ok(other.clone())
        } else if other.is_bottom() || self.is_top() {
            Ok(self.clone())
        } else {
            self.widening_aux(other)
        }
    }

    /// Returns true if this element is less than or equal to `other` in the
    /// approximation order.
    fn less_or_equal(&self, other: &Self) -> Result<bool, Error> {
        if self == other || self.is_bottom() || other.is_top() {
            Ok(true)
        } else if other.is_bottom() || self.is_top() {
            Ok(false)
        } else {
            self.less_or_equal_aux(other)
        }
    }
}

/// The ternary verdict of a satisfiability query over an abstract state.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Satisfiability {
    Satisfied,
    NotSatisfied,
    Unknown,
}

impl Satisfiability {
    pub fn from_bool(value: bool) -> Satisfiability {
        if value {
            Satisfiability::Satisfied
        } else {
            Satisfiability::NotSatisfied
        }
    }

    /// Conjunction of two verdicts.
    pub fn and(self, other: Satisfiability) -> Satisfiability {
        match (self, other) {
            (Satisfiability::NotSatisfied, _) | (_, Satisfiability::NotSatisfied) => {
                Satisfiability::NotSatisfied
            }
            (Satisfiability::Satisfied, Satisfiability::Satisfied) => Satisfiability::Satisfied,
            _ => Satisfiability::Unknown,
        }
    }

    /// Disjunction of two verdicts.
    pub fn or(self, other: Satisfiability) -> Satisfiability {
        match (self, other) {
            (Satisfiability::Satisfied, _) | (_, Satisfiability::Satisfied) => {
                Satisfiability::Satisfied
            }
            (Satisfiability::NotSatisfied, Satisfiability::NotSatisfied) => {
                Satisfiability::NotSatisfied
            }
            _ => Satisfiability::Unknown,
        }
    }

    /// Negation of a verdict.
    pub fn negate(self) -> Satisfiability {
        match self {
            Satisfiability::Satisfied => Satisfiability::NotSatisfied,
            Satisfiability::NotSatisfied => Satisfiability::Satisfied,
            Satisfiability::Unknown => Satisfiability::Unknown,
        }
    }

    /// The most precise verdict compatible with both operands: `Unknown`
    /// yields to the other verdict, conflicting exact verdicts fall back to
    /// `Unknown`.
    pub fn glb(self, other: Satisfiability) -> Satisfiability {
        match (self, other) {
            (Satisfiability::Unknown, other) => other,
            (this, Satisfiability::Unknown) => this,
            (this, other) if this == other => this,
            _ => Satisfiability::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A three-point lattice over unit: Bottom <= Mid <= Top.
    #[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
    enum Three {
        Top,
        Mid,
        Bottom,
    }

    impl Lattice for Three {
        fn top() -> Self {
            Three::Top
        }
        fn bottom() -> Self {
            Three::Bottom
        }
        fn is_top(&self) -> bool {
            *self == Three::Top
        }
        fn is_bottom(&self) -> bool {
            *self == Three::Bottom
        }
        fn lub_aux(&self, _: &Self) -> Result<Self, Error> {
            Ok(Three::Mid)
        }
        fn less_or_equal_aux(&self, _: &Self) -> Result<bool, Error> {
            Ok(true)
        }
    }

    #[test]
    fn sentinels_short_circuit() {
        assert_eq!(Three::Bottom.lub(&Three::Mid).unwrap(), Three::Mid);
        assert_eq!(Three::Mid.lub(&Three::Bottom).unwrap(), Three::Mid);
        assert_eq!(Three::Top.lub(&Three::Mid).unwrap(), Three::Top);
        assert_eq!(Three::Mid.lub(&Three::Mid).unwrap(), Three::Mid);

        assert!(Three::Bottom.less_or_equal(&Three::Mid).unwrap());
        assert!(Three::Mid.less_or_equal(&Three::Top).unwrap());
        assert!(!Three::Top.less_or_equal(&Three::Mid).unwrap());
        assert!(!Three::Mid.less_or_equal(&Three::Bottom).unwrap());
    }

    #[test]
    fn satisfiability_combinators() {
        use Satisfiability::*;
        assert_eq!(Satisfied.and(Unknown), Unknown);
        assert_eq!(NotSatisfied.and(Unknown), NotSatisfied);
        assert_eq!(Satisfied.or(Unknown), Satisfied);
        assert_eq!(NotSatisfied.or(NotSatisfied), NotSatisfied);
        assert_eq!(Unknown.negate(), Unknown);
        assert_eq!(Satisfied.negate(), NotSatisfied);
        assert_eq!(Unknown.glb(Satisfied), Satisfied);
        assert_eq!(Satisfied.glb(NotSatisfied), Unknown);
    }
}
