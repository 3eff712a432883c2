//! Constant propagation over machine integers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::{Lattice, NonRelationalDomain, Satisfiability};
use crate::il::{BinaryOp, Constant, UnaryOp};
use crate::Error;

/// The flat constant lattice: an integer is either unknown, exactly one
/// value, or unreachable. Every arithmetic hook is exact on two constants;
/// overflow loses the constant rather than wrapping.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ConstantPropagation {
    Top,
    Constant(i64),
    Bottom,
}

impl ConstantPropagation {
    /// The exact integer tracked, if any.
    pub fn value(&self) -> Option<i64> {
        match self {
            ConstantPropagation::Constant(value) => Some(*value),
            _ => None,
        }
    }

    fn of(value: Option<i64>) -> ConstantPropagation {
        match value {
            Some(value) => ConstantPropagation::Constant(value),
            None => ConstantPropagation::Top,
        }
    }
}

impl Lattice for ConstantPropagation {
    fn top() -> Self {
        ConstantPropagation::Top
    }

    fn bottom() -> Self {
        ConstantPropagation::Bottom
    }

    fn is_top(&self) -> bool {
        *self == ConstantPropagation::Top
    }

    fn is_bottom(&self) -> bool {
        *self == ConstantPropagation::Bottom
    }

    fn lub_aux(&self, _other: &Self) -> Result<Self, Error> {
        // Two distinct constants.
        Ok(ConstantPropagation::Top)
    }

    fn less_or_equal_aux(&self, _other: &Self) -> Result<bool, Error> {
        // Distinct constants are incomparable.
        Ok(false)
    }
}

impl NonRelationalDomain for ConstantPropagation {
    fn eval_constant(constant: &Constant) -> Self {
        match constant {
            Constant::Int(value) => ConstantPropagation::Constant(*value),
            _ => ConstantPropagation::Top,
        }
    }

    fn eval_unary(op: UnaryOp, arg: &Self) -> Result<Self, Error> {
        match (op, arg) {
            (UnaryOp::Neg, ConstantPropagation::Constant(value)) => {
                Ok(ConstantPropagation::of(value.checked_neg()))
            }
            _ => Ok(ConstantPropagation::Top),
        }
    }

    fn eval_binary(op: BinaryOp, lhs: &Self, rhs: &Self) -> Result<Self, Error> {
        use ConstantPropagation::*;
        Ok(match op {
            BinaryOp::Add => match (lhs, rhs) {
                (Constant(l), Constant(r)) => ConstantPropagation::of(l.checked_add(*r)),
                _ => Top,
            },
            BinaryOp::Sub => match (lhs, rhs) {
                (Constant(l), Constant(r)) => ConstantPropagation::of(l.checked_sub(*r)),
                _ => Top,
            },
            BinaryOp::Mul => match (lhs, rhs) {
                (Constant(l), Constant(r)) => ConstantPropagation::of(l.checked_mul(*r)),
                _ => Top,
            },
            BinaryOp::Div => {
                // A zero dividend is exactly zero no matter the divisor, and
                // a zero divisor has no concretization at all; these two
                // rules fire even when the other operand is unknown.
                if *lhs == Constant(0) {
                    Constant(0)
                } else if *rhs == Constant(0) {
                    Bottom
                } else if let (Constant(l), Constant(r)) = (lhs, rhs) {
                    match l.checked_rem(*r) {
                        Some(0) => ConstantPropagation::of(l.checked_div(*r)),
                        _ => Top,
                    }
                } else {
                    Top
                }
            }
            BinaryOp::Mod => {
                if *rhs == Constant(0) {
                    Bottom
                } else if let (Constant(l), Constant(r)) = (lhs, rhs) {
                    ConstantPropagation::of(l.checked_rem(*r))
                } else {
                    Top
                }
            }
            _ => Top,
        })
    }

    fn satisfies_binary(op: BinaryOp, lhs: &Self, rhs: &Self) -> Satisfiability {
        let (lhs, rhs) = match (lhs.value(), rhs.value()) {
            (Some(lhs), Some(rhs)) => (lhs, rhs),
            _ => return Satisfiability::Unknown,
        };
        match op {
            BinaryOp::Eq => Satisfiability::from_bool(lhs == rhs),
            BinaryOp::Ne => Satisfiability::from_bool(lhs != rhs),
            BinaryOp::Lt => Satisfiability::from_bool(lhs < rhs),
            BinaryOp::Le => Satisfiability::from_bool(lhs <= rhs),
            BinaryOp::Gt => Satisfiability::from_bool(lhs > rhs),
            BinaryOp::Ge => Satisfiability::from_bool(lhs >= rhs),
            _ => Satisfiability::Unknown,
        }
    }
}

impl fmt::Display for ConstantPropagation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConstantPropagation::Top => write!(f, "⊤"),
            ConstantPropagation::Constant(value) => write!(f, "{}", value),
            ConstantPropagation::Bottom => write!(f, "⊥"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConstantPropagation::{self, Bottom, Constant, Top};
    use crate::analysis::{Environment, Lattice, NonRelationalDomain, Satisfiability};
    use crate::il::{expr_bool, expr_int, expr_var, var, BinaryOp, Expression, UnaryOp};

    fn env() -> Environment<ConstantPropagation> {
        Environment::top()
    }

    #[test]
    fn arithmetic_is_exact_on_constants() {
        assert_eq!(
            ConstantPropagation::eval_binary(BinaryOp::Add, &Constant(2), &Constant(3)).unwrap(),
            Constant(5)
        );
        assert_eq!(
            ConstantPropagation::eval_binary(BinaryOp::Mul, &Constant(-4), &Constant(3)).unwrap(),
            Constant(-12)
        );
        assert_eq!(
            ConstantPropagation::eval_unary(UnaryOp::Neg, &Constant(7)).unwrap(),
            Constant(-7)
        );
        assert_eq!(
            ConstantPropagation::eval_binary(BinaryOp::Add, &Top, &Constant(5)).unwrap(),
            Top
        );
        assert_eq!(
            ConstantPropagation::satisfies_binary(BinaryOp::Lt, &Constant(3), &Constant(5)),
            Satisfiability::Satisfied
        );
        assert_eq!(
            ConstantPropagation::satisfies_binary(BinaryOp::Lt, &Top, &Constant(5)),
            Satisfiability::Unknown
        );
    }

    #[test]
    fn overflow_goes_to_top() {
        assert_eq!(
            ConstantPropagation::eval_binary(BinaryOp::Add, &Constant(i64::MAX), &Constant(1))
                .unwrap(),
            Top
        );
        assert_eq!(
            ConstantPropagation::eval_unary(UnaryOp::Neg, &Constant(i64::MIN)).unwrap(),
            Top
        );
    }

    #[test]
    fn division_rules() {
        // 0 / anything is exactly 0, even an unknown divisor.
        assert_eq!(
            ConstantPropagation::eval_binary(BinaryOp::Div, &Constant(0), &Top).unwrap(),
            Constant(0)
        );
        // Division by exact zero is unreachable.
        assert_eq!(
            ConstantPropagation::eval_binary(BinaryOp::Div, &Constant(5), &Constant(0)).unwrap(),
            Bottom
        );
        assert_eq!(
            ConstantPropagation::eval_binary(BinaryOp::Div, &Top, &Constant(0)).unwrap(),
            Bottom
        );
        // Non-dividing constants lose the value.
        assert_eq!(
            ConstantPropagation::eval_binary(BinaryOp::Div, &Constant(7), &Constant(2)).unwrap(),
            Top
        );
        assert_eq!(
            ConstantPropagation::eval_binary(BinaryOp::Div, &Constant(6), &Constant(2)).unwrap(),
            Constant(3)
        );
        assert_eq!(
            ConstantPropagation::eval_binary(BinaryOp::Mod, &Constant(7), &Constant(0)).unwrap(),
            Bottom
        );
        // The one quotient that overflows loses the value instead of
        // wrapping or panicking.
        assert_eq!(
            ConstantPropagation::eval_binary(BinaryOp::Div, &Constant(i64::MIN), &Constant(-1))
                .unwrap(),
            Top
        );
        assert_eq!(
            ConstantPropagation::eval_binary(BinaryOp::Mod, &Constant(i64::MIN), &Constant(-1))
                .unwrap(),
            Top
        );
    }

    #[test]
    fn environment_assign_and_eval() {
        let env = env().assign(&var("x"), &expr_int(4)).unwrap();
        let env = env
            .assign(
                &var("y"),
                &Expression::binary(BinaryOp::Add, expr_var("x"), expr_int(1)),
            )
            .unwrap();
        assert_eq!(env.value_of(&var("y")), Constant(5));
        assert_eq!(env.value_of(&var("unbound")), Top);
    }

    #[test]
    fn environment_lub_drops_disagreeing_bindings() {
        let left = env().assign(&var("x"), &expr_int(1)).unwrap();
        let left = left.assign(&var("y"), &expr_int(9)).unwrap();
        let right = env().assign(&var("x"), &expr_int(2)).unwrap();
        let right = right.assign(&var("y"), &expr_int(9)).unwrap();

        let joined = left.lub(&right).unwrap();
        assert_eq!(joined.value_of(&var("x")), Top);
        assert_eq!(joined.value_of(&var("y")), Constant(9));
    }

    #[test]
    fn environment_ordering() {
        let precise = env().assign(&var("x"), &expr_int(1)).unwrap();
        let coarse = Environment::<ConstantPropagation>::top();
        assert!(precise.less_or_equal(&coarse).unwrap());
        assert!(!coarse.less_or_equal(&precise).unwrap());
        assert!(Environment::<ConstantPropagation>::bottom()
            .less_or_equal(&precise)
            .unwrap());
    }

    #[test]
    fn assume_filters_branches() {
        let env = env().assign(&var("x"), &expr_int(3)).unwrap();

        // x < 2 cannot hold.
        let dead = env
            .assume(&Expression::binary(BinaryOp::Lt, expr_var("x"), expr_int(2)))
            .unwrap();
        assert!(dead.is_bottom());

        // x == y reassigns y.
        let refined = env
            .assume(&Expression::binary(
                BinaryOp::Eq,
                expr_var("y"),
                expr_var("x"),
            ))
            .unwrap();
        assert_eq!(refined.value_of(&var("y")), Constant(3));

        // A literally false guard kills the branch.
        assert!(env.assume(&expr_bool(false)).unwrap().is_bottom());
    }

    #[test]
    fn assume_negated_comparison() {
        let env = env().assign(&var("x"), &expr_int(3)).unwrap();
        // !(x != 3) holds, the state survives.
        let alive = env
            .assume(&Expression::unary(
                UnaryOp::Not,
                Expression::binary(BinaryOp::Ne, expr_var("x"), expr_int(3)),
            ))
            .unwrap();
        assert!(!alive.is_bottom());
        // !(x == 3) cannot hold.
        let dead = env
            .assume(&Expression::unary(
                UnaryOp::Not,
                Expression::binary(BinaryOp::Eq, expr_var("x"), expr_int(3)),
            ))
            .unwrap();
        assert!(dead.is_bottom());
    }

    #[test]
    fn eval_of_bottom_operand_short_circuits() {
        let env = env().assign(&var("x"), &expr_int(1)).unwrap();
        let division_by_zero = Expression::binary(BinaryOp::Div, expr_var("x"), expr_int(0));
        assert_eq!(env.eval(&division_by_zero).unwrap(), Bottom);
        // Assigning the unreachable value makes the state unreachable.
        let after = env.assign(&var("y"), &division_by_zero).unwrap();
        assert!(after.is_bottom());
    }
}
