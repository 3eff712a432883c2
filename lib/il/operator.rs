//! Closed enumerations of the operators that may appear in expressions.
//!
//! Dispatching over these enums replaces the open-ended operator object
//! hierarchies found in other analysis frameworks: the set of operators is
//! fixed, comparison is plain equality, and there is no global state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unary operator.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum UnaryOp {
    /// Numeric negation
    Neg,
    /// Logical negation
    Not,
    /// Length of a string
    StrLen,
    /// Runtime type of a value
    TypeOf,
}

/// A binary operator.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    StrConcat,
    StrContains,
    StrStartsWith,
    StrEndsWith,
    StrIndexOf,
}

impl BinaryOp {
    /// Returns true if this operator is a comparison yielding a boolean.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// Returns the comparison operator whose truth value is the negation of
    /// this one, or `None` if this operator is not a comparison.
    pub fn negated(&self) -> Option<BinaryOp> {
        match self {
            BinaryOp::Eq => Some(BinaryOp::Ne),
            BinaryOp::Ne => Some(BinaryOp::Eq),
            BinaryOp::Lt => Some(BinaryOp::Ge),
            BinaryOp::Ge => Some(BinaryOp::Lt),
            BinaryOp::Gt => Some(BinaryOp::Le),
            BinaryOp::Le => Some(BinaryOp::Gt),
            _ => None,
        }
    }
}

/// A ternary operator.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum TernaryOp {
    /// Substring of a string between two indices
    StrSubstring,
    /// Replacement of a search string with another string
    StrReplace,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
            UnaryOp::StrLen => write!(f, "strlen"),
            UnaryOp::TypeOf => write!(f, "typeof"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Mod => write!(f, "%"),
            BinaryOp::Eq => write!(f, "=="),
            BinaryOp::Ne => write!(f, "!="),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Le => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Ge => write!(f, ">="),
            BinaryOp::And => write!(f, "&&"),
            BinaryOp::Or => write!(f, "||"),
            BinaryOp::StrConcat => write!(f, "++"),
            BinaryOp::StrContains => write!(f, "contains"),
            BinaryOp::StrStartsWith => write!(f, "startswith"),
            BinaryOp::StrEndsWith => write!(f, "endswith"),
            BinaryOp::StrIndexOf => write!(f, "indexof"),
        }
    }
}

impl fmt::Display for TernaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TernaryOp::StrSubstring => write!(f, "substring"),
            TernaryOp::StrReplace => write!(f, "replace"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_negation_pairs() {
        assert!(BinaryOp::Lt.is_comparison());
        assert!(!BinaryOp::And.is_comparison());
        assert_eq!(BinaryOp::Lt.negated(), Some(BinaryOp::Ge));
        assert_eq!(BinaryOp::Eq.negated(), Some(BinaryOp::Ne));
        assert_eq!(BinaryOp::StrConcat.negated(), None);
    }
}
