//! Runtime type inference.
//!
//! `InferredTypes` tracks the set of types an expression may carry at
//! runtime. The interprocedural layer consumes the inferred receiver types
//! to resolve dynamically dispatched calls.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::analysis::{Lattice, NonRelationalDomain};
use crate::il::{BinaryOp, Constant, TernaryOp, Type, UnaryOp};
use crate::Error;

/// A non-relational domain that additionally understands the program's
/// types: it can abstract a static type directly and can report the
/// runtime types an abstract value may have.
pub trait TypeDomain: NonRelationalDomain {
    /// The abstraction of a value statically typed `typ`.
    fn from_type(typ: Type) -> Self;

    /// The set of runtime types this value may have, or `None` when the
    /// value is unconstrained.
    fn runtime_types(&self) -> Option<&BTreeSet<Type>>;
}

/// The set of types an expression may evaluate to at runtime.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum InferredTypes {
    Top,
    Types(BTreeSet<Type>),
    Bottom,
}

impl InferredTypes {
    pub fn singleton(typ: Type) -> InferredTypes {
        let mut types = BTreeSet::new();
        types.insert(typ);
        InferredTypes::Types(types)
    }

    pub fn types(&self) -> Option<&BTreeSet<Type>> {
        match self {
            InferredTypes::Types(types) => Some(types),
            _ => None,
        }
    }
}

impl Lattice for InferredTypes {
    fn top() -> Self {
        InferredTypes::Top
    }

    fn bottom() -> Self {
        InferredTypes::Bottom
    }

    fn is_top(&self) -> bool {
        *self == InferredTypes::Top
    }

    fn is_bottom(&self) -> bool {
        *self == InferredTypes::Bottom
    }

    fn lub_aux(&self, other: &Self) -> Result<Self, Error> {
        match (self, other) {
            (InferredTypes::Types(lhs), InferredTypes::Types(rhs)) => {
                Ok(InferredTypes::Types(lhs.union(rhs).cloned().collect()))
            }
            _ => Ok(InferredTypes::Top),
        }
    }

    fn less_or_equal_aux(&self, other: &Self) -> Result<bool, Error> {
        match (self, other) {
            (InferredTypes::Types(lhs), InferredTypes::Types(rhs)) => Ok(lhs.is_subset(rhs)),
            _ => Ok(false),
        }
    }
}

impl NonRelationalDomain for InferredTypes {
    fn eval_constant(constant: &Constant) -> Self {
        match constant {
            Constant::Int(_) => InferredTypes::singleton(Type::Int),
            Constant::Bool(_) => InferredTypes::singleton(Type::Bool),
            Constant::Str(_) => InferredTypes::singleton(Type::Str),
            Constant::Null => InferredTypes::Top,
        }
    }

    fn eval_unary(op: UnaryOp, _arg: &Self) -> Result<Self, Error> {
        Ok(match op {
            UnaryOp::Neg => InferredTypes::singleton(Type::Int),
            UnaryOp::Not => InferredTypes::singleton(Type::Bool),
            UnaryOp::StrLen => InferredTypes::singleton(Type::Int),
            UnaryOp::TypeOf => InferredTypes::singleton(Type::Str),
        })
    }

    fn eval_binary(op: BinaryOp, _lhs: &Self, _rhs: &Self) -> Result<Self, Error> {
        use BinaryOp::*;
        Ok(match op {
            Add | Sub | Mul | Div | Mod | StrIndexOf => InferredTypes::singleton(Type::Int),
            Eq | Ne | Lt | Le | Gt | Ge | And | Or | StrContains | StrStartsWith
            | StrEndsWith => InferredTypes::singleton(Type::Bool),
            StrConcat => InferredTypes::singleton(Type::Str),
        })
    }

    fn eval_ternary(op: TernaryOp, _a: &Self, _b: &Self, _c: &Self) -> Result<Self, Error> {
        Ok(match op {
            TernaryOp::StrSubstring | TernaryOp::StrReplace => {
                InferredTypes::singleton(Type::Str)
            }
        })
    }
}

impl TypeDomain for InferredTypes {
    fn from_type(typ: Type) -> Self {
        match typ {
            Type::Untyped => InferredTypes::Top,
            typ => InferredTypes::singleton(typ),
        }
    }

    fn runtime_types(&self) -> Option<&BTreeSet<Type>> {
        self.types()
    }
}

impl fmt::Display for InferredTypes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InferredTypes::Top => write!(f, "⊤"),
            InferredTypes::Types(types) => {
                write!(f, "{{")?;
                for (i, typ) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", typ)?;
                }
                write!(f, "}}")
            }
            InferredTypes::Bottom => write!(f, "⊥"),
        }
    }
}
