use crate::il::Type;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A constant value.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Constant {
    Int(i64),
    Bool(bool),
    Str(String),
    Null,
}

impl Constant {
    /// The static type of this constant. `Null` is untyped.
    pub fn static_type(&self) -> Type {
        match self {
            Constant::Int(_) => Type::Int,
            Constant::Bool(_) => Type::Bool,
            Constant::Str(_) => Type::Str,
            Constant::Null => Type::Untyped,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Str(s) => write!(f, "{:?}", s),
            Constant::Null => write!(f, "null"),
        }
    }
}
