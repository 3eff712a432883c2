use serde::{Deserialize, Serialize};
use std::fmt;

/// An identifier appearing on the left-hand side of an assignment or inside
/// an expression.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Identifier {
    /// A program variable.
    Variable(String),
    /// A synthetic variable introduced by the analysis, such as the result
    /// of a call or the value returned by a cfg.
    Meta(String),
    /// An abstract heap location materialized by a heap domain.
    HeapLocation(String),
}

impl Identifier {
    pub fn name(&self) -> &str {
        match self {
            Identifier::Variable(name)
            | Identifier::Meta(name)
            | Identifier::HeapLocation(name) => name,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Identifier::Variable(name) => write!(f, "{}", name),
            Identifier::Meta(name) => write!(f, "${}", name),
            Identifier::HeapLocation(name) => write!(f, "&{}", name),
        }
    }
}
