//! Kestrel Intermediate Language.
//!
//! A simple, expression-based representation of the programs under
//! analysis. Frontends for concrete source languages lower their ASTs into
//! this IL; the analysis core only ever sees IL.
//!
//! * `Constant` and `Identifier` are the terminals of expressions.
//! * `Expression` combines terminals through closed operator enumerations
//!   (`UnaryOp`, `BinaryOp`, `TernaryOp`), plus the heap-level forms
//!   `Alloc` and `Field`.
//! * `Statement` is the transfer function carried by one cfg node:
//!   assignments, calls, returns, nop.
//! * `ControlFlowGraph` is a directed graph of statement nodes; conditional
//!   edges carry the branch condition that must hold along them.
//! * `Program` owns every cfg plus the `TypeRegistry` of nominal unit
//!   types used for call resolution.

mod cfg;
mod constant;
mod expression;
mod identifier;
mod operator;
mod program;
mod statement;
mod types;

pub use self::cfg::{CfgDescriptor, ControlFlowGraph, Edge, Node, Parameter};
pub use self::constant::Constant;
pub use self::expression::Expression;
pub use self::identifier::Identifier;
pub use self::operator::{BinaryOp, TernaryOp, UnaryOp};
pub use self::program::{CfgId, Program};
pub use self::statement::{Call, Receiver, Statement};
pub use self::types::{Type, TypeId, TypeRegistry, UnitType};

/// Create a program variable identifier.
pub fn var(name: &str) -> Identifier {
    Identifier::Variable(name.to_string())
}

/// Create an expression over a program variable.
pub fn expr_var(name: &str) -> Expression {
    Expression::identifier(var(name))
}

/// Create an integer constant.
pub fn const_int(value: i64) -> Constant {
    Constant::Int(value)
}

/// Create an expression over an integer constant.
pub fn expr_int(value: i64) -> Expression {
    Expression::constant(const_int(value))
}

/// Create an expression over a string constant.
pub fn expr_str(value: &str) -> Expression {
    Expression::constant(Constant::Str(value.to_string()))
}

/// Create an expression over a boolean constant.
pub fn expr_bool(value: bool) -> Expression {
    Expression::constant(Constant::Bool(value))
}
