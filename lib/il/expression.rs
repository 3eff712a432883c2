use serde::{Deserialize, Serialize};
use std::fmt;

use crate::il::{BinaryOp, Constant, Identifier, TernaryOp, Type, UnaryOp};

/// An expression.
///
/// Expressions are pure: evaluating one never changes program state. The
/// `Alloc` and `Field` forms are heap-level expressions that a heap domain
/// must rewrite into `Identifier` forms before any value or type domain
/// evaluates them.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Expression {
    Identifier(Identifier),
    Constant(Constant),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Ternary(
        TernaryOp,
        Box<Expression>,
        Box<Expression>,
        Box<Expression>,
    ),
    /// Allocation of a fresh instance of a unit type.
    Alloc(Type),
    /// Access to a field of the value the receiver expression evaluates to.
    Field(Box<Expression>, String),
}

impl Expression {
    /// Create a new expression from an identifier.
    pub fn identifier(identifier: Identifier) -> Expression {
        Expression::Identifier(identifier)
    }

    /// Create a new expression from a constant.
    pub fn constant(constant: Constant) -> Expression {
        Expression::Constant(constant)
    }

    pub fn unary(op: UnaryOp, arg: Expression) -> Expression {
        Expression::Unary(op, Box::new(arg))
    }

    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Expression {
        Expression::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn ternary(op: TernaryOp, a: Expression, b: Expression, c: Expression) -> Expression {
        Expression::Ternary(op, Box::new(a), Box::new(b), Box::new(c))
    }

    pub fn alloc(typ: Type) -> Expression {
        Expression::Alloc(typ)
    }

    pub fn field(receiver: Expression, name: &str) -> Expression {
        Expression::Field(Box::new(receiver), name.to_string())
    }

    /// Returns true if this expression contains a heap-level subexpression
    /// that must be rewritten before value evaluation.
    pub fn has_heap_subexpression(&self) -> bool {
        match self {
            Expression::Identifier(_) | Expression::Constant(_) => false,
            Expression::Unary(_, arg) => arg.has_heap_subexpression(),
            Expression::Binary(_, lhs, rhs) => {
                lhs.has_heap_subexpression() || rhs.has_heap_subexpression()
            }
            Expression::Ternary(_, a, b, c) => {
                a.has_heap_subexpression()
                    || b.has_heap_subexpression()
                    || c.has_heap_subexpression()
            }
            Expression::Alloc(_) | Expression::Field(_, _) => true,
        }
    }

    /// The static type of this expression, derived structurally. Identifiers
    /// and field accesses are `Untyped` since the core carries no variable
    /// declarations.
    pub fn static_type(&self) -> Type {
        match self {
            Expression::Identifier(_) => Type::Untyped,
            Expression::Constant(constant) => constant.static_type(),
            Expression::Unary(op, _) => match op {
                UnaryOp::Neg | UnaryOp::StrLen => Type::Int,
                UnaryOp::Not => Type::Bool,
                UnaryOp::TypeOf => Type::Untyped,
            },
            Expression::Binary(op, _, _) => match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                    Type::Int
                }
                BinaryOp::StrConcat => Type::Str,
                BinaryOp::StrIndexOf => Type::Int,
                _ => Type::Bool,
            },
            Expression::Ternary(_, _, _, _) => Type::Str,
            Expression::Alloc(typ) => *typ,
            Expression::Field(_, _) => Type::Untyped,
        }
    }

    /// Returns all identifiers used in the expression.
    pub fn collect_identifiers(&self) -> Vec<&Identifier> {
        let mut identifiers: Vec<&Identifier> = Vec::new();
        match self {
            Expression::Identifier(identifier) => identifiers.push(identifier),
            Expression::Constant(_) | Expression::Alloc(_) => {}
            Expression::Unary(_, arg) => {
                identifiers.append(&mut arg.collect_identifiers());
            }
            Expression::Binary(_, lhs, rhs) => {
                identifiers.append(&mut lhs.collect_identifiers());
                identifiers.append(&mut rhs.collect_identifiers());
            }
            Expression::Ternary(_, a, b, c) => {
                identifiers.append(&mut a.collect_identifiers());
                identifiers.append(&mut b.collect_identifiers());
                identifiers.append(&mut c.collect_identifiers());
            }
            Expression::Field(receiver, _) => {
                identifiers.append(&mut receiver.collect_identifiers());
            }
        }
        identifiers
    }
}

impl From<Identifier> for Expression {
    fn from(identifier: Identifier) -> Expression {
        Expression::Identifier(identifier)
    }
}

impl From<Constant> for Expression {
    fn from(constant: Constant) -> Expression {
        Expression::Constant(constant)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expression::Identifier(identifier) => identifier.fmt(f),
            Expression::Constant(constant) => constant.fmt(f),
            Expression::Unary(op, arg) => write!(f, "{}({})", op, arg),
            Expression::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op, rhs),
            Expression::Ternary(op, a, b, c) => write!(f, "{}({}, {}, {})", op, a, b, c),
            Expression::Alloc(typ) => write!(f, "new {}", typ),
            Expression::Field(receiver, name) => write!(f, "{}.{}", receiver, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{expr_int, expr_var, var};

    #[test]
    fn static_types_derive_from_structure() {
        let sum = Expression::binary(BinaryOp::Add, expr_var("x"), expr_int(1));
        assert_eq!(sum.static_type(), Type::Int);
        let test = Expression::binary(BinaryOp::Lt, expr_var("x"), expr_int(1));
        assert_eq!(test.static_type(), Type::Bool);
        assert_eq!(expr_var("x").static_type(), Type::Untyped);
    }

    #[test]
    fn heap_subexpressions_are_detected() {
        let field = Expression::binary(
            BinaryOp::Add,
            Expression::field(expr_var("p"), "x"),
            expr_int(1),
        );
        assert!(field.has_heap_subexpression());
        assert!(!expr_var("p").has_heap_subexpression());
    }

    #[test]
    fn identifiers_are_collected_from_every_position() {
        let expr = Expression::binary(
            BinaryOp::Add,
            expr_var("x"),
            Expression::unary(UnaryOp::Neg, expr_var("y")),
        );
        let identifiers = expr.collect_identifiers();
        assert_eq!(identifiers, vec![&var("x"), &var("y")]);
        assert_eq!(identifiers[0].name(), "x");
    }
}
