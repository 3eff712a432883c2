//! Heap abstractions.
//!
//! A heap domain owns the heap-level forms of expressions, `Alloc` and
//! `Field`. Before the value and type environments see an expression, the
//! heap domain rewrites those forms into synthetic `HeapLocation`
//! identifiers and reports the allocations the expression performed, so
//! that the layers above operate on a heap-free expression.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::{Lattice, Satisfiability};
use crate::il::{Expression, Identifier, Type};
use crate::Error;

/// The outcome of materializing one expression against a heap: the
/// rewritten, heap-free expression, plus the locations the expression
/// allocated along with their static types.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HeapSemantics {
    expression: Expression,
    allocations: Vec<(Identifier, Type)>,
}

impl HeapSemantics {
    pub fn new(expression: Expression, allocations: Vec<(Identifier, Type)>) -> HeapSemantics {
        HeapSemantics {
            expression,
            allocations,
        }
    }

    /// The rewritten expression, free of `Alloc` and `Field` forms.
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Locations allocated while materializing the expression.
    pub fn allocations(&self) -> &[(Identifier, Type)] {
        &self.allocations
    }
}

/// An abstraction of the program heap.
pub trait HeapDomain: Lattice {
    /// Applies the heap effects of `id := expr`, returning the new heap.
    fn assign(&self, id: &Identifier, expr: &Expression) -> Result<Self, Error>;

    /// Refines this heap under the assumption that `expr` holds.
    fn assume(&self, expr: &Expression) -> Result<Self, Error>;

    /// Decides whether `expr` holds on this heap.
    fn satisfies(&self, expr: &Expression) -> Satisfiability;

    /// Drops everything known about `id`.
    fn forget(&self, id: &Identifier) -> Self;

    /// Materializes `expr` against this heap: applies its heap effects and
    /// rewrites its heap-level forms into `HeapLocation` identifiers.
    fn small_step_semantics(&self, expr: &Expression) -> Result<(Self, HeapSemantics), Error>;
}

/// Name of the single summary location of the monolithic heap.
const SUMMARY_LOCATION: &str = "heap";

/// The coarsest heap: every allocation and every field access collapses
/// onto one summary location. Sound, fully imprecise, and free of state.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum MonolithicHeap {
    Heap,
    Bottom,
}

impl MonolithicHeap {
    fn summary_location() -> Identifier {
        Identifier::HeapLocation(SUMMARY_LOCATION.to_string())
    }

    fn rewrite(
        &self,
        expr: &Expression,
        allocations: &mut Vec<(Identifier, Type)>,
    ) -> Expression {
        match expr {
            Expression::Alloc(typ) => {
                allocations.push((MonolithicHeap::summary_location(), *typ));
                Expression::Identifier(MonolithicHeap::summary_location())
            }
            Expression::Field(base, _) => {
                // Field contents live on the summary location too; the base
                // is still rewritten for its allocation side effects.
                self.rewrite(base, allocations);
                Expression::Identifier(MonolithicHeap::summary_location())
            }
            Expression::Unary(op, arg) => {
                Expression::unary(*op, self.rewrite(arg, allocations))
            }
            Expression::Binary(op, lhs, rhs) => Expression::binary(
                *op,
                self.rewrite(lhs, allocations),
                self.rewrite(rhs, allocations),
            ),
            Expression::Ternary(op, a, b, c) => Expression::ternary(
                *op,
                self.rewrite(a, allocations),
                self.rewrite(b, allocations),
                self.rewrite(c, allocations),
            ),
            Expression::Identifier(_) | Expression::Constant(_) => expr.clone(),
        }
    }
}

impl Lattice for MonolithicHeap {
    fn top() -> Self {
        MonolithicHeap::Heap
    }

    fn bottom() -> Self {
        MonolithicHeap::Bottom
    }

    fn is_top(&self) -> bool {
        *self == MonolithicHeap::Heap
    }

    fn is_bottom(&self) -> bool {
        *self == MonolithicHeap::Bottom
    }

    fn lub_aux(&self, _other: &Self) -> Result<Self, Error> {
        Ok(MonolithicHeap::Heap)
    }

    fn less_or_equal_aux(&self, _other: &Self) -> Result<bool, Error> {
        Ok(true)
    }
}

impl HeapDomain for MonolithicHeap {
    fn assign(&self, _id: &Identifier, _expr: &Expression) -> Result<Self, Error> {
        Ok(*self)
    }

    fn assume(&self, _expr: &Expression) -> Result<Self, Error> {
        Ok(*self)
    }

    fn satisfies(&self, _expr: &Expression) -> Satisfiability {
        Satisfiability::Unknown
    }

    fn forget(&self, _id: &Identifier) -> Self {
        *self
    }

    fn small_step_semantics(&self, expr: &Expression) -> Result<(Self, HeapSemantics), Error> {
        let mut allocations = Vec::new();
        let rewritten = self.rewrite(expr, &mut allocations);
        Ok((*self, HeapSemantics::new(rewritten, allocations)))
    }
}

impl fmt::Display for MonolithicHeap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MonolithicHeap::Heap => write!(f, "monolith"),
            MonolithicHeap::Bottom => write!(f, "⊥"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{expr_var, BinaryOp, TypeRegistry};

    #[test]
    fn alloc_rewrites_to_the_summary_location() {
        let mut types = TypeRegistry::new();
        let unit = types.insert_unit("A", None);
        let heap = MonolithicHeap::Heap;
        let (heap, semantics) = heap
            .small_step_semantics(&Expression::alloc(Type::Unit(unit)))
            .unwrap();
        assert_eq!(heap, MonolithicHeap::Heap);
        assert_eq!(
            *semantics.expression(),
            Expression::Identifier(MonolithicHeap::summary_location())
        );
        assert_eq!(
            semantics.allocations(),
            &[(MonolithicHeap::summary_location(), Type::Unit(unit))]
        );
    }

    #[test]
    fn field_access_collapses_onto_the_summary_location() {
        let heap = MonolithicHeap::Heap;
        let access = Expression::binary(
            BinaryOp::Add,
            Expression::field(expr_var("p"), "x"),
            expr_var("y"),
        );
        let (_, semantics) = heap.small_step_semantics(&access).unwrap();
        assert_eq!(
            *semantics.expression(),
            Expression::binary(
                BinaryOp::Add,
                Expression::Identifier(MonolithicHeap::summary_location()),
                expr_var("y"),
            )
        );
        assert!(semantics.allocations().is_empty());
    }
}
