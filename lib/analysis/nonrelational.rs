//! Builds an environment-wide abstract domain out of a per-identifier
//! lattice value.
//!
//! A `NonRelationalDomain` abstracts one identifier in isolation; an
//! `Environment` lifts it to a whole identifier-to-value mapping with
//! assignment, branch filtering and satisfiability queries. Expression
//! evaluation recursively folds identifier lookups, constant evaluation
//! and the domain's operator hooks; a bottom operand short-circuits to
//! bottom, and the default operator hooks return top.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::{Lattice, Satisfiability};
use crate::il::{BinaryOp, Constant, Expression, Identifier, TernaryOp, UnaryOp};
use crate::Error;

/// A lattice value abstracting a single identifier, together with the
/// operator hooks driving expression evaluation.
///
/// Every hook receives operands that are never bottom; the environment
/// short-circuits bottom operands before dispatching. Top operands are
/// passed through so that a domain may recover precision from them (the
/// constant-propagation division rule does), but the default hooks answer
/// top.
pub trait NonRelationalDomain: Lattice {
    /// Abstracts a constant.
    fn eval_constant(constant: &Constant) -> Self;

    fn eval_unary(_op: UnaryOp, _arg: &Self) -> Result<Self, Error> {
        Ok(Self::top())
    }

    fn eval_binary(_op: BinaryOp, _lhs: &Self, _rhs: &Self) -> Result<Self, Error> {
        Ok(Self::top())
    }

    fn eval_ternary(_op: TernaryOp, _a: &Self, _b: &Self, _c: &Self) -> Result<Self, Error> {
        Ok(Self::top())
    }

    /// Decides a binary predicate over two abstract operands.
    fn satisfies_binary(_op: BinaryOp, _lhs: &Self, _rhs: &Self) -> Satisfiability {
        Satisfiability::Unknown
    }

    /// Domain-specific refinement applied when assuming a binary predicate
    /// the environment could not decide structurally. The default keeps the
    /// environment unchanged.
    fn assume_binary(
        environment: Environment<Self>,
        _op: BinaryOp,
        _lhs: &Expression,
        _rhs: &Expression,
    ) -> Result<Environment<Self>, Error> {
        Ok(environment)
    }
}

/// An immutable mapping from identifiers to abstract values.
///
/// Unbound identifiers are implicitly top; bindings that become top are
/// dropped, so the empty environment is the top element. Every mutation
/// returns a new environment, leaving snapshots held by earlier fixpoint
/// iterations untouched.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Environment<N: NonRelationalDomain> {
    bindings: FxHashMap<Identifier, N>,
    bottom: bool,
}

impl<N: NonRelationalDomain> Default for Environment<N> {
    fn default() -> Environment<N> {
        Environment::top()
    }
}

impl<N: NonRelationalDomain> Environment<N> {
    /// The abstract value bound to `id`, top if unbound.
    pub fn value_of(&self, id: &Identifier) -> N {
        if self.bottom {
            return N::bottom();
        }
        self.bindings.get(id).cloned().unwrap_or_else(N::top)
    }

    /// All identifiers with a non-top binding.
    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.bindings.keys()
    }

    /// The explicit binding for `id`, if one exists. Unlike `value_of` this
    /// distinguishes an unbound identifier from one bound to top.
    pub fn binding(&self, id: &Identifier) -> Option<&N> {
        self.bindings.get(id)
    }

    /// Evaluates `expr` over the current bindings.
    ///
    /// Heap-level expressions must have been rewritten away by a heap
    /// domain before evaluation; encountering one is a semantic error.
    pub fn eval(&self, expr: &Expression) -> Result<N, Error> {
        if self.bottom {
            return Ok(N::bottom());
        }
        match expr {
            Expression::Identifier(id) => Ok(self.value_of(id)),
            Expression::Constant(constant) => Ok(N::eval_constant(constant)),
            Expression::Unary(op, arg) => {
                let arg = self.eval(arg)?;
                if arg.is_bottom() {
                    return Ok(N::bottom());
                }
                N::eval_unary(*op, &arg)
            }
            Expression::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                if lhs.is_bottom() || rhs.is_bottom() {
                    return Ok(N::bottom());
                }
                N::eval_binary(*op, &lhs, &rhs)
            }
            Expression::Ternary(op, a, b, c) => {
                let a = self.eval(a)?;
                let b = self.eval(b)?;
                let c = self.eval(c)?;
                if a.is_bottom() || b.is_bottom() || c.is_bottom() {
                    return Ok(N::bottom());
                }
                N::eval_ternary(*op, &a, &b, &c)
            }
            Expression::Alloc(_) | Expression::Field(_, _) => Err(Error::Semantic(format!(
                "heap expression {} reached value evaluation",
                expr
            ))),
        }
    }

    /// Evaluates `expr` and binds the result to `id`, returning the new
    /// environment. Assigning a bottom value makes the whole environment
    /// bottom.
    pub fn assign(&self, id: &Identifier, expr: &Expression) -> Result<Environment<N>, Error> {
        if self.bottom {
            return Ok(self.clone());
        }
        let value = self.eval(expr)?;
        Ok(self.with_binding(id.clone(), value))
    }

    /// Binds `id` directly to `value`, returning the new environment.
    pub fn with_binding(&self, id: Identifier, value: N) -> Environment<N> {
        if self.bottom {
            return self.clone();
        }
        if value.is_bottom() {
            return Environment::bottom();
        }
        let mut bindings = self.bindings.clone();
        if value.is_top() {
            bindings.remove(&id);
        } else {
            bindings.insert(id, value);
        }
        Environment {
            bindings,
            bottom: false,
        }
    }

    /// Resets `id` to top, returning the new environment.
    pub fn forget(&self, id: &Identifier) -> Environment<N> {
        let mut bindings = self.bindings.clone();
        bindings.remove(id);
        Environment {
            bindings,
            bottom: self.bottom,
        }
    }

    /// Decides whether `expr` holds under this environment.
    pub fn satisfies(&self, expr: &Expression) -> Result<Satisfiability, Error> {
        if self.bottom {
            // Everything holds on an unreachable state.
            return Ok(Satisfiability::Satisfied);
        }
        match expr {
            Expression::Constant(Constant::Bool(value)) => Ok(Satisfiability::from_bool(*value)),
            Expression::Unary(UnaryOp::Not, inner) => Ok(self.satisfies(inner)?.negate()),
            Expression::Binary(BinaryOp::And, lhs, rhs) => {
                Ok(self.satisfies(lhs)?.and(self.satisfies(rhs)?))
            }
            Expression::Binary(BinaryOp::Or, lhs, rhs) => {
                Ok(self.satisfies(lhs)?.or(self.satisfies(rhs)?))
            }
            Expression::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                if lhs.is_bottom() || rhs.is_bottom() {
                    return Ok(Satisfiability::Unknown);
                }
                Ok(N::satisfies_binary(*op, &lhs, &rhs))
            }
            _ => Ok(Satisfiability::Unknown),
        }
    }

    /// Refines this environment by filtering out states inconsistent with
    /// `expr` holding, returning the new environment.
    pub fn assume(&self, expr: &Expression) -> Result<Environment<N>, Error> {
        if self.bottom {
            return Ok(self.clone());
        }
        match self.satisfies(expr)? {
            Satisfiability::NotSatisfied => return Ok(Environment::bottom()),
            Satisfiability::Satisfied => return Ok(self.clone()),
            Satisfiability::Unknown => {}
        }
        match expr {
            Expression::Unary(UnaryOp::Not, inner) => self.assume_negation(inner),
            Expression::Binary(BinaryOp::And, lhs, rhs) => self.assume(lhs)?.assume(rhs),
            Expression::Binary(BinaryOp::Or, lhs, rhs) => {
                self.assume(lhs)?.lub(&self.assume(rhs)?)
            }
            Expression::Binary(BinaryOp::Eq, lhs, rhs) => {
                // A relational equality reassigns the identifier side to the
                // other side's abstraction.
                if let Expression::Identifier(id) = &**lhs {
                    self.assign(id, rhs)
                } else if let Expression::Identifier(id) = &**rhs {
                    self.assign(id, lhs)
                } else {
                    N::assume_binary(self.clone(), BinaryOp::Eq, lhs, rhs)
                }
            }
            Expression::Binary(op, lhs, rhs) => N::assume_binary(self.clone(), *op, lhs, rhs),
            _ => Ok(self.clone()),
        }
    }

    /// Assumes the negation of `expr` by pushing the negation inward.
    fn assume_negation(&self, expr: &Expression) -> Result<Environment<N>, Error> {
        match expr {
            Expression::Unary(UnaryOp::Not, inner) => self.assume(inner),
            Expression::Binary(op, lhs, rhs) => {
                if let Some(negated) = op.negated() {
                    self.assume(&Expression::binary(
                        negated,
                        (**lhs).clone(),
                        (**rhs).clone(),
                    ))
                } else {
                    match op {
                        // De Morgan
                        BinaryOp::And => self
                            .assume_negation(lhs)?
                            .lub(&self.assume_negation(rhs)?),
                        BinaryOp::Or => self.assume_negation(lhs)?.assume(&Expression::unary(
                            UnaryOp::Not,
                            (**rhs).clone(),
                        )),
                        _ => Ok(self.clone()),
                    }
                }
            }
            _ => Ok(self.clone()),
        }
    }
}

impl<N: NonRelationalDomain> Lattice for Environment<N> {
    fn top() -> Self {
        Environment {
            bindings: FxHashMap::default(),
            bottom: false,
        }
    }

    fn bottom() -> Self {
        Environment {
            bindings: FxHashMap::default(),
            bottom: true,
        }
    }

    fn is_top(&self) -> bool {
        !self.bottom && self.bindings.is_empty()
    }

    fn is_bottom(&self) -> bool {
        self.bottom
    }

    fn lub_aux(&self, other: &Self) -> Result<Self, Error> {
        let mut bindings = FxHashMap::default();
        for (id, value) in &self.bindings {
            if let Some(other_value) = other.bindings.get(id) {
                let lub = value.lub(other_value)?;
                if !lub.is_top() {
                    bindings.insert(id.clone(), lub);
                }
            }
        }
        Ok(Environment {
            bindings,
            bottom: false,
        })
    }

    fn widening_aux(&self, other: &Self) -> Result<Self, Error> {
        let mut bindings = FxHashMap::default();
        for (id, value) in &self.bindings {
            if let Some(other_value) = other.bindings.get(id) {
                let widened = value.widening(other_value)?;
                if !widened.is_top() {
                    bindings.insert(id.clone(), widened);
                }
            }
        }
        Ok(Environment {
            bindings,
            bottom: false,
        })
    }

    fn less_or_equal_aux(&self, other: &Self) -> Result<bool, Error> {
        for (id, other_value) in &other.bindings {
            let this_value = self.value_of(id);
            if !this_value.less_or_equal(other_value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
