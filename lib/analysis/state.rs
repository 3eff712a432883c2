//! The analysis state: a heap abstraction composed with a value and a
//! type environment.
//!
//! Statement semantics flow through the layers in a fixed order. The heap
//! domain materializes each expression, rewriting `Alloc` and `Field`
//! forms into `HeapLocation` identifiers; freshly allocated locations are
//! bound in the type environment with the abstraction of their static
//! type; the rewritten, heap-free expression then drives the value and
//! type environments.

use serde::{Deserialize, Serialize};

use crate::analysis::{
    Environment, HeapDomain, Lattice, NonRelationalDomain, Satisfiability, TypeDomain,
};
use crate::il::{Expression, Identifier};
use crate::Error;

/// The full abstract state at one program point.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AbstractState<H, V, T>
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
{
    heap: H,
    value: Environment<V>,
    types: Environment<T>,
}

impl<H, V, T> AbstractState<H, V, T>
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
{
    pub fn new(heap: H, value: Environment<V>, types: Environment<T>) -> AbstractState<H, V, T> {
        AbstractState { heap, value, types }
    }

    pub fn heap(&self) -> &H {
        &self.heap
    }

    pub fn value(&self) -> &Environment<V> {
        &self.value
    }

    pub fn types(&self) -> &Environment<T> {
        &self.types
    }

    /// Materializes `expr` against the heap and binds any allocated
    /// location's type. An already-bound summary location is weakly
    /// updated.
    fn materialize(&self, expr: &Expression) -> Result<(Self, Expression), Error> {
        if !expr.has_heap_subexpression() {
            return Ok((self.clone(), expr.clone()));
        }
        let (heap, semantics) = self.heap.small_step_semantics(expr)?;
        let mut types = self.types.clone();
        for (location, typ) in semantics.allocations() {
            let fresh = T::from_type(*typ);
            let bound = match types.binding(location) {
                Some(existing) => existing.lub(&fresh)?,
                None => fresh,
            };
            types = types.with_binding(location.clone(), bound);
        }
        Ok((
            AbstractState {
                heap,
                value: self.value.clone(),
                types,
            },
            semantics.expression().clone(),
        ))
    }

    /// Applies `id := expr`, returning the post state.
    pub fn assign(&self, id: &Identifier, expr: &Expression) -> Result<Self, Error> {
        if self.is_bottom() {
            return Ok(self.clone());
        }
        let (state, rewritten) = self.materialize(expr)?;
        let heap = state.heap.assign(id, expr)?;
        let value = state.value.assign(id, &rewritten)?;
        let types = state.types.assign(id, &rewritten)?;
        Ok(AbstractState { heap, value, types })
    }

    /// Binds `id` directly to the given abstract values.
    pub fn with_binding(&self, id: Identifier, value: V, types: T) -> Self {
        AbstractState {
            heap: self.heap.clone(),
            value: self.value.with_binding(id.clone(), value),
            types: self.types.with_binding(id, types),
        }
    }

    /// Refines this state under the assumption that `expr` holds.
    pub fn assume(&self, expr: &Expression) -> Result<Self, Error> {
        if self.is_bottom() {
            return Ok(self.clone());
        }
        let (state, rewritten) = self.materialize(expr)?;
        let heap = state.heap.assume(expr)?;
        let value = state.value.assume(&rewritten)?;
        let types = state.types.assume(&rewritten)?;
        Ok(AbstractState { heap, value, types })
    }

    /// Decides whether `expr` holds on this state, combining the verdicts
    /// of every layer.
    pub fn satisfies(&self, expr: &Expression) -> Result<Satisfiability, Error> {
        if self.is_bottom() {
            return Ok(Satisfiability::Satisfied);
        }
        let (state, rewritten) = self.materialize(expr)?;
        let verdict = self.heap.satisfies(expr);
        let verdict = verdict.glb(state.value.satisfies(&rewritten)?);
        Ok(verdict.glb(state.types.satisfies(&rewritten)?))
    }

    /// Evaluates the value abstraction of `expr`.
    pub fn eval_value(&self, expr: &Expression) -> Result<V, Error> {
        let (state, rewritten) = self.materialize(expr)?;
        state.value.eval(&rewritten)
    }

    /// Evaluates the type abstraction of `expr`.
    pub fn eval_types(&self, expr: &Expression) -> Result<T, Error> {
        let (state, rewritten) = self.materialize(expr)?;
        state.types.eval(&rewritten)
    }

    /// Drops everything known about `id` in every layer.
    pub fn forget(&self, id: &Identifier) -> Self {
        AbstractState {
            heap: self.heap.forget(id),
            value: self.value.forget(id),
            types: self.types.forget(id),
        }
    }
}

impl<H, V, T> Lattice for AbstractState<H, V, T>
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
{
    fn top() -> Self {
        AbstractState {
            heap: H::top(),
            value: Environment::top(),
            types: Environment::top(),
        }
    }

    fn bottom() -> Self {
        AbstractState {
            heap: H::bottom(),
            value: Environment::bottom(),
            types: Environment::bottom(),
        }
    }

    fn is_top(&self) -> bool {
        self.heap.is_top() && self.value.is_top() && self.types.is_top()
    }

    // A single unreachable layer makes the whole state unreachable.
    fn is_bottom(&self) -> bool {
        self.heap.is_bottom() || self.value.is_bottom() || self.types.is_bottom()
    }

    fn lub_aux(&self, other: &Self) -> Result<Self, Error> {
        Ok(AbstractState {
            heap: self.heap.lub(&other.heap)?,
            value: self.value.lub(&other.value)?,
            types: self.types.lub(&other.types)?,
        })
    }

    fn widening_aux(&self, other: &Self) -> Result<Self, Error> {
        Ok(AbstractState {
            heap: self.heap.widening(&other.heap)?,
            value: self.value.widening(&other.value)?,
            types: self.types.widening(&other.types)?,
        })
    }

    fn less_or_equal_aux(&self, other: &Self) -> Result<bool, Error> {
        Ok(self.heap.less_or_equal(&other.heap)?
            && self.value.less_or_equal(&other.value)?
            && self.types.less_or_equal(&other.types)?)
    }
}
