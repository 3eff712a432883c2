//! The analysis core.
//!
//! Bottom up: `lattice` defines the algebra every domain implements,
//! `nonrelational` lifts a per-identifier domain to an environment,
//! `numeric`, `string` and `typing` are the concrete domains, `heap`
//! abstracts allocations and field accesses, `state` composes a heap, a
//! value and a type component, `fixpoint` solves one cfg, and
//! `interprocedural` solves a whole program.

mod fixpoint;
mod heap;
mod interprocedural;
mod lattice;
mod nonrelational;
mod numeric;
mod state;
mod string;
mod typing;

pub use self::fixpoint::{
    fixpoint, return_identifier, CallResolver, FixpointConfiguration, FixpointResult,
    TopCallResolver,
};
pub use self::heap::{HeapDomain, HeapSemantics, MonolithicHeap};
pub use self::interprocedural::{
    AnalysisConfiguration, CallGraph, CallResolutionStrategy, InterproceduralAnalysis,
    ParameterAssignment,
};
pub use self::lattice::{Lattice, Satisfiability};
pub use self::nonrelational::{Environment, NonRelationalDomain};
pub use self::numeric::ConstantPropagation;
pub use self::state::AbstractState;
pub use self::string::{Brick, Prefix};
pub use self::typing::{InferredTypes, TypeDomain};
