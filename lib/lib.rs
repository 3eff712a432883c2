//! Kestrel is a static analyzer by abstract interpretation.
//!
//! Programs are lowered into a small intermediate language of control flow
//! graphs (`il`), then solved over a composable abstract state: a heap
//! abstraction, a value domain and a type domain, each an instance of the
//! same lattice algebra (`analysis`). A per-cfg worklist fixpoint with
//! widening handles loops; the interprocedural layer resolves calls,
//! statically or by dynamic dispatch on inferred runtime types, and
//! memoizes call summaries.
//!
//! A minimal run looks like:
//!
//! ```
//! use kestrel::analysis::{
//!     AbstractState, AnalysisConfiguration, ConstantPropagation, InferredTypes,
//!     InterproceduralAnalysis, Lattice, MonolithicHeap,
//! };
//! use kestrel::il;
//!
//! # fn main() -> Result<(), kestrel::Error> {
//! let mut cfg = il::ControlFlowGraph::new(il::CfgDescriptor::new(
//!     "main",
//!     Vec::new(),
//!     il::Type::Int,
//! ));
//! let node = cfg.new_node(il::Statement::assign(il::var("x"), il::expr_int(42)))?;
//! cfg.set_entry(node)?;
//!
//! let mut program = il::Program::new(il::TypeRegistry::new());
//! let main = program.add_cfg(cfg);
//!
//! type State = AbstractState<MonolithicHeap, ConstantPropagation, InferredTypes>;
//! let analysis = InterproceduralAnalysis::analyze(
//!     &program,
//!     &[main],
//!     &State::top(),
//!     AnalysisConfiguration::default(),
//! )?;
//! let state = analysis.result_of(main).unwrap().state_at(node).unwrap();
//! assert_eq!(
//!     state.value().value_of(&il::var("x")),
//!     ConstantPropagation::Constant(42)
//! );
//! # Ok(())
//! # }
//! ```

pub mod analysis;
mod error;
pub mod graph;
pub mod il;

pub use crate::error::Error;

#[cfg(test)]
mod tests;
