//! The whole-program solver: call resolution, call-site summaries, and
//! the call graph.
//!
//! Calls are unresolved in the IL. During the per-cfg fixpoint this layer
//! resolves each call site to a may-set of target cfgs, analyzes every
//! target from an entry state built by binding formals to the abstraction
//! of the actuals, and feeds the lub of the targets' returned values back
//! to the caller through the call's meta identifier. Summaries are
//! memoized per target by exact entry state; a recursive call observes a
//! memoized summary only when its entry covers the revisit entry, and top
//! otherwise.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::analysis::{
    fixpoint, return_identifier, AbstractState, CallResolver, Environment, FixpointConfiguration,
    FixpointResult, HeapDomain, Lattice, NonRelationalDomain, TypeDomain,
};
use crate::il::{Call, CfgId, Expression, Identifier, Program, Statement, Type};
use crate::Error;

/// How call sites are matched to target cfgs.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum CallResolutionStrategy {
    /// Match on name, arity, and positional assignability of the actuals'
    /// static types.
    FixedOrder,
    /// For instance calls, dispatch on the receiver's inferred runtime
    /// types: each runtime type selects the most derived override along
    /// its superunit chain. Falls back to `FixedOrder` when no runtime
    /// types are known.
    RuntimeTypes,
}

/// The order actual parameters are evaluated and bound to formals.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ParameterAssignment {
    LeftToRight,
    RightToLeft,
}

/// Tunables of one whole-program analysis.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AnalysisConfiguration {
    pub fixpoint: FixpointConfiguration,
    pub call_resolution: CallResolutionStrategy,
    pub parameter_assignment: ParameterAssignment,
    /// Turn a call site with no resolved target into a hard error instead
    /// of an unknown result.
    pub fatal_unresolved_calls: bool,
    /// Rounds over the entry points in which summaries may still change
    /// before giving up; the final round confirming stability is not
    /// counted.
    pub max_summary_rounds: usize,
}

impl Default for AnalysisConfiguration {
    fn default() -> AnalysisConfiguration {
        AnalysisConfiguration {
            fixpoint: FixpointConfiguration::default(),
            call_resolution: CallResolutionStrategy::RuntimeTypes,
            parameter_assignment: ParameterAssignment::LeftToRight,
            fatal_unresolved_calls: false,
            max_summary_rounds: 10,
        }
    }
}

/// The may-call relation discovered during analysis: each call site maps
/// to the set of cfgs it may invoke.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CallGraph {
    edges: FxHashMap<(CfgId, usize), BTreeSet<CfgId>>,
}

impl CallGraph {
    fn record(&mut self, caller: CfgId, node: usize, targets: &[CfgId]) {
        self.edges
            .entry((caller, node))
            .or_default()
            .extend(targets.iter().copied());
    }

    /// The targets resolved for the call at `node` of `caller`.
    pub fn targets(&self, caller: CfgId, node: usize) -> Option<&BTreeSet<CfgId>> {
        self.edges.get(&(caller, node))
    }

    /// Every recorded call site with its targets.
    pub fn call_sites(&self) -> impl Iterator<Item = (CfgId, usize, &BTreeSet<CfgId>)> {
        self.edges
            .iter()
            .map(|((caller, node), targets)| (*caller, *node, targets))
    }
}

/// The whole-program analysis over one `Program`.
pub struct InterproceduralAnalysis<'p, H, V, T>
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
{
    program: &'p Program,
    config: AnalysisConfiguration,
    call_graph: CallGraph,
    results: FxHashMap<usize, FixpointResult<H, V, T>>,
    summaries: FxHashMap<usize, Vec<(AbstractState<H, V, T>, AbstractState<H, V, T>)>>,
    active: FxHashSet<usize>,
}

impl<'p, H, V, T> InterproceduralAnalysis<'p, H, V, T>
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
{
    fn new(program: &'p Program, config: AnalysisConfiguration) -> Self {
        InterproceduralAnalysis {
            program,
            config,
            call_graph: CallGraph::default(),
            results: FxHashMap::default(),
            summaries: FxHashMap::default(),
            active: FxHashSet::default(),
        }
    }

    /// Analyzes `program` from the given entry points, each starting at
    /// `entry_state`, re-running until every summary is stable.
    pub fn analyze(
        program: &'p Program,
        entry_points: &[CfgId],
        entry_state: &AbstractState<H, V, T>,
        config: AnalysisConfiguration,
    ) -> Result<Self, Error> {
        if config.max_summary_rounds == 0 {
            return Err(Error::Configuration(
                "max_summary_rounds must be at least 1".to_string(),
            ));
        }
        let mut analysis = InterproceduralAnalysis::new(program, config);
        let mut rounds = 0usize;
        loop {
            rounds += 1;
            let before = analysis.summaries.clone();
            for entry_point in entry_points {
                analysis.summary_of(*entry_point, entry_state.clone())?;
            }
            if analysis.summaries == before {
                break;
            }
            // Only rounds that still change summaries count against the
            // cap; the final confirming round is free.
            if rounds > analysis.config.max_summary_rounds {
                return Err(Error::SummaryNonTermination(rounds));
            }
            log::debug!("summaries changed, round {} complete", rounds);
        }
        Ok(analysis)
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    /// The per-node post states of the last analysis of `cfg`.
    pub fn result_of(&self, cfg: CfgId) -> Option<&FixpointResult<H, V, T>> {
        self.results.get(&cfg.index())
    }

    /// The exit summary of `target` for `entry`: the lub of every return
    /// node's post state, computed on demand and memoized by exact entry
    /// state.
    fn summary_of(
        &mut self,
        target: CfgId,
        entry: AbstractState<H, V, T>,
    ) -> Result<AbstractState<H, V, T>, Error> {
        let index = target.index();
        if let Some(stored) = self
            .summaries
            .get(&index)
            .and_then(|summaries| summaries.iter().find(|(e, _)| *e == entry))
        {
            return Ok(stored.1.clone());
        }
        if self.active.contains(&index) {
            return self.recursive_approximation(index, &entry);
        }

        self.active.insert(index);
        let program = self.program;
        let fixpoint_config = self.config.fixpoint.clone();
        let result = fixpoint(program, target, &entry, &fixpoint_config, self);
        self.active.remove(&index);
        let result = result?;

        let cfg = program.cfg(target);
        let mut exit = AbstractState::bottom();
        for (node, state) in result.states() {
            if matches!(cfg.node(node)?.statement(), Statement::Return(_)) {
                exit = exit.lub(state)?;
            }
        }
        self.results.insert(index, result);
        self.summaries
            .entry(index)
            .or_default()
            .push((entry, exit.clone()));
        Ok(exit)
    }

    /// The result a call observes while its target is being analyzed up
    /// the call stack. A memoized summary over-approximates the revisit
    /// only when its entry covers the revisit entry; with no covering
    /// entry the call observes top.
    fn recursive_approximation(
        &self,
        index: usize,
        entry: &AbstractState<H, V, T>,
    ) -> Result<AbstractState<H, V, T>, Error> {
        let summaries = match self.summaries.get(&index) {
            Some(summaries) => summaries,
            None => return Ok(AbstractState::top()),
        };
        let mut approximation = AbstractState::bottom();
        let mut covered = false;
        for (memo_entry, exit) in summaries {
            if entry.less_or_equal(memo_entry)? {
                approximation = approximation.lub(exit)?;
                covered = true;
            }
        }
        if covered {
            Ok(approximation)
        } else {
            Ok(AbstractState::top())
        }
    }

    /// Builds the callee's entry state: the caller's heap plus fresh
    /// environments binding each formal to the abstraction of its actual.
    fn entry_state_for(
        &self,
        target: CfgId,
        call: &Call,
        state: &AbstractState<H, V, T>,
    ) -> Result<AbstractState<H, V, T>, Error> {
        let descriptor = self.program.cfg(target).descriptor();
        let formals = descriptor.parameters();

        let mut actuals: Vec<&Expression> = Vec::with_capacity(formals.len());
        if let Some(receiver) = call.receiver() {
            actuals.push(receiver.expression());
        }
        actuals.extend(call.arguments().iter());
        if formals.len() != actuals.len() {
            return Err(Error::Resolution(format!(
                "arity mismatch calling {}: {} formals, {} actuals",
                descriptor.name(),
                formals.len(),
                actuals.len()
            )));
        }

        let order: Vec<usize> = match self.config.parameter_assignment {
            ParameterAssignment::LeftToRight => (0..formals.len()).collect(),
            ParameterAssignment::RightToLeft => (0..formals.len()).rev().collect(),
        };

        let mut value = Environment::top();
        let mut types = Environment::top();
        for i in order {
            let formal = Identifier::Variable(formals[i].name().to_string());
            value = value.with_binding(formal.clone(), state.eval_value(actuals[i])?);
            types = types.with_binding(formal, state.eval_types(actuals[i])?);
        }
        Ok(AbstractState::new(state.heap().clone(), value, types))
    }

    /// Resolves `call` to its may-set of target cfgs.
    fn resolve(
        &self,
        call: &Call,
        state: &AbstractState<H, V, T>,
    ) -> Result<Vec<CfgId>, Error> {
        let expected_arity = call.arguments().len() + usize::from(call.is_instance());
        let candidates: Vec<CfgId> = self
            .program
            .cfgs()
            .filter(|(_, cfg)| {
                let descriptor = cfg.descriptor();
                descriptor.name() == call.target_name()
                    && descriptor.is_instance() == call.is_instance()
                    && descriptor.parameters().len() == expected_arity
            })
            .map(|(id, _)| id)
            .collect();

        let receiver = match call.receiver() {
            Some(receiver) => receiver,
            None => return Ok(self.filter_static(call, &candidates)),
        };

        match self.config.call_resolution {
            CallResolutionStrategy::FixedOrder => Ok(self.filter_static(call, &candidates)),
            CallResolutionStrategy::RuntimeTypes => {
                let inferred = state.eval_types(receiver.expression())?;
                match inferred.runtime_types() {
                    None => Ok(self.filter_static(call, &candidates)),
                    Some(types) => Ok(self.dispatch(types, &candidates)),
                }
            }
        }
    }

    /// Keeps the candidates whose formals accept the actuals' static
    /// types, position by position.
    fn filter_static(&self, call: &Call, candidates: &[CfgId]) -> Vec<CfgId> {
        let registry = self.program.types();
        let mut actual_types = Vec::new();
        if let Some(receiver) = call.receiver() {
            actual_types.push(receiver.static_type());
        }
        actual_types.extend(call.arguments().iter().map(|a| a.static_type()));

        candidates
            .iter()
            .filter(|id| {
                let formals = self.program.cfg(**id).descriptor().parameters();
                formals
                    .iter()
                    .zip(actual_types.iter())
                    .all(|(formal, actual)| {
                        registry.can_be_assigned_to(actual, &formal.static_type())
                    })
            })
            .copied()
            .collect()
    }

    /// Dynamic dispatch: each runtime receiver type selects the candidate
    /// defined on the most derived unit along its superunit chain.
    fn dispatch(&self, runtime_types: &BTreeSet<Type>, candidates: &[CfgId]) -> Vec<CfgId> {
        let registry = self.program.types();
        let mut targets = BTreeSet::new();
        for typ in runtime_types {
            let unit = match typ {
                Type::Unit(unit) => *unit,
                _ => continue,
            };
            let mut current = Some(unit);
            while let Some(id) = current {
                if let Some(target) = candidates
                    .iter()
                    .find(|candidate| {
                        self.program.cfg(**candidate).descriptor().unit() == Some(id)
                    })
                {
                    targets.insert(*target);
                    break;
                }
                current = registry.unit(id).superunit();
            }
        }
        targets.into_iter().collect()
    }
}

impl<'p, H, V, T> CallResolver<H, V, T> for InterproceduralAnalysis<'p, H, V, T>
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
{
    fn abstract_result_of(
        &mut self,
        caller: CfgId,
        node: usize,
        call: &Call,
        state: &AbstractState<H, V, T>,
    ) -> Result<AbstractState<H, V, T>, Error> {
        let caller_name = self.program.cfg(caller).descriptor().name().to_string();
        let targets = self.resolve(call, state)?;
        self.call_graph.record(caller, node, &targets);

        let meta = call.meta_identifier(&caller_name, node);
        if targets.is_empty() {
            if self.config.fatal_unresolved_calls {
                return Err(Error::Resolution(format!(
                    "no target for call {} in {}",
                    call, caller_name
                )));
            }
            log::warn!("unresolved call {} in {}", call, caller_name);
            return Ok(state.forget(&meta));
        }
        log::trace!(
            "call {} in {} resolved to {} target(s)",
            call,
            caller_name,
            targets.len()
        );

        let mut returned_value = V::bottom();
        let mut returned_types = T::bottom();
        let mut callee_heap = H::bottom();
        for target in &targets {
            let entry = self.entry_state_for(*target, call, state)?;
            let exit = self.summary_of(*target, entry)?;
            let ret = return_identifier(self.program.cfg(*target).descriptor().name());
            returned_value = returned_value.lub(&exit.value().value_of(&ret))?;
            returned_types = returned_types.lub(&exit.types().value_of(&ret))?;
            callee_heap = callee_heap.lub(exit.heap())?;
        }

        let heap = state.heap().lub(&callee_heap)?;
        let state = AbstractState::new(heap, state.value().clone(), state.types().clone());
        Ok(state.with_binding(meta, returned_value, returned_types))
    }
}
