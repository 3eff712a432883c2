//! The per-cfg fixpoint solver.
//!
//! A chaotic worklist iteration over the cfg's nodes. Each node's post
//! state is the transfer function of its statement applied to the least
//! upper bound of its predecessors' post states, filtered through edge
//! conditions. Loop headers switch from lub to widening once a node has
//! been recomputed `widening_threshold` times, guaranteeing termination on
//! infinite-height domains. An optional descending phase then re-traverses
//! the cfg a bounded number of times, keeping recomputed states only when
//! they refine the stored ones.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::analysis::{AbstractState, HeapDomain, Lattice, NonRelationalDomain, TypeDomain};
use crate::graph::Edge as _;
use crate::il::{Call, CfgId, ControlFlowGraph, Expression, Identifier, Program, Statement};
use crate::Error;

/// Tunables of one fixpoint computation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FixpointConfiguration {
    /// Recomputations of a loop header before switching from lub to
    /// widening.
    pub widening_threshold: usize,
    /// Bounded descending re-traversals after the ascending phase; zero
    /// disables the descending phase.
    pub descending_iterations: usize,
    /// Recomputations of a single node before the solver gives up.
    pub max_node_iterations: usize,
    /// Worklist extractions before the solver gives up.
    pub max_iterations: usize,
}

impl Default for FixpointConfiguration {
    fn default() -> FixpointConfiguration {
        FixpointConfiguration {
            widening_threshold: 5,
            descending_iterations: 0,
            max_node_iterations: 1000,
            max_iterations: 100_000,
        }
    }
}

impl FixpointConfiguration {
    pub fn with_widening_threshold(mut self, threshold: usize) -> FixpointConfiguration {
        self.widening_threshold = threshold;
        self
    }

    pub fn with_descending_iterations(mut self, iterations: usize) -> FixpointConfiguration {
        self.descending_iterations = iterations;
        self
    }
}

/// The result of one fixpoint computation: the post state of every node
/// reached from the entry.
#[derive(Clone, Debug, PartialEq)]
pub struct FixpointResult<H, V, T>
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
{
    post_states: FxHashMap<usize, AbstractState<H, V, T>>,
}

impl<H, V, T> FixpointResult<H, V, T>
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
{
    /// The post state of the given node, if the node was reached.
    pub fn state_at(&self, node: usize) -> Option<&AbstractState<H, V, T>> {
        self.post_states.get(&node)
    }

    /// Every reached node with its post state.
    pub fn states(&self) -> impl Iterator<Item = (usize, &AbstractState<H, V, T>)> {
        self.post_states.iter().map(|(node, state)| (*node, state))
    }
}

/// Supplies the abstract result of call statements during a fixpoint.
///
/// On success the returned state must bind the call's meta identifier to
/// the abstraction of the returned value, or leave it unbound for an
/// unknown result.
pub trait CallResolver<H, V, T>
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
    ) -> Result<AbstractState<H, V, T>, Error>;
}

/// The resolver that knows nothing: every call result is top. Used for
/// purely intraprocedural runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct TopCallResolver;

impl<H, V, T> CallResolver<H, V, T> for TopCallResolver
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
{
    fn abstract_result_of(
        &mut self,
        _caller: CfgId,
        _node: usize,
        _call: &Call,
        state: &AbstractState<H, V, T>,
    ) -> Result<AbstractState<H, V, T>, Error> {
        Ok(state.clone())
    }
}

/// The meta identifier holding a cfg's returned value.
pub fn return_identifier(cfg_name: &str) -> Identifier {
    Identifier::Meta(format!("ret@{}", cfg_name))
}

/// Applies the semantics of one statement to `state`.
fn transfer<H, V, T, R>(
    caller: CfgId,
    cfg: &ControlFlowGraph,
    node: usize,
    state: &AbstractState<H, V, T>,
    resolver: &mut R,
) -> Result<AbstractState<H, V, T>, Error>
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
    R: CallResolver<H, V, T>,
{
    match cfg.node(node)?.statement() {
        Statement::Assign { dst, src } => state.assign(dst, src),
        Statement::Call(call) => {
            let state = resolver.abstract_result_of(caller, node, call, state)?;
            let meta = call.meta_identifier(cfg.descriptor().name(), node);
            let state = match call.assign_to() {
                Some(dst) => state.assign(dst, &Expression::Identifier(meta.clone()))?,
                None => state,
            };
            Ok(state.forget(&meta))
        }
        Statement::Return(Some(expr)) => {
            state.assign(&return_identifier(cfg.descriptor().name()), expr)
        }
        Statement::Return(None) | Statement::Nop => Ok(state.clone()),
    }
}

/// The in state of `node`: the lub of its predecessors' post states
/// filtered through edge conditions, plus `entry_state` at the entry.
fn in_state<H, V, T>(
    cfg: &ControlFlowGraph,
    node: usize,
    entry: usize,
    entry_state: &AbstractState<H, V, T>,
    post_states: &FxHashMap<usize, AbstractState<H, V, T>>,
) -> Result<AbstractState<H, V, T>, Error>
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
{
    let mut state = if node == entry {
        entry_state.clone()
    } else {
        AbstractState::bottom()
    };
    for edge in cfg.edges_in(node)? {
        let predecessor = edge.head();
        if let Some(predecessor_out) = post_states.get(&predecessor) {
            let contributed = match edge.condition() {
                Some(condition) => predecessor_out.assume(condition)?,
                None => predecessor_out.clone(),
            };
            state = state.lub(&contributed)?;
        }
    }
    Ok(state)
}

/// Runs the fixpoint of `cfg_id` from `entry_state`.
pub fn fixpoint<H, V, T, R>(
    program: &Program,
    cfg_id: CfgId,
    entry_state: &AbstractState<H, V, T>,
    config: &FixpointConfiguration,
    resolver: &mut R,
) -> Result<FixpointResult<H, V, T>, Error>
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
    R: CallResolver<H, V, T>,
{
    let cfg = program.cfg(cfg_id);
    let entry = cfg.entry().ok_or(Error::ControlFlowGraphEntryNotFound)?;
    let loop_headers = cfg.graph().loop_headers(entry)?;

    let mut post_states: FxHashMap<usize, AbstractState<H, V, T>> = FxHashMap::default();
    let mut recomputations: FxHashMap<usize, usize> = FxHashMap::default();

    let mut queue: VecDeque<usize> = VecDeque::new();
    let mut queued: FxHashSet<usize> = FxHashSet::default();
    queue.push_back(entry);
    queued.insert(entry);

    let mut iterations = 0usize;
    while let Some(node) = queue.pop_front() {
        queued.remove(&node);
        iterations += 1;
        if iterations > config.max_iterations {
            return Err(Error::NonTermination {
                cfg: cfg.descriptor().name().to_string(),
                node,
            });
        }

        let state = in_state(cfg, node, entry, entry_state, &post_states)?;
        if state.is_bottom() && node != entry {
            // No predecessor computed yet; a predecessor's update requeues
            // this node.
            continue;
        }
        let out = transfer(cfg_id, cfg, node, &state, resolver)?;

        let new_out = match post_states.get(&node) {
            Some(old) => {
                if out.less_or_equal(old)? {
                    continue;
                }
                let count = recomputations.entry(node).or_insert(0);
                *count += 1;
                if *count > config.max_node_iterations {
                    return Err(Error::NonTermination {
                        cfg: cfg.descriptor().name().to_string(),
                        node,
                    });
                }
                if loop_headers.contains(&node) && *count >= config.widening_threshold {
                    old.widening(&out)?
                } else {
                    old.lub(&out)?
                }
            }
            None => out,
        };
        log::trace!(
            "{}: node {} recomputed, {} iterations",
            cfg.descriptor().name(),
            node,
            iterations
        );
        post_states.insert(node, new_out);
        for successor in cfg.graph().successor_indices(node)? {
            if queued.insert(successor) {
                queue.push_back(successor);
            }
        }
    }

    if config.descending_iterations > 0 {
        descend(
            program, cfg_id, entry, entry_state, config, resolver, &mut post_states,
        )?;
    }

    Ok(FixpointResult { post_states })
}

/// The descending phase: re-traverses the cfg, replacing a stored post
/// state only when the recomputed one refines it. Every node is revisited
/// at most `descending_iterations` times; running out of visits is the
/// normal stopping condition, not an error.
fn descend<H, V, T, R>(
    program: &Program,
    cfg_id: CfgId,
    entry: usize,
    entry_state: &AbstractState<H, V, T>,
    config: &FixpointConfiguration,
    resolver: &mut R,
    post_states: &mut FxHashMap<usize, AbstractState<H, V, T>>,
) -> Result<(), Error>
where
    H: HeapDomain,
    V: NonRelationalDomain,
    T: TypeDomain,
    R: CallResolver<H, V, T>,
{
    let cfg = program.cfg(cfg_id);
    let mut remaining: FxHashMap<usize, usize> = post_states
        .keys()
        .map(|node| (*node, config.descending_iterations))
        .collect();

    // Reverse post order, so a node is revisited after its predecessors.
    let mut queue: VecDeque<usize> = cfg
        .graph()
        .compute_post_order(entry)?
        .into_iter()
        .rev()
        .filter(|node| post_states.contains_key(node))
        .collect();
    let mut queued: FxHashSet<usize> = queue.iter().copied().collect();

    while let Some(node) = queue.pop_front() {
        queued.remove(&node);
        let visits = match remaining.get_mut(&node) {
            Some(visits) if *visits > 0 => visits,
            _ => continue,
        };
        *visits -= 1;

        let state = in_state(cfg, node, entry, entry_state, post_states)?;
        let out = transfer(cfg_id, cfg, node, &state, resolver)?;
        let stored = match post_states.get(&node) {
            Some(stored) => stored,
            None => continue,
        };
        if out == *stored || !out.less_or_equal(stored)? {
            continue;
        }
        post_states.insert(node, out);
        for successor in cfg.graph().successor_indices(node)? {
            if queued.insert(successor) {
                queue.push_back(successor);
            }
        }
    }
    Ok(())
}
