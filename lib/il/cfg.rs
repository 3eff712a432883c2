//! A `ControlFlowGraph` is a directed `Graph` of statement `Node`s and
//! `Edge`s, describing one procedure.
//!
//! The core assumes well-formed cfgs: a single entry, every node reachable
//! from it, and no dangling edges. Frontends must guarantee this; the
//! solvers do not validate it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::graph;
use crate::il::{Expression, Statement, Type, TypeId};
use crate::Error;

/// A node of a `ControlFlowGraph`, carrying the statement that is its
/// transfer function.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Node {
    index: usize,
    statement: Statement,
}

impl Node {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }
}

impl graph::Vertex for Node {
    fn index(&self) -> usize {
        self.index
    }
}

/// An edge of a `ControlFlowGraph`. A conditional edge carries the
/// expression that must hold along it; frontends emit the negated condition
/// on the fall-through edge of a branch.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Edge {
    head: usize,
    tail: usize,
    condition: Option<Expression>,
}

impl Edge {
    pub fn new(head: usize, tail: usize, condition: Option<Expression>) -> Edge {
        Edge {
            head,
            tail,
            condition,
        }
    }

    pub fn condition(&self) -> Option<&Expression> {
        self.condition.as_ref()
    }
}

impl graph::Edge for Edge {
    fn head(&self) -> usize {
        self.head
    }
    fn tail(&self) -> usize {
        self.tail
    }
}

/// A formal parameter of a cfg.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Parameter {
    name: String,
    static_type: Type,
}

impl Parameter {
    pub fn new<S: Into<String>>(name: S, static_type: Type) -> Parameter {
        Parameter {
            name: name.into(),
            static_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn static_type(&self) -> Type {
        self.static_type
    }
}

/// The signature of a cfg: its name, formal parameters, return type, and,
/// for instance cfgs, the unit that defines it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CfgDescriptor {
    name: String,
    unit: Option<TypeId>,
    parameters: Vec<Parameter>,
    return_type: Type,
}

impl CfgDescriptor {
    /// Builds the descriptor of a free (non-instance) cfg.
    pub fn new<S: Into<String>>(
        name: S,
        parameters: Vec<Parameter>,
        return_type: Type,
    ) -> CfgDescriptor {
        CfgDescriptor {
            name: name.into(),
            unit: None,
            parameters,
            return_type,
        }
    }

    /// Builds the descriptor of an instance cfg defined on `unit`. The
    /// implicit receiver is prepended to the formals as `this` with the
    /// defining unit as its static type.
    pub fn instance<S: Into<String>>(
        name: S,
        unit: TypeId,
        mut parameters: Vec<Parameter>,
        return_type: Type,
    ) -> CfgDescriptor {
        parameters.insert(0, Parameter::new("this", Type::Unit(unit)));
        CfgDescriptor {
            name: name.into(),
            unit: Some(unit),
            parameters,
            return_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unit defining this cfg, for instance cfgs.
    pub fn unit(&self) -> Option<TypeId> {
        self.unit
    }

    pub fn is_instance(&self) -> bool {
        self.unit.is_some()
    }

    /// All formal parameters, including the implicit receiver of instance
    /// cfgs.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn return_type(&self) -> Type {
        self.return_type
    }
}

/// A directed graph of statements describing one procedure.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ControlFlowGraph {
    // The internal graph used to store our nodes.
    graph: graph::Graph<Node, Edge>,
    // The next index to use when creating a node.
    next_index: usize,
    // The entry node for the graph.
    entry: Option<usize>,
    descriptor: CfgDescriptor,
}

impl ControlFlowGraph {
    pub fn new(descriptor: CfgDescriptor) -> ControlFlowGraph {
        ControlFlowGraph {
            graph: graph::Graph::new(),
            next_index: 0,
            entry: None,
            descriptor,
        }
    }

    /// Returns the underlying graph
    pub fn graph(&self) -> &graph::Graph<Node, Edge> {
        &self.graph
    }

    pub fn descriptor(&self) -> &CfgDescriptor {
        &self.descriptor
    }

    /// Sets the entry point for this `ControlFlowGraph` to the given `Node`
    /// index.
    pub fn set_entry(&mut self, entry: usize) -> Result<(), Error> {
        if self.graph.has_vertex(entry) {
            self.entry = Some(entry);
            return Ok(());
        }
        Err("Index does not exist for set_entry".into())
    }

    /// Get the entry `Node` index for this `ControlFlowGraph`.
    pub fn entry(&self) -> Option<usize> {
        self.entry
    }

    /// Get a `Node` by index.
    pub fn node(&self, index: usize) -> Result<&Node, Error> {
        self.graph.vertex(index)
    }

    /// Get every `Node` in this `ControlFlowGraph`.
    pub fn nodes(&self) -> Vec<&Node> {
        self.graph.vertices()
    }

    /// Get every incoming edge to a node
    pub fn edges_in(&self, index: usize) -> Result<Vec<&Edge>, Error> {
        self.graph.edges_in(index)
    }

    /// Get every outgoing edge from a node
    pub fn edges_out(&self, index: usize) -> Result<Vec<&Edge>, Error> {
        self.graph.edges_out(index)
    }

    /// Creates a new node carrying the given statement, adds it to the
    /// graph, and returns its index.
    pub fn new_node(&mut self, statement: Statement) -> Result<usize, Error> {
        let next_index = self.next_index;
        self.next_index += 1;
        self.graph.insert_vertex(Node {
            index: next_index,
            statement,
        })?;
        Ok(next_index)
    }

    /// Creates an unconditional edge from one node to another node
    pub fn unconditional_edge(&mut self, head: usize, tail: usize) -> Result<(), Error> {
        self.graph.insert_edge(Edge::new(head, tail, None))
    }

    /// Creates a conditional edge from one node to another node
    pub fn conditional_edge(
        &mut self,
        head: usize,
        tail: usize,
        condition: Expression,
    ) -> Result<(), Error> {
        self.graph.insert_edge(Edge::new(head, tail, Some(condition)))
    }
}

impl fmt::Display for ControlFlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "cfg {}", self.descriptor.name)?;
        for node in self.nodes() {
            writeln!(f, "  {}: {}", node.index(), node.statement())?;
        }
        for edge in self.graph.edges() {
            match edge.condition() {
                Some(condition) => {
                    writeln!(f, "  edge {} -> {} [{}]", edge.head, edge.tail, condition)?
                }
                None => writeln!(f, "  edge {} -> {}", edge.head, edge.tail)?,
            }
        }
        Ok(())
    }
}
