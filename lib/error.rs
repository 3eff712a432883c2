//! Error types for all kestrel operations.

use thiserror::Error;

/// The error type for all kestrel operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A domain raised an error while evaluating semantics, such as an
    /// uninterpretable operand or an internal inconsistency.
    #[error("Semantic error: {0}")]
    Semantic(String),

    /// The analysis was configured with an incompatible composition of
    /// domains or an otherwise invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A fixpoint computation exceeded a configured iteration cap.
    #[error("Fixpoint did not terminate in cfg {cfg} at node {node}")]
    NonTermination { cfg: String, node: usize },

    /// The interprocedural driver's call summaries kept changing past the
    /// configured round cap.
    #[error("Call summaries did not stabilize within {0} rounds")]
    SummaryNonTermination(usize),

    /// A call resolved to zero targets, and unresolved calls are
    /// configured to be fatal.
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// A graph vertex was not found
    #[error("Graph vertex was not found: {0}")]
    GraphVertexNotFound(usize),

    /// A graph edge was not found
    #[error("Graph edge was not found: ({0}, {1})")]
    GraphEdgeNotFound(usize, usize),

    /// An edge was inserted between vertices that do not exist
    #[error("Cannot insert edge ({0}, {1}): missing vertex")]
    GraphEdgeInvalidVertex(usize, usize),

    /// A control flow graph has no entry set
    #[error("ControlFlowGraph entry was not set")]
    ControlFlowGraphEntryNotFound,

    /// A cfg was not found in the program
    #[error("Cfg was not found: {0}")]
    CfgNotFound(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl From<&str> for Error {
    fn from(error: &str) -> Error {
        Error::Custom(error.to_string())
    }
}

impl From<String> for Error {
    fn from(error: String) -> Error {
        Error::Custom(error)
    }
}
