use serde::{Deserialize, Serialize};
use std::fmt;

use crate::il::{ControlFlowGraph, TypeRegistry};
use crate::Error;

/// An opaque handle to a cfg owned by a `Program`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CfgId(usize);

impl CfgId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for CfgId {
    fn from(index: usize) -> CfgId {
        CfgId(index)
    }
}

/// A whole program under analysis: the type universe plus every cfg.
///
/// The program owns its `TypeRegistry`, so two programs never share type
/// state and independent analysis runs can proceed side by side.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Program {
    types: TypeRegistry,
    cfgs: Vec<ControlFlowGraph>,
}

impl Program {
    pub fn new(types: TypeRegistry) -> Program {
        Program {
            types,
            cfgs: Vec::new(),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Adds a cfg to this program and returns its handle.
    pub fn add_cfg(&mut self, cfg: ControlFlowGraph) -> CfgId {
        let id = CfgId(self.cfgs.len());
        self.cfgs.push(cfg);
        id
    }

    pub fn cfg(&self, id: CfgId) -> &ControlFlowGraph {
        &self.cfgs[id.0]
    }

    /// All cfgs of this program with their handles.
    pub fn cfgs(&self) -> impl Iterator<Item = (CfgId, &ControlFlowGraph)> {
        self.cfgs
            .iter()
            .enumerate()
            .map(|(index, cfg)| (CfgId(index), cfg))
    }

    /// The first cfg with the given name.
    pub fn cfg_by_name(&self, name: &str) -> Result<CfgId, Error> {
        self.cfgs
            .iter()
            .position(|cfg| cfg.descriptor().name() == name)
            .map(CfgId)
            .ok_or_else(|| Error::CfgNotFound(name.to_string()))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for cfg in &self.cfgs {
            writeln!(f, "{}", cfg)?;
        }
        Ok(())
    }
}
