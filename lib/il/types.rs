//! The type universe registered with a `Program`.
//!
//! Nominal unit types and their subtyping relation live in a
//! `TypeRegistry` owned by one `Program`, so independent analysis runs
//! never share type state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque handle to a unit type registered in a `TypeRegistry`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TypeId(usize);

impl TypeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The static type of an expression, parameter or return value.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Type {
    Int,
    Bool,
    Str,
    /// A nominal unit (class-like) type.
    Unit(TypeId),
    /// An unknown type, assignable to and from everything.
    Untyped,
}

/// A nominal unit type with optional single inheritance.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UnitType {
    name: String,
    superunit: Option<TypeId>,
}

impl UnitType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superunit(&self) -> Option<TypeId> {
        self.superunit
    }
}

/// The registry of unit types for one `Program`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TypeRegistry {
    units: Vec<UnitType>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry { units: Vec::new() }
    }

    /// Registers a unit type, optionally inheriting from another unit, and
    /// returns its handle.
    pub fn insert_unit<S: Into<String>>(&mut self, name: S, superunit: Option<TypeId>) -> TypeId {
        let id = TypeId(self.units.len());
        self.units.push(UnitType {
            name: name.into(),
            superunit,
        });
        id
    }

    pub fn unit(&self, id: TypeId) -> &UnitType {
        &self.units[id.0]
    }

    pub fn unit_by_name(&self, name: &str) -> Option<TypeId> {
        self.units
            .iter()
            .position(|unit| unit.name == name)
            .map(TypeId)
    }

    /// Returns true if `sub` is `sup` or a transitive subunit of `sup`.
    pub fn is_subunit(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut current = Some(sub);
        while let Some(id) = current {
            if id == sup {
                return true;
            }
            current = self.units[id.0].superunit;
        }
        false
    }

    /// Returns true if a value of type `from` can be assigned to a slot of
    /// type `to`. `Untyped` is assignable in both directions.
    pub fn can_be_assigned_to(&self, from: &Type, to: &Type) -> bool {
        match (from, to) {
            (Type::Untyped, _) | (_, Type::Untyped) => true,
            (Type::Unit(sub), Type::Unit(sup)) => self.is_subunit(*sub, *sup),
            (lhs, rhs) => lhs == rhs,
        }
    }

    /// Formats a type against this registry, resolving unit names.
    pub fn type_name(&self, typ: &Type) -> String {
        match typ {
            Type::Unit(id) => self.units[id.0].name.clone(),
            other => format!("{}", other),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Str => write!(f, "str"),
            Type::Unit(id) => write!(f, "unit#{}", id.0),
            Type::Untyped => write!(f, "untyped"),
        }
    }
}
