use serde::{Deserialize, Serialize};
use std::fmt;

use crate::il::{Expression, Identifier, Type};

/// The receiver of an instance call, together with its declared static type.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Receiver {
    expression: Expression,
    static_type: Type,
}

impl Receiver {
    pub fn new(expression: Expression, static_type: Type) -> Receiver {
        Receiver {
            expression,
            static_type,
        }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn static_type(&self) -> Type {
        self.static_type
    }
}

/// A call site. The call is unresolved at construction: concrete target
/// cfgs are computed by the interprocedural solver against a resolution
/// strategy, and the may-set of targets is recorded in the call graph.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Call {
    /// The identifier the call result is assigned to, if any.
    assign_to: Option<Identifier>,
    /// The name of the static target of this call.
    target_name: String,
    /// The receiver, present iff this is an instance call subject to
    /// dynamic dispatch.
    receiver: Option<Receiver>,
    /// The actual parameters, excluding the receiver.
    arguments: Vec<Expression>,
}

impl Call {
    pub fn new<S: Into<String>>(
        assign_to: Option<Identifier>,
        target_name: S,
        receiver: Option<Receiver>,
        arguments: Vec<Expression>,
    ) -> Call {
        Call {
            assign_to,
            target_name: target_name.into(),
            receiver,
            arguments,
        }
    }

    pub fn assign_to(&self) -> Option<&Identifier> {
        self.assign_to.as_ref()
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn receiver(&self) -> Option<&Receiver> {
        self.receiver.as_ref()
    }

    pub fn arguments(&self) -> &[Expression] {
        &self.arguments
    }

    pub fn is_instance(&self) -> bool {
        self.receiver.is_some()
    }

    /// The synthetic meta variable holding the abstraction of this call's
    /// return value, unique per call site.
    pub fn meta_identifier(&self, cfg_name: &str, node_index: usize) -> Identifier {
        Identifier::Meta(format!(
            "call_ret@{}:{}:{}",
            cfg_name, node_index, self.target_name
        ))
    }
}

/// A statement, the transfer function carried by one cfg node.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Statement {
    /// Evaluate `src` and bind the result to `dst`.
    Assign { dst: Identifier, src: Expression },
    /// Invoke another cfg.
    Call(Call),
    /// Return from the enclosing cfg, optionally with a value.
    Return(Option<Expression>),
    /// No operation.
    Nop,
}

impl Statement {
    pub fn assign(dst: Identifier, src: Expression) -> Statement {
        Statement::Assign { dst, src }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(dst) = &self.assign_to {
            write!(f, "{} = ", dst)?;
        }
        if let Some(receiver) = &self.receiver {
            write!(f, "{}.", receiver.expression())?;
        }
        write!(f, "{}(", self.target_name)?;
        for (i, argument) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", argument)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Statement::Assign { dst, src } => write!(f, "{} = {}", dst, src),
            Statement::Call(call) => call.fmt(f),
            Statement::Return(Some(expression)) => write!(f, "return {}", expression),
            Statement::Return(None) => write!(f, "return"),
            Statement::Nop => write!(f, "nop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::var;

    #[test]
    fn meta_identifiers_name_the_site_and_target() {
        let call = Call::new(Some(var("y")), "f", None, Vec::new());
        assert_eq!(
            call.meta_identifier("main", 3),
            Identifier::Meta("call_ret@main:3:f".to_string())
        );
    }
}
