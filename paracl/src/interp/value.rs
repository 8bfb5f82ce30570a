//! Runtime values and name bindings

use super::node::NodeId;
use super::scope::ScopeId;

/// Runtime value. ParaCL has a single integer type.
pub type Value = i64;

/// Integer truthiness: zero is false, everything else is true
pub fn is_truthy(value: Value) -> bool {
    value != 0
}

/// What a name resolves to inside a scope
///
/// Cloning a `Func` copies the parameter list and the *index* of the body
/// scope. The body itself lives in the program's scope arena and is never
/// duplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Mutable integer cell
    Var(Value),
    /// Function declaration
    Func(Function),
}

/// A declared function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Parameter names, in call order
    pub params: Vec<String>,
    /// The single body scope shared by every invocation
    pub body: ScopeId,
    /// Node that makes the function callable once evaluated
    pub decl: NodeId,
    /// Set when `decl` has been evaluated
    pub ready: bool,
}

impl Binding {
    pub fn var(value: Value) -> Self {
        Binding::Var(value)
    }

    /// A function that becomes callable once `decl` is evaluated
    pub fn func(params: Vec<String>, body: ScopeId, decl: NodeId) -> Self {
        Binding::Func(Function {
            params,
            body,
            decl,
            ready: false,
        })
    }

    pub fn as_var(&self) -> Option<Value> {
        match self {
            Binding::Var(v) => Some(*v),
            Binding::Func(_) => None,
        }
    }

    pub fn as_func(&self) -> Option<&Function> {
        match self {
            Binding::Func(f) => Some(f),
            Binding::Var(_) => None,
        }
    }
}
