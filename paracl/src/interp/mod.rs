//! ParaCL interpreter
//!
//! Evaluates the arena program built by [`crate::lower`]. Functions share a
//! single body scope across invocations; calls snapshot and restore it.

mod error;
mod eval;
mod node;
mod scope;
mod value;

pub use error::{ErrorKind, EvalResult, Flow, InterpResult, Interrupt, RuntimeError};
pub use eval::{run, EvalConfig, Interpreter};
pub use node::{Node, NodeId, Op, Owned, Program};
pub use scope::{FrameSnapshot, Scope, ScopeId, ScopeKind, Scopes, Snapshot};
pub use value::{is_truthy, Binding, Function, Value};
