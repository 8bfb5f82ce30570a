//! Runtime errors and control signals for the interpreter

use super::node::NodeId;
use super::value::Value;
use std::fmt;

/// Runtime error during interpretation
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Innermost node being evaluated when the error was raised
    pub node: Option<NodeId>,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Name not bound in any enclosing scope
    UndefinedName,
    /// Name is bound to a function where a variable was expected
    NotAVariable,
    /// Name is bound to a variable where a function was expected
    NotAFunction,
    /// Argument count mismatch
    ArityMismatch,
    /// Division or remainder by zero
    DivisionByZero,
    /// Operator used in a position it has no meaning in
    UnknownOperator,
    /// Forward references that never become callable
    UnresolvedForwardReference,
    /// Call depth limit exceeded
    StackOverflow,
    /// Input stream failed or was exhausted, or output failed
    IoError,
    /// Input token is not an integer
    InvalidInput,
}

impl RuntimeError {
    fn new(kind: ErrorKind, message: String) -> Self {
        RuntimeError {
            kind,
            message,
            node: None,
        }
    }

    pub fn undefined_name(name: &str) -> Self {
        Self::new(ErrorKind::UndefinedName, format!("undefined name: {name}"))
    }

    pub fn not_a_variable(name: &str) -> Self {
        Self::new(
            ErrorKind::NotAVariable,
            format!("`{name}` is a function, not a variable"),
        )
    }

    pub fn not_a_function(name: &str) -> Self {
        Self::new(
            ErrorKind::NotAFunction,
            format!("`{name}` is a variable, not a function"),
        )
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        Self::new(
            ErrorKind::ArityMismatch,
            format!("function {name} expects {expected} argument(s), got {got}"),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero".to_string())
    }

    pub fn unknown_operator(op: impl fmt::Display, position: &str) -> Self {
        Self::new(
            ErrorKind::UnknownOperator,
            format!("`{op}` is not a {position} operator"),
        )
    }

    pub fn unresolved_forward_reference(what: &str) -> Self {
        Self::new(
            ErrorKind::UnresolvedForwardReference,
            format!("forward reference never resolved: {what}"),
        )
    }

    pub fn stack_overflow(limit: usize) -> Self {
        Self::new(
            ErrorKind::StackOverflow,
            format!("stack overflow: call depth exceeded {limit}"),
        )
    }

    pub fn io_error(msg: &str) -> Self {
        Self::new(ErrorKind::IoError, format!("IO error: {msg}"))
    }

    pub fn invalid_input(token: &str) -> Self {
        Self::new(
            ErrorKind::InvalidInput,
            format!("expected an integer on input, got {token:?}"),
        )
    }

    /// Attach the failing node unless a more precise one is already set
    pub fn at(mut self, node: NodeId) -> Self {
        self.node.get_or_insert(node);
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error: {}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;

/// Normal outcome of evaluating a node or a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Fell through; the value of the last instruction (0 when empty)
    Completed(Value),
    /// A `return` is unwinding to the nearest call boundary
    Returning(Value),
}

impl Flow {
    pub fn value(self) -> Value {
        match self {
            Flow::Completed(v) | Flow::Returning(v) => v,
        }
    }
}

/// Outcomes that abort the current instruction
#[derive(Debug)]
pub enum Interrupt {
    /// The called function is declared but its declaration has not been
    /// evaluated yet. The trampoline resolves reachable declarations before
    /// an instruction starts, so this only surfaces for calls it could not see.
    NotReady(NodeId),
    /// A genuine error
    Fail(RuntimeError),
}

impl Interrupt {
    pub fn at(self, node: NodeId) -> Self {
        match self {
            Interrupt::Fail(e) => Interrupt::Fail(e.at(node)),
            other => other,
        }
    }
}

impl From<RuntimeError> for Interrupt {
    fn from(e: RuntimeError) -> Self {
        Interrupt::Fail(e)
    }
}

/// Result of evaluating a node
pub type EvalResult = Result<Flow, Interrupt>;
