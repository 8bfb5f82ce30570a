//! Arena syntax tree consumed by the interpreter
//!
//! Nodes refer to their children by [`NodeId`] and to the scopes they own by
//! [`ScopeId`]. The tree is built once and never restructured; evaluation only
//! changes binding values. Dropping a [`Program`] frees flat vectors, so
//! teardown never recurses however deep the tree is, and every traversal in
//! this module uses an explicit work stack.

use super::scope::{ScopeId, ScopeKind, Scopes};
use super::value::{Binding, Value};
use crate::ast::{BinOp, Span, UnOp};
use std::collections::HashSet;
use std::fmt;

/// Index of a node in a [`Program`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Operator symbol, shared by unary and binary nodes.
///
/// `Add`, `Sub` and `Not` are the valid unary operators; every operator but
/// `Not` is a valid binary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::And => "&&",
            Op::Or => "||",
            Op::Not => "!",
        };
        f.write_str(symbol)
    }
}

impl From<BinOp> for Op {
    fn from(op: BinOp) -> Self {
        match op {
            BinOp::Add => Op::Add,
            BinOp::Sub => Op::Sub,
            BinOp::Mul => Op::Mul,
            BinOp::Div => Op::Div,
            BinOp::Mod => Op::Mod,
            BinOp::Eq => Op::Eq,
            BinOp::Ne => Op::Ne,
            BinOp::Lt => Op::Lt,
            BinOp::Le => Op::Le,
            BinOp::Gt => Op::Gt,
            BinOp::Ge => Op::Ge,
            BinOp::And => Op::And,
            BinOp::Or => Op::Or,
        }
    }
}

impl From<UnOp> for Op {
    fn from(op: UnOp) -> Self {
        match op {
            UnOp::Plus => Op::Add,
            UnOp::Neg => Op::Sub,
            UnOp::Not => Op::Not,
        }
    }
}

/// Evaluator node. Each evaluates to a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Integer literal
    Num(Value),
    /// Read the current binding of a variable
    Var(String),
    /// Store into an existing variable, yields the stored value
    Assign { target: String, value: NodeId },
    /// Both operands are always evaluated, left first
    Binary { op: Op, lhs: NodeId, rhs: NodeId },
    Unary { op: Op, operand: NodeId },
    /// Read one integer from the input stream
    Input,
    /// Write a value to the output sink, yields it
    Output(NodeId),
    If {
        cond: NodeId,
        then_scope: ScopeId,
        else_scope: Option<ScopeId>,
    },
    /// Always yields 0
    While { cond: NodeId, body: ScopeId },
    Call { func: String, args: Vec<NodeId> },
    Return(NodeId),
    /// Nested block
    Scope(ScopeId),
    /// Marks the function `name` bound in `scope` as callable
    FuncDecl { name: String, scope: ScopeId },
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Num(v) => write!(f, "num {v}"),
            Node::Var(name) => write!(f, "var {name}"),
            Node::Assign { target, .. } => write!(f, "assign {target}"),
            Node::Binary { op, .. } => write!(f, "binary {op}"),
            Node::Unary { op, .. } => write!(f, "unary {op}"),
            Node::Input => write!(f, "input"),
            Node::Output(_) => write!(f, "output"),
            Node::If { else_scope, .. } => {
                if else_scope.is_some() {
                    write!(f, "if-else")
                } else {
                    write!(f, "if")
                }
            }
            Node::While { .. } => write!(f, "while"),
            Node::Call { func, args } => write!(f, "call {func}/{}", args.len()),
            Node::Return(_) => write!(f, "return"),
            Node::Scope(_) => write!(f, "block"),
            Node::FuncDecl { name, .. } => write!(f, "declare {name}"),
        }
    }
}

/// Something with exactly one owner in the program tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owned {
    Node(NodeId),
    Scope(ScopeId),
}

impl Node {
    /// Owned children in evaluation order
    pub fn children(&self) -> Vec<Owned> {
        match self {
            Node::Num(_) | Node::Var(_) | Node::Input | Node::FuncDecl { .. } => Vec::new(),
            Node::Assign { value, .. } => vec![Owned::Node(*value)],
            Node::Binary { lhs, rhs, .. } => vec![Owned::Node(*lhs), Owned::Node(*rhs)],
            Node::Unary { operand, .. } => vec![Owned::Node(*operand)],
            Node::Output(expr) | Node::Return(expr) => vec![Owned::Node(*expr)],
            Node::If {
                cond,
                then_scope,
                else_scope,
            } => {
                let mut children = vec![Owned::Node(*cond), Owned::Scope(*then_scope)];
                children.extend(else_scope.map(Owned::Scope));
                children
            }
            Node::While { cond, body } => vec![Owned::Node(*cond), Owned::Scope(*body)],
            Node::Call { args, .. } => args.iter().copied().map(Owned::Node).collect(),
            Node::Scope(scope) => vec![Owned::Scope(*scope)],
        }
    }
}

/// A complete program: node arena, source spans and scope arena
#[derive(Debug)]
pub struct Program {
    nodes: Vec<Node>,
    spans: Vec<Span>,
    scopes: Scopes,
}

impl Program {
    pub fn new() -> Self {
        Program {
            nodes: Vec::new(),
            spans: Vec::new(),
            scopes: Scopes::new(),
        }
    }

    pub fn root(&self) -> ScopeId {
        self.scopes.root()
    }

    pub fn add_node(&mut self, node: Node, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.spans.push(span);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.spans[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    pub fn scopes_mut(&mut self) -> &mut Scopes {
        &mut self.scopes
    }

    pub fn new_scope(&mut self, enclosing: ScopeId, kind: ScopeKind) -> ScopeId {
        self.scopes.push(enclosing, kind)
    }

    pub fn push_instruction(&mut self, scope: ScopeId, node: NodeId) {
        self.scopes.push_instruction(scope, node);
    }

    /// Read-only nodes alongside mutable scopes, for the interpreter
    pub(crate) fn split_mut(&mut self) -> (&[Node], &mut Scopes) {
        (&self.nodes, &mut self.scopes)
    }

    /// A scope owns the bodies of the functions it binds and its instructions
    fn owned_by(&self, owner: Owned) -> Vec<Owned> {
        match owner {
            Owned::Node(id) => self.node(id).children(),
            Owned::Scope(id) => {
                let scope = self.scopes.get(id);
                let bodies = scope
                    .bindings()
                    .filter_map(|(_, b)| b.as_func().map(|f| Owned::Scope(f.body)));
                let instructions = scope.instructions().iter().copied().map(Owned::Node);
                bodies.chain(instructions).collect()
            }
        }
    }

    /// Pre-order traversal with depth. Each item is visited at most once.
    pub fn walk(&self, start: Owned) -> Vec<(Owned, usize)> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![(start, 0)];
        while let Some((item, depth)) = stack.pop() {
            if !seen.insert(item) {
                continue;
            }
            order.push((item, depth));
            let children = self.owned_by(item);
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }
        order
    }

    /// Verify that every node and scope is owned exactly once, starting from
    /// the global scope
    pub fn check_ownership(&self) -> Result<(), String> {
        let mut node_owned = vec![false; self.nodes.len()];
        let mut scope_owned = vec![false; self.scopes.len()];
        let mut stack = vec![Owned::Scope(self.root())];

        while let Some(item) = stack.pop() {
            let slot = match item {
                Owned::Node(id) => node_owned.get_mut(id.0),
                Owned::Scope(id) => scope_owned.get_mut(id.0),
            };
            match slot {
                None => return Err(format!("{item:?} does not exist")),
                Some(true) => return Err(format!("{item:?} has more than one owner")),
                Some(flag) => *flag = true,
            }
            stack.extend(self.owned_by(item));
        }

        if let Some(id) = node_owned.iter().position(|owned| !owned) {
            return Err(format!("{} is not owned by anything", NodeId(id)));
        }
        if let Some(id) = scope_owned.iter().position(|owned| !owned) {
            return Err(format!("{} is not owned by anything", ScopeId(id)));
        }
        Ok(())
    }

    /// Indented rendering of the whole tree
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (item, depth) in self.walk(Owned::Scope(self.root())) {
            let indent = "  ".repeat(depth);
            match item {
                Owned::Node(id) => out.push_str(&format!("{indent}{}\n", self.node(id))),
                Owned::Scope(id) => {
                    let scope = self.scopes.get(id);
                    let names: Vec<String> = scope
                        .bindings()
                        .map(|(name, binding)| match binding {
                            Binding::Var(_) => name.to_string(),
                            Binding::Func(f) => format!("{name}({})", f.params.join(", ")),
                        })
                        .collect();
                    out.push_str(&format!("{indent}{id} {} [{}]\n", scope.kind(), names.join(", ")));
                }
            }
        }
        out
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
