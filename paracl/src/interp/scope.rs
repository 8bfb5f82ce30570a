//! Scopes (symbol tables) and the arena that owns them
//!
//! Every scope is created once while the program is built and lives as long
//! as the [`Scopes`] arena. Lookup walks the `enclosing` chain outward.
//! A function has exactly one body scope, so calls do not allocate frames:
//! the call protocol snapshots the `Var` values of the body (and the block
//! scopes nested in it), binds arguments in place, and restores afterwards.

use super::node::NodeId;
use super::value::{Binding, Value};
use std::collections::BTreeMap;

/// Index of a scope in the [`Scopes`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) usize);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// What created a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Program root
    Global,
    /// `if`/`else`/`while` body or a bare `{ ... }`
    Block,
    /// Function body
    Function,
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeKind::Global => write!(f, "global"),
            ScopeKind::Block => write!(f, "block"),
            ScopeKind::Function => write!(f, "function"),
        }
    }
}

/// A symbol table plus the instructions that run inside it
#[derive(Debug)]
pub struct Scope {
    bindings: BTreeMap<String, Binding>,
    enclosing: Option<ScopeId>,
    kind: ScopeKind,
    instructions: Vec<NodeId>,
    /// Scopes whose `enclosing` is this one
    nested: Vec<ScopeId>,
}

/// Saved `Var` values of one scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    values: Vec<(String, Value)>,
}

/// Saved `Var` values of a function body and its nested block scopes
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    scopes: Vec<(ScopeId, Snapshot)>,
}

impl Scope {
    fn new(enclosing: Option<ScopeId>, kind: ScopeKind) -> Self {
        Scope {
            bindings: BTreeMap::new(),
            enclosing,
            kind,
            instructions: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Insert or overwrite a binding, returning the one it replaced
    pub fn insert(&mut self, name: impl Into<String>, binding: Binding) -> Option<Binding> {
        self.bindings.insert(name.into(), binding)
    }

    /// Local lookup only
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.bindings.get_mut(name)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn enclosing(&self) -> Option<ScopeId> {
        self.enclosing
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn instructions(&self) -> &[NodeId] {
        &self.instructions
    }

    pub fn nested(&self) -> &[ScopeId] {
        &self.nested
    }

    /// Copy every `Var` value; functions are structural and left out
    pub fn snapshot(&self) -> Snapshot {
        let values = self
            .bindings
            .iter()
            .filter_map(|(name, binding)| binding.as_var().map(|v| (name.clone(), v)))
            .collect();
        Snapshot { values }
    }

    /// Write saved values back into existing `Var`s. Which names exist is untouched.
    pub fn restore(&mut self, snapshot: Snapshot) {
        for (name, saved) in snapshot.values {
            if let Some(Binding::Var(value)) = self.bindings.get_mut(&name) {
                *value = saved;
            }
        }
    }
}

/// Arena owning every scope of a program. Index 0 is the global scope.
#[derive(Debug)]
pub struct Scopes {
    scopes: Vec<Scope>,
}

impl Scopes {
    pub fn new() -> Self {
        Scopes {
            scopes: vec![Scope::new(None, ScopeKind::Global)],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Create a scope lexically nested in `enclosing`
    pub fn push(&mut self, enclosing: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(Some(enclosing), kind));
        self.scopes[enclosing.0].nested.push(id);
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    pub fn insert(&mut self, id: ScopeId, name: impl Into<String>, binding: Binding) -> Option<Binding> {
        self.get_mut(id).insert(name, binding)
    }

    pub fn push_instruction(&mut self, id: ScopeId, node: NodeId) {
        self.get_mut(id).instructions.push(node);
    }

    /// Scope in the chain starting at `from` that binds `name`
    pub fn resolve(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.get(id);
            if scope.bindings.contains_key(name) {
                return Some(id);
            }
            current = scope.enclosing;
        }
        None
    }

    /// Look `name` up from `from` outward
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<&Binding> {
        self.resolve(from, name).and_then(|id| self.get(id).get(name))
    }

    pub fn lookup_mut(&mut self, from: ScopeId, name: &str) -> Option<&mut Binding> {
        let id = self.resolve(from, name)?;
        self.get_mut(id).get_mut(name)
    }

    /// Every name visible from `from`, innermost first
    pub fn visible_names(&self, from: ScopeId) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.get(id);
            names.extend(scope.bindings.keys().map(String::as_str));
            current = scope.enclosing;
        }
        names
    }

    /// The function body plus all block scopes nested in it, stopping at
    /// nested function bodies (those carry their own frames)
    pub fn frame(&self, body: ScopeId) -> Vec<ScopeId> {
        let mut frame = Vec::new();
        let mut stack = vec![body];
        while let Some(id) = stack.pop() {
            frame.push(id);
            stack.extend(
                self.get(id)
                    .nested
                    .iter()
                    .copied()
                    .filter(|&child| self.get(child).kind == ScopeKind::Block),
            );
        }
        frame
    }

    pub fn snapshot_frame(&self, body: ScopeId) -> FrameSnapshot {
        let scopes = self
            .frame(body)
            .into_iter()
            .map(|id| (id, self.get(id).snapshot()))
            .collect();
        FrameSnapshot { scopes }
    }

    pub fn restore_frame(&mut self, saved: FrameSnapshot) {
        for (id, snapshot) in saved.scopes {
            self.get_mut(id).restore(snapshot);
        }
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}
