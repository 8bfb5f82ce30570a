//! Lowering from the surface AST to the interpreter's arena program
//!
//! Every `if`/`else`/`while` body and bare block gets its own scope, and
//! every function its own body scope enclosed by the scope it is declared
//! in. Functions are hoisted: all functions of a scope are bound before any
//! of its statements is lowered, and become callable when their declaration
//! is evaluated. Assigning to a name that is not visible declares it.
//! Reading a name that is not visible is a `CompileError::Lower`; the
//! interpreter's `UndefinedName` is only reachable from hand-built programs.

use crate::ast::{self, Block, Expr, FuncDef, Span, Spanned, Stmt};
use crate::error::{CompileError, Result};
use crate::interp::{Binding, Node, NodeId, Program, ScopeId, ScopeKind};
use crate::util::{did_you_mean, suggest_name};

const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Build the arena program for `ast`
pub fn lower(ast: &ast::Program) -> Result<Program> {
    let mut lowerer = Lowerer {
        program: Program::new(),
    };
    let root = lowerer.program.root();
    lowerer.lower_stmts(&ast.stmts, root)?;

    let program = lowerer.program;
    tracing::debug!(
        nodes = program.node_count(),
        scopes = program.scopes().len(),
        "lowered program"
    );
    Ok(program)
}

struct Lowerer {
    program: Program,
}

impl Lowerer {
    fn lower_stmts(&mut self, stmts: &[Spanned<Stmt>], scope: ScopeId) -> Result<()> {
        for stmt in stmts {
            if let Stmt::Func(def) = &stmt.node {
                self.hoist(def, scope)?;
            }
        }
        for stmt in stmts {
            self.lower_stmt(stmt, scope)?;
        }
        Ok(())
    }

    /// Bind `def` in `scope` without making it callable yet
    fn hoist(&mut self, def: &FuncDef, scope: ScopeId) -> Result<()> {
        let name = &def.name.node;
        match self.program.scopes().get(scope).get(name) {
            Some(Binding::Func(_)) => {
                return Err(CompileError::lower(
                    format!("function `{name}` is declared twice in the same scope"),
                    def.name.span,
                ));
            }
            Some(Binding::Var(_)) => {
                return Err(CompileError::lower(
                    format!("`{name}` is already a variable in this scope"),
                    def.name.span,
                ));
            }
            None => {}
        }

        let mut params: Vec<String> = Vec::with_capacity(def.params.len());
        for param in &def.params {
            if params.contains(&param.node) {
                return Err(CompileError::lower(
                    format!("duplicate parameter `{}` in function `{name}`", param.node),
                    param.span,
                ));
            }
            params.push(param.node.clone());
        }

        let body = self.program.new_scope(scope, ScopeKind::Function);
        let decl = self.program.add_node(
            Node::FuncDecl {
                name: name.clone(),
                scope,
            },
            def.name.span,
        );
        self.program
            .scopes_mut()
            .insert(scope, name.as_str(), Binding::func(params, body, decl));
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Spanned<Stmt>, scope: ScopeId) -> Result<()> {
        let node = match &stmt.node {
            Stmt::Func(def) => {
                let decl = self.lower_func_body(def, scope)?;
                self.program.push_instruction(scope, decl);
                return Ok(());
            }
            Stmt::Expr(expr) => {
                let id = self.lower_expr(expr, scope)?;
                self.program.push_instruction(scope, id);
                return Ok(());
            }
            Stmt::Print(expr) => Node::Output(self.lower_expr(expr, scope)?),
            Stmt::Return(expr) => Node::Return(self.lower_expr(expr, scope)?),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                let cond = self.lower_expr(cond, scope)?;
                let then_scope = self.lower_block(then_block, scope)?;
                let else_scope = match else_block {
                    Some(block) => Some(self.lower_block(block, scope)?),
                    None => None,
                };
                Node::If {
                    cond,
                    then_scope,
                    else_scope,
                }
            }
            Stmt::While { cond, body } => {
                let cond = self.lower_expr(cond, scope)?;
                let body = self.lower_block(body, scope)?;
                Node::While { cond, body }
            }
            Stmt::Block(block) => Node::Scope(self.lower_block(block, scope)?),
        };
        let id = self.program.add_node(node, stmt.span);
        self.program.push_instruction(scope, id);
        Ok(())
    }

    /// Fill in the body of a hoisted function, returning its declaration node
    fn lower_func_body(&mut self, def: &FuncDef, scope: ScopeId) -> Result<NodeId> {
        let (decl, body, params) = match self.program.scopes().get(scope).get(&def.name.node) {
            Some(Binding::Func(func)) => (func.decl, func.body, func.params.clone()),
            _ => {
                return Err(CompileError::lower(
                    format!("function `{}` was not hoisted", def.name.node),
                    def.name.span,
                ));
            }
        };
        for param in params {
            self.program.scopes_mut().insert(body, param, Binding::var(0));
        }
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.lower_stmts(&def.body.node.stmts, body)
        })?;
        Ok(decl)
    }

    fn lower_block(&mut self, block: &Spanned<Block>, enclosing: ScopeId) -> Result<ScopeId> {
        let scope = self.program.new_scope(enclosing, ScopeKind::Block);
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.lower_stmts(&block.node.stmts, scope)
        })?;
        Ok(scope)
    }

    fn lower_expr(&mut self, expr: &Spanned<Expr>, scope: ScopeId) -> Result<NodeId> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.lower_expr_inner(expr, scope)
        })
    }

    fn lower_expr_inner(&mut self, expr: &Spanned<Expr>, scope: ScopeId) -> Result<NodeId> {
        let node = match &expr.node {
            Expr::IntLit(value) => Node::Num(*value),
            Expr::Var(name) => {
                self.require_visible(name, expr.span, scope)?;
                Node::Var(name.clone())
            }
            Expr::Assign { name, value } => {
                let value = self.lower_expr(value, scope)?;
                if self.program.scopes().resolve(scope, &name.node).is_none() {
                    self.program
                        .scopes_mut()
                        .insert(scope, name.node.as_str(), Binding::var(0));
                }
                Node::Assign {
                    target: name.node.clone(),
                    value,
                }
            }
            Expr::Binary { left, op, right } => {
                let lhs = self.lower_expr(left, scope)?;
                let rhs = self.lower_expr(right, scope)?;
                Node::Binary {
                    op: (*op).into(),
                    lhs,
                    rhs,
                }
            }
            Expr::Unary { op, expr: operand } => Node::Unary {
                op: (*op).into(),
                operand: self.lower_expr(operand, scope)?,
            },
            Expr::Input => Node::Input,
            Expr::Call { func, args } => {
                self.require_visible(&func.node, func.span, scope)?;
                let args = args
                    .iter()
                    .map(|arg| self.lower_expr(arg, scope))
                    .collect::<Result<Vec<_>>>()?;
                Node::Call {
                    func: func.node.clone(),
                    args,
                }
            }
        };
        Ok(self.program.add_node(node, expr.span))
    }

    /// Names must resolve statically; which kind they resolve to is checked at run time
    fn require_visible(&self, name: &str, span: Span, scope: ScopeId) -> Result<()> {
        let scopes = self.program.scopes();
        if scopes.resolve(scope, name).is_some() {
            return Ok(());
        }
        let candidates = scopes.visible_names(scope);
        let hint = did_you_mean(suggest_name(name, &candidates));
        Err(CompileError::lower(format!("undefined name: {name}{hint}"), span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Op;

    fn lower_source(source: &str) -> Result<Program> {
        let tokens = crate::lexer::tokenize(source)?;
        let ast = crate::parser::parse("test.pcl", source, tokens)?;
        lower(&ast)
    }

    fn lower_ok(source: &str) -> Program {
        lower_source(source).expect("lowering should succeed")
    }

    fn lower_err(source: &str) -> CompileError {
        lower_source(source).expect_err("lowering should fail")
    }

    #[test]
    fn test_assignment_declares_in_current_scope() {
        let program = lower_ok("x = 1; print x;");
        let root = program.root();
        assert_eq!(program.scopes().get(root).get("x"), Some(&Binding::Var(0)));
        assert_eq!(program.scopes().get(root).instructions().len(), 2);
        assert!(program.check_ownership().is_ok());
    }

    #[test]
    fn test_assignment_to_outer_name_does_not_redeclare() {
        let program = lower_ok("x = 1; { x = 2; y = 3; }");
        let root = program.root();
        let block = program.scopes().get(root).nested()[0];
        assert!(program.scopes().get(block).get("x").is_none());
        assert_eq!(program.scopes().get(block).get("y"), Some(&Binding::Var(0)));
    }

    #[test]
    fn test_block_locals_are_not_visible_outside() {
        let err = lower_err("if (1) { y = 1; } print y;");
        assert!(err.message().starts_with("undefined name: y"));
    }

    #[test]
    fn test_each_body_gets_a_scope() {
        let program = lower_ok("if (1) { } else { } while (0) { } { }");
        let root = program.root();
        let nested = program.scopes().get(root).nested();
        assert_eq!(nested.len(), 4);
        for &scope in nested {
            assert_eq!(program.scopes().get(scope).kind(), ScopeKind::Block);
            assert_eq!(program.scopes().get(scope).enclosing(), Some(root));
        }
    }

    #[test]
    fn test_functions_are_hoisted_but_not_ready() {
        let program = lower_ok("print f(); f = func() { return g(); } g = func() { return 1; }");
        let root = program.root();
        let f = program
            .scopes()
            .get(root)
            .get("f")
            .and_then(Binding::as_func)
            .expect("f is bound");
        assert!(!f.ready);
        assert_eq!(program.scopes().get(f.body).kind(), ScopeKind::Function);
        assert_eq!(program.scopes().get(f.body).enclosing(), Some(root));

        // print, then the two declarations at their textual positions
        let instructions = program.scopes().get(root).instructions();
        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[1], f.decl);
        assert!(matches!(program.node(f.decl), Node::FuncDecl { name, .. } if name == "f"));
        assert!(program.check_ownership().is_ok());
    }

    #[test]
    fn test_params_are_body_variables() {
        let program = lower_ok("add = func(a, b) { s = a + b; return s; }");
        let root = program.root();
        let body = program
            .scopes()
            .lookup(root, "add")
            .and_then(Binding::as_func)
            .map(|f| f.body)
            .expect("add is bound");
        let names: Vec<&str> = program.scopes().get(body).bindings().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b", "s"]);
        assert!(program.scopes().get(root).get("a").is_none());
    }

    #[test]
    fn test_operators_lowered() {
        let program = lower_ok("x = -1 * 2;");
        let root = program.root();
        let assign = program.scopes().get(root).instructions()[0];
        let Node::Assign { value, .. } = program.node(assign) else {
            panic!("expected assignment");
        };
        let Node::Binary { op, lhs, .. } = program.node(*value) else {
            panic!("expected binary");
        };
        assert_eq!(*op, Op::Mul);
        assert!(matches!(program.node(*lhs), Node::Unary { op: Op::Sub, .. }));
    }

    #[test]
    fn test_duplicate_function_rejected() {
        let err = lower_err("f = func() { return 1; } f = func() { return 2; }");
        assert!(err.message().contains("declared twice"));
    }

    #[test]
    fn test_same_name_in_nested_scope_allowed() {
        let program = lower_ok("f = func() { return 1; } { f = func() { return 2; } }");
        assert!(program.check_ownership().is_ok());
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let source = "f = func(a, a) { return a; }";
        let err = lower_err(source);
        assert!(err.message().contains("duplicate parameter `a`"));
        // the second `a`
        assert_eq!(err.span(), Some(Span::new(12, 13)));
        assert_eq!(&source[12..13], "a");
    }

    #[test]
    fn test_function_named_like_parameter_rejected() {
        let err = lower_err("f = func(g) { g = func() { return 0; } return g; }");
        assert!(err.message().contains("already a variable"));
    }

    #[test]
    fn test_undefined_name_has_suggestion() {
        let err = lower_err("counter = 1; print countr;");
        assert_eq!(err.message(), "undefined name: countr (did you mean `counter`?)");
    }

    #[test]
    fn test_undefined_function_rejected() {
        let err = lower_err("print nope(1);");
        assert!(err.message().starts_with("undefined name: nope"));
    }

    #[test]
    fn test_self_reference_in_initializer_rejected() {
        assert!(lower_err("x = x + 1;").message().starts_with("undefined name: x"));
    }
}
