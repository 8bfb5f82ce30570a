//! Tree-walking evaluator

use super::error::{EvalResult, Flow, InterpResult, Interrupt, RuntimeError};
use super::node::{Node, NodeId, Op, Owned, Program};
use super::scope::{ScopeId, Scopes};
use super::value::{is_truthy, Binding, Value};
use std::collections::{HashSet, VecDeque};
use std::io::{BufRead, Write};

/// Stack growth parameters for deeply nested expressions and recursion
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Interpreter limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Deepest allowed chain of active calls
    pub max_call_depth: usize,
    /// Forward-reference retries allowed for one top-level instruction
    pub max_forward_retries: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            max_call_depth: 100_000,
            max_forward_retries: 1_024,
        }
    }
}

/// Whitespace-separated integer reader
struct Input<R> {
    reader: R,
    tokens: VecDeque<String>,
}

impl<R: BufRead> Input<R> {
    fn new(reader: R) -> Self {
        Input {
            reader,
            tokens: VecDeque::new(),
        }
    }

    fn next_value(&mut self) -> InterpResult<Value> {
        loop {
            if let Some(token) = self.tokens.pop_front() {
                return token
                    .parse::<Value>()
                    .map_err(|_| RuntimeError::invalid_input(&token));
            }
            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|e| RuntimeError::io_error(&e.to_string()))?;
            if read == 0 {
                return Err(RuntimeError::io_error("unexpected end of input"));
            }
            self.tokens
                .extend(line.split_whitespace().map(str::to_string));
        }
    }
}

/// Unwrap a completed operand, or pass a `return` straight up
macro_rules! operand {
    ($flow:expr) => {
        match $flow? {
            Flow::Completed(value) => value,
            returning @ Flow::Returning(_) => return Ok(returning),
        }
    };
}

/// The interpreter
///
/// Borrows the program's nodes immutably and its scopes mutably: evaluation
/// only ever changes binding values.
pub struct Interpreter<'p, R, W> {
    nodes: &'p [Node],
    scopes: &'p mut Scopes,
    root: ScopeId,
    input: Input<R>,
    output: W,
    config: EvalConfig,
    /// Active calls
    depth: usize,
    /// Instructions whose reachable declarations were all evaluated;
    /// readiness is never reset, so they need no further scan
    resolved: HashSet<NodeId>,
}

impl<'p, R: BufRead, W: Write> Interpreter<'p, R, W> {
    pub fn new(program: &'p mut Program, input: R, output: W) -> Self {
        let root = program.root();
        let (nodes, scopes) = program.split_mut();
        Interpreter {
            nodes,
            scopes,
            root,
            input: Input::new(input),
            output,
            config: EvalConfig::default(),
            depth: 0,
            resolved: HashSet::new(),
        }
    }

    pub fn with_config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the global scope. A top-level `return` ends the program with its value.
    pub fn run(&mut self) -> InterpResult<Value> {
        match self.run_scope(self.root) {
            Ok(flow) => Ok(flow.value()),
            Err(Interrupt::Fail(e)) => Err(e),
            Err(Interrupt::NotReady(node)) => Err(RuntimeError::unresolved_forward_reference(
                &self.nodes[node.index()].to_string(),
            )
            .at(node)),
        }
    }

    /// Evaluate a node with automatic stack growth for deep trees
    fn eval(&mut self, id: NodeId, scope: ScopeId) -> EvalResult {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(id, scope))
            .map_err(|interrupt| interrupt.at(id))
    }

    fn eval_inner(&mut self, id: NodeId, scope: ScopeId) -> EvalResult {
        let nodes = self.nodes;
        match &nodes[id.index()] {
            Node::Num(value) => Ok(Flow::Completed(*value)),

            Node::Var(name) => match self.scopes.lookup(scope, name) {
                Some(Binding::Var(value)) => Ok(Flow::Completed(*value)),
                Some(Binding::Func(_)) => Err(RuntimeError::not_a_variable(name).into()),
                None => Err(RuntimeError::undefined_name(name).into()),
            },

            Node::Assign { target, value } => {
                let value = operand!(self.eval(*value, scope));
                match self.scopes.lookup_mut(scope, target) {
                    Some(Binding::Var(cell)) => {
                        *cell = value;
                        Ok(Flow::Completed(value))
                    }
                    Some(Binding::Func(_)) => Err(RuntimeError::not_a_variable(target).into()),
                    None => Err(RuntimeError::undefined_name(target).into()),
                }
            }

            // Both sides are always evaluated; `&&` and `||` do not short-circuit
            Node::Binary { op, lhs, rhs } => {
                let left = operand!(self.eval(*lhs, scope));
                let right = operand!(self.eval(*rhs, scope));
                Ok(Flow::Completed(binary(*op, left, right)?))
            }

            Node::Unary { op, operand } => {
                let value = operand!(self.eval(*operand, scope));
                Ok(Flow::Completed(unary(*op, value)?))
            }

            Node::Input => Ok(Flow::Completed(self.input.next_value()?)),

            Node::Output(expr) => {
                let value = operand!(self.eval(*expr, scope));
                writeln!(self.output, "{value}")
                    .map_err(|e| RuntimeError::io_error(&e.to_string()))?;
                Ok(Flow::Completed(value))
            }

            Node::If {
                cond,
                then_scope,
                else_scope,
            } => {
                let cond = operand!(self.eval(*cond, scope));
                if is_truthy(cond) {
                    self.run_scope(*then_scope)
                } else if let Some(else_scope) = else_scope {
                    self.run_scope(*else_scope)
                } else {
                    Ok(Flow::Completed(0))
                }
            }

            Node::While { cond, body } => {
                loop {
                    let cond = operand!(self.eval(*cond, scope));
                    if !is_truthy(cond) {
                        break;
                    }
                    if let Flow::Returning(value) = self.run_scope(*body)? {
                        return Ok(Flow::Returning(value));
                    }
                }
                Ok(Flow::Completed(0))
            }

            Node::Call { func, args } => self.call(func, args, scope),

            Node::Return(expr) => {
                let value = operand!(self.eval(*expr, scope));
                Ok(Flow::Returning(value))
            }

            Node::Scope(inner) => self.run_scope(*inner),

            Node::FuncDecl {
                name,
                scope: declaring,
            } => match self.scopes.get_mut(*declaring).get_mut(name) {
                Some(Binding::Func(func)) => {
                    if !func.ready {
                        tracing::debug!(function = %name, "function declared");
                    }
                    func.ready = true;
                    Ok(Flow::Completed(0))
                }
                Some(Binding::Var(_)) => Err(RuntimeError::not_a_function(name).into()),
                None => Err(RuntimeError::undefined_name(name).into()),
            },
        }
    }

    /// Run a scope's instructions through the forward-reference trampoline.
    ///
    /// Each instruction gets its own pending stack. Before an instruction
    /// runs, every declaration it can reach that has not been evaluated yet
    /// is pushed above it and evaluated first, so nothing is executed twice.
    /// A `NotReady` raised during evaluation is handled the same way. A
    /// blocker that is already pending means the references form a cycle.
    fn run_scope(&mut self, scope: ScopeId) -> EvalResult {
        tracing::trace!(%scope, kind = %self.scopes.get(scope).kind(), "entering scope");
        let mut last = 0;
        let count = self.scopes.get(scope).instructions().len();

        for index in 0..count {
            let instruction = self.scopes.get(scope).instructions()[index];
            let mut pending = vec![instruction];
            let mut retries = 0;

            while let Some(&top) = pending.last() {
                if !self.resolved.contains(&top) {
                    let blockers = self.unready_decls(top, scope);
                    if !blockers.is_empty() {
                        for blocker in blockers.into_iter().rev() {
                            self.defer(&mut pending, &mut retries, blocker, top)?;
                        }
                        continue;
                    }
                    self.resolved.insert(top);
                }

                match self.eval(top, scope) {
                    Ok(Flow::Completed(value)) => {
                        pending.pop();
                        if pending.is_empty() {
                            last = value;
                        }
                    }
                    Ok(returning @ Flow::Returning(_)) => return Ok(returning),
                    Err(Interrupt::NotReady(blocker)) => {
                        self.defer(&mut pending, &mut retries, blocker, top)?;
                    }
                    Err(fail) => return Err(fail),
                }
            }
        }
        Ok(Flow::Completed(last))
    }

    /// Schedule `blocker` to be evaluated before `top`
    fn defer(
        &self,
        pending: &mut Vec<NodeId>,
        retries: &mut usize,
        blocker: NodeId,
        top: NodeId,
    ) -> Result<(), Interrupt> {
        if pending.contains(&blocker) || *retries >= self.config.max_forward_retries {
            let what = format!(
                "{} needed by {}",
                self.nodes[blocker.index()],
                self.nodes[top.index()]
            );
            return Err(RuntimeError::unresolved_forward_reference(&what)
                .at(top)
                .into());
        }
        *retries += 1;
        tracing::debug!(%blocker, retry = *retries, "forward reference, evaluating blocker first");
        pending.push(blocker);
        Ok(())
    }

    /// Declarations of functions that `node` may call, directly or through
    /// the bodies of the functions it calls, that have not been evaluated yet.
    /// Names are resolved from the scope each call sits in.
    fn unready_decls(&self, node: NodeId, scope: ScopeId) -> Vec<NodeId> {
        let mut decls = Vec::new();
        let mut bodies = HashSet::new();
        let mut stack = vec![(Owned::Node(node), scope)];

        while let Some((item, context)) = stack.pop() {
            match item {
                Owned::Scope(id) => {
                    let instructions = self.scopes.get(id).instructions();
                    stack.extend(instructions.iter().rev().map(|&n| (Owned::Node(n), id)));
                }
                Owned::Node(id) => {
                    let node = &self.nodes[id.index()];
                    if let Node::Call { func, .. } = node {
                        if let Some(Binding::Func(f)) = self.scopes.lookup(context, func) {
                            if !f.ready && !decls.contains(&f.decl) {
                                decls.push(f.decl);
                            }
                            if bodies.insert(f.body) {
                                stack.push((Owned::Scope(f.body), f.body));
                            }
                        }
                    }
                    stack.extend(node.children().into_iter().rev().map(|child| (child, context)));
                }
            }
        }
        decls
    }

    /// Run a function body. Declarations it needs were resolved by the
    /// trampoline that started the call.
    fn run_body(&mut self, body: ScopeId) -> EvalResult {
        let mut last = 0;
        let count = self.scopes.get(body).instructions().len();
        for index in 0..count {
            let instruction = self.scopes.get(body).instructions()[index];
            match self.eval(instruction, body)? {
                Flow::Completed(value) => last = value,
                returning @ Flow::Returning(_) => return Ok(returning),
            }
        }
        Ok(Flow::Completed(last))
    }

    /// Call protocol: check, evaluate arguments, snapshot the frame, bind,
    /// run the body, restore the frame whatever the outcome.
    fn call(&mut self, name: &str, args: &[NodeId], scope: ScopeId) -> EvalResult {
        let func = match self.scopes.lookup(scope, name) {
            Some(Binding::Func(func)) => func.clone(),
            Some(Binding::Var(_)) => return Err(RuntimeError::not_a_function(name).into()),
            None => return Err(RuntimeError::undefined_name(name).into()),
        };

        if func.params.len() != args.len() {
            return Err(RuntimeError::arity_mismatch(name, func.params.len(), args.len()).into());
        }

        if !func.ready {
            tracing::debug!(function = name, decl = %func.decl, "called before its declaration");
            return Err(Interrupt::NotReady(func.decl));
        }

        let mut values = Vec::with_capacity(args.len());
        for &arg in args {
            values.push(operand!(self.eval(arg, scope)));
        }

        if self.depth >= self.config.max_call_depth {
            return Err(RuntimeError::stack_overflow(self.config.max_call_depth).into());
        }

        let saved = self.scopes.snapshot_frame(func.body);
        for (param, value) in func.params.iter().zip(values) {
            self.scopes
                .insert(func.body, param.as_str(), Binding::var(value));
        }

        self.depth += 1;
        tracing::debug!(function = name, depth = self.depth, "call");
        let result = self.run_body(func.body);
        self.depth -= 1;

        self.scopes.restore_frame(saved);
        result.map(|flow| Flow::Completed(flow.value()))
    }
}

fn binary(op: Op, left: Value, right: Value) -> InterpResult<Value> {
    let value = match op {
        Op::Add => left.wrapping_add(right),
        Op::Sub => left.wrapping_sub(right),
        Op::Mul => left.wrapping_mul(right),
        Op::Div => {
            if right == 0 {
                return Err(RuntimeError::division_by_zero());
            }
            left.wrapping_div(right)
        }
        Op::Mod => {
            if right == 0 {
                return Err(RuntimeError::division_by_zero());
            }
            left.wrapping_rem(right)
        }
        Op::Eq => Value::from(left == right),
        Op::Ne => Value::from(left != right),
        Op::Lt => Value::from(left < right),
        Op::Le => Value::from(left <= right),
        Op::Gt => Value::from(left > right),
        Op::Ge => Value::from(left >= right),
        Op::And => Value::from(is_truthy(left) && is_truthy(right)),
        Op::Or => Value::from(is_truthy(left) || is_truthy(right)),
        Op::Not => return Err(RuntimeError::unknown_operator(op, "binary")),
    };
    Ok(value)
}

fn unary(op: Op, value: Value) -> InterpResult<Value> {
    match op {
        Op::Add => Ok(value),
        Op::Sub => Ok(value.wrapping_neg()),
        Op::Not => Ok(Value::from(!is_truthy(value))),
        _ => Err(RuntimeError::unknown_operator(op, "unary")),
    }
}

/// Run `program` reading from `input` and writing to `output`
pub fn run<R: BufRead, W: Write>(program: &mut Program, input: R, output: W) -> InterpResult<Value> {
    Interpreter::new(program, input, output).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::interp::error::ErrorKind;
    use crate::interp::scope::ScopeKind;

    fn at() -> Span {
        Span::new(0, 0)
    }

    /// Lex, parse, lower and run `source`, returning the result and the output
    fn run_source(source: &str, input: &str) -> (InterpResult<Value>, String) {
        run_source_with(source, input, EvalConfig::default())
    }

    fn run_source_with(source: &str, input: &str, config: EvalConfig) -> (InterpResult<Value>, String) {
        let tokens = crate::lexer::tokenize(source).expect("lexing should succeed");
        let ast = crate::parser::parse("test.pcl", source, tokens).expect("parsing should succeed");
        let mut program = crate::lower::lower(&ast).expect("lowering should succeed");
        let mut output = Vec::new();
        let result = Interpreter::new(&mut program, input.as_bytes(), &mut output)
            .with_config(config)
            .run();
        (result, String::from_utf8(output).expect("output is utf-8"))
    }

    fn error_kind(source: &str) -> ErrorKind {
        run_source(source, "").0.unwrap_err().kind
    }

    #[test]
    fn test_arithmetic_and_print() {
        let (result, output) = run_source("print 1 + 2 * 3; print (1 + 2) * 3; print 7 / 2; print -7 % 3;", "");
        assert_eq!(result.unwrap(), -1);
        assert_eq!(output, "7\n9\n3\n-1\n");
    }

    #[test]
    fn test_comparisons_and_logic_yield_zero_or_one() {
        let (_, output) = run_source("print 3 < 4; print 3 >= 4; print 2 && 5; print 0 || 0; print !7;", "");
        assert_eq!(output, "1\n0\n1\n0\n0\n");
    }

    #[test]
    fn test_arithmetic_wraps() {
        let (_, output) = run_source("x = 9223372036854775807; print x + 1;", "");
        assert_eq!(output, "-9223372036854775808\n");
    }

    #[test]
    fn test_logic_evaluates_both_operands() {
        let (_, output) = run_source("x = 0; y = 0 && (x = 5); print x; z = 1 || (x = 6); print x;", "");
        assert_eq!(output, "5\n6\n");
    }

    #[test]
    fn test_factorial_restores_outer_binding() {
        let source = "
            n = 42;
            fact = func(n) {
                if (n <= 1) { return 1; }
                return n * fact(n - 1);
            }
            print fact(5);
            print n;
        ";
        let (result, output) = run_source(source, "");
        assert!(result.is_ok());
        assert_eq!(output, "120\n42\n");
    }

    #[test]
    fn test_recursion_does_not_clobber_caller_locals() {
        let source = "
            sum = func(n) {
                if (n == 0) { return 0; }
                t = n;
                r = sum(n - 1);
                return t + r;
            }
            print sum(10);
        ";
        let (_, output) = run_source(source, "");
        assert_eq!(output, "55\n");
    }

    #[test]
    fn test_forward_reference_resolves() {
        let source = "
            g = func() { return f() + 1; }
            print g();
            f = func() { return 41; }
        ";
        let (result, output) = run_source(source, "");
        assert!(result.is_ok());
        assert_eq!(output, "42\n");
    }

    #[test]
    fn test_forward_reference_without_retries_fails() {
        let source = "
            print f();
            f = func() { return 1; }
        ";
        let config = EvalConfig {
            max_forward_retries: 0,
            ..EvalConfig::default()
        };
        let (result, output) = run_source_with(source, "", config);
        assert_eq!(result.unwrap_err().kind, ErrorKind::UnresolvedForwardReference);
        assert_eq!(output, "");
    }

    #[test]
    fn test_forward_reference_does_not_repeat_output() {
        let source = "
            g = func() { print 5; return f(); }
            print g();
            f = func() { return 1; }
        ";
        let (result, output) = run_source(source, "");
        assert!(result.is_ok());
        assert_eq!(output, "5\n1\n");
    }

    #[test]
    fn test_forward_reference_reads_input_once() {
        let source = "
            g = func(a) { return f() + a; }
            print g(?);
            f = func() { return 1; }
        ";
        let (result, output) = run_source(source, "5 7");
        assert!(result.is_ok());
        assert_eq!(output, "6\n");
    }

    #[test]
    fn test_forward_reference_assigns_once() {
        let source = "
            x = 0;
            print (x = x + 1) + f();
            print x;
            f = func() { return 10; }
        ";
        let (_, output) = run_source(source, "");
        assert_eq!(output, "11\n1\n");
    }

    #[test]
    fn test_forward_reference_inside_function_block() {
        let source = "
            h = func() {
                r = 0;
                { print 1; r = k(); k = func() { return 7; } }
                return r;
            }
            print h();
        ";
        let (result, output) = run_source(source, "");
        assert!(result.is_ok());
        assert_eq!(output, "1\n7\n");
    }

    #[test]
    fn test_mutual_recursion() {
        let source = "
            even = func(n) { if (n == 0) { return 1; } return odd(n - 1); }
            odd = func(n) { if (n == 0) { return 0; } return even(n - 1); }
            print even(4);
            print odd(4);
        ";
        let (_, output) = run_source(source, "");
        assert_eq!(output, "1\n0\n");
    }

    #[test]
    fn test_arity_mismatch_binds_nothing() {
        for call in ["add(1)", "add(1, 2, 3)"] {
            let source = format!(
                "a = 7; add = func(a, b) {{ return a + b; }} print {call};"
            );
            let tokens = crate::lexer::tokenize(&source).unwrap();
            let ast = crate::parser::parse("test.pcl", &source, tokens).unwrap();
            let mut program = crate::lower::lower(&ast).unwrap();
            let mut output = Vec::new();
            let err = run(&mut program, "".as_bytes(), &mut output).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ArityMismatch);

            let root = program.root();
            let body = program
                .scopes()
                .lookup(root, "add")
                .and_then(Binding::as_func)
                .map(|f| f.body)
                .unwrap();
            assert_eq!(program.scopes().get(body).get("a"), Some(&Binding::Var(0)));
            assert_eq!(program.scopes().get(body).get("b"), Some(&Binding::Var(0)));
            assert_eq!(program.scopes().get(root).get("a"), Some(&Binding::Var(7)));
        }
    }

    #[test]
    fn test_return_in_nested_if_stops_function() {
        let source = "
            f = func(x) {
                if (x > 0) {
                    if (x > 10) { return 100; }
                    return 1;
                }
                print 999;
                return 0;
            }
            print f(50);
            print f(5);
        ";
        let (_, output) = run_source(source, "");
        assert_eq!(output, "100\n1\n");
    }

    #[test]
    fn test_return_inside_while_leaves_loop() {
        let source = "
            first_over = func(limit) {
                i = 0;
                while (1) {
                    i = i + 1;
                    if (i * i > limit) { return i; }
                }
            }
            print first_over(50);
        ";
        let (_, output) = run_source(source, "");
        assert_eq!(output, "8\n");
    }

    #[test]
    fn test_failed_call_restores_frame() {
        let source = "
            f = func(n) {
                t = n;
                if (n == 0) { return 1 / n; }
                return f(n - 1);
            }
            print f(3);
        ";
        let tokens = crate::lexer::tokenize(source).unwrap();
        let ast = crate::parser::parse("test.pcl", source, tokens).unwrap();
        let mut program = crate::lower::lower(&ast).unwrap();
        let err = run(&mut program, "".as_bytes(), Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);

        let root = program.root();
        let body = program
            .scopes()
            .lookup(root, "f")
            .and_then(Binding::as_func)
            .map(|f| f.body)
            .unwrap();
        assert_eq!(program.scopes().get(body).get("n"), Some(&Binding::Var(0)));
        assert_eq!(program.scopes().get(body).get("t"), Some(&Binding::Var(0)));
    }

    #[test]
    fn test_division_and_modulo_by_zero() {
        assert_eq!(error_kind("x = 0; print 1 / x;"), ErrorKind::DivisionByZero);
        assert_eq!(error_kind("x = 0; print 1 % x;"), ErrorKind::DivisionByZero);
    }

    #[test]
    fn test_error_carries_failing_node() {
        let source = "x = 0;\nprint 10 / x;";
        let tokens = crate::lexer::tokenize(source).unwrap();
        let ast = crate::parser::parse("test.pcl", source, tokens).unwrap();
        let mut program = crate::lower::lower(&ast).unwrap();
        let err = run(&mut program, "".as_bytes(), Vec::new()).unwrap_err();
        let node = err.node.expect("error should carry a node");
        let span = program.span(node);
        assert_eq!(&source[span.start..span.end], "10 / x");
    }

    #[test]
    fn test_call_of_variable_is_not_a_function() {
        assert_eq!(error_kind("f = 1; print f(2);"), ErrorKind::NotAFunction);
    }

    #[test]
    fn test_function_read_as_variable() {
        assert_eq!(error_kind("f = func() { return 1; } print f + 1;"), ErrorKind::NotAVariable);
    }

    #[test]
    fn test_deep_recursion_overflows_limit() {
        let source = "down = func(n) { return down(n + 1); } print down(0);";
        let config = EvalConfig {
            max_call_depth: 64,
            ..EvalConfig::default()
        };
        let (result, _) = run_source_with(source, "", config);
        assert_eq!(result.unwrap_err().kind, ErrorKind::StackOverflow);
    }

    #[test]
    fn test_input_and_output() {
        let (result, output) = run_source("a = ?; b = ?; print a * b;", "6\n  7");
        assert_eq!(result.unwrap(), 42);
        assert_eq!(output, "42\n");
    }

    #[test]
    fn test_input_exhausted() {
        assert_eq!(run_source("a = ?;", "").0.unwrap_err().kind, ErrorKind::IoError);
    }

    #[test]
    fn test_input_not_integer() {
        assert_eq!(run_source("a = ?;", "abc").0.unwrap_err().kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn test_while_yields_zero_and_if_yields_body_value() {
        let mut program = Program::new();
        let root = program.root();
        let cond = program.add_node(Node::Num(1), at());
        let then_scope = program.new_scope(root, ScopeKind::Block);
        let inner = program.add_node(Node::Num(9), at());
        program.push_instruction(then_scope, inner);
        let if_node = program.add_node(
            Node::If {
                cond,
                then_scope,
                else_scope: None,
            },
            at(),
        );
        program.push_instruction(root, if_node);
        assert_eq!(run(&mut program, "".as_bytes(), Vec::new()).unwrap(), 9);

        let zero = program.add_node(Node::Num(0), at());
        let body = program.new_scope(root, ScopeKind::Block);
        let while_node = program.add_node(Node::While { cond: zero, body }, at());
        program.push_instruction(root, while_node);
        assert_eq!(run(&mut program, "".as_bytes(), Vec::new()).unwrap(), 0);
    }

    #[test]
    fn test_unknown_operator_in_hand_built_tree() {
        let mut program = Program::new();
        let root = program.root();
        let one = program.add_node(Node::Num(1), at());
        let bad = program.add_node(Node::Unary { op: Op::Mul, operand: one }, at());
        program.push_instruction(root, bad);
        let err = run(&mut program, "".as_bytes(), Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownOperator);
        assert_eq!(err.node, Some(bad));

        let mut program = Program::new();
        let root = program.root();
        let lhs = program.add_node(Node::Num(1), at());
        let rhs = program.add_node(Node::Num(2), at());
        let bad = program.add_node(Node::Binary { op: Op::Not, lhs, rhs }, at());
        program.push_instruction(root, bad);
        let err = run(&mut program, "".as_bytes(), Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownOperator);
    }

    /// `f` only becomes callable after a call to `g`, and `g` only after a
    /// call to `f`.
    #[test]
    fn test_forward_reference_cycle_terminates() {
        let mut program = Program::new();
        let root = program.root();
        let f_body = program.new_scope(root, ScopeKind::Function);
        let g_body = program.new_scope(root, ScopeKind::Function);

        let call_g = program.add_node(
            Node::Call {
                func: "g".to_string(),
                args: vec![],
            },
            at(),
        );
        let call_f = program.add_node(
            Node::Call {
                func: "f".to_string(),
                args: vec![],
            },
            at(),
        );
        program
            .scopes_mut()
            .insert(root, "f", Binding::func(vec![], f_body, call_g));
        program
            .scopes_mut()
            .insert(root, "g", Binding::func(vec![], g_body, call_f));
        let start = program.add_node(Node::Output(call_f), at());
        program.push_instruction(root, start);

        let mut output = Vec::new();
        let err = run(&mut program, "".as_bytes(), &mut output).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnresolvedForwardReference);
        assert!(output.is_empty());
    }

    #[test]
    fn test_undefined_name_in_hand_built_tree() {
        let mut program = Program::new();
        let root = program.root();
        let read = program.add_node(Node::Var("ghost".to_string()), at());
        program.push_instruction(root, read);
        let err = run(&mut program, "".as_bytes(), Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedName);
        assert_eq!(err.message, "undefined name: ghost");

        let mut program = Program::new();
        let root = program.root();
        let value = program.add_node(Node::Num(1), at());
        let write = program.add_node(
            Node::Assign {
                target: "ghost".to_string(),
                value,
            },
            at(),
        );
        program.push_instruction(root, write);
        let err = run(&mut program, "".as_bytes(), Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedName);
    }

    #[test]
    fn test_empty_program_yields_zero() {
        let mut program = Program::new();
        assert_eq!(run(&mut program, "".as_bytes(), Vec::new()).unwrap(), 0);
    }

    #[test]
    fn test_top_level_return_ends_program() {
        let (result, output) = run_source("print 1; return 5; print 2;", "");
        assert_eq!(result.unwrap(), 5);
        assert_eq!(output, "1\n");
    }
}
