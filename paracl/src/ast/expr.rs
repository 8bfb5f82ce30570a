//! Statement and expression nodes

use super::{Block, FuncDef, Spanned};
use serde::{Deserialize, Serialize};

/// Statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    /// Expression statement: `expr;`
    Expr(Spanned<Expr>),

    /// Output: `print expr;`
    Print(Spanned<Expr>),

    /// Conditional with optional else block
    If {
        cond: Spanned<Expr>,
        then_block: Spanned<Block>,
        else_block: Option<Spanned<Block>>,
    },

    /// Loop: `while (cond) { body }`
    While {
        cond: Spanned<Expr>,
        body: Spanned<Block>,
    },

    /// Early exit from the enclosing function
    Return(Spanned<Expr>),

    /// Nested scope: `{ ... }`
    Block(Spanned<Block>),

    /// Function declaration
    Func(FuncDef),
}

/// Expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal
    IntLit(i64),

    /// Variable reference
    Var(String),

    /// Assignment, declares `name` when it is not yet visible
    Assign {
        name: Spanned<String>,
        value: Box<Spanned<Expr>>,
    },

    /// Binary operation
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// Read one integer from input: `?`
    Input,

    /// Function call
    Call {
        func: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
}

// Same as `Block`: operands are moved onto a worklist and released one
// level at a time.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut operands = Vec::new();
        take_operands(self, &mut operands);
        while let Some(mut expr) = operands.pop() {
            take_operands(&mut expr, &mut operands);
        }
    }
}

fn take_operands(expr: &mut Expr, operands: &mut Vec<Expr>) {
    match expr {
        Expr::Assign { value: operand, .. } | Expr::Unary { expr: operand, .. } => {
            operands.push(std::mem::replace(&mut operand.node, Expr::Input));
        }
        Expr::Binary { left, right, .. } => {
            operands.push(std::mem::replace(&mut left.node, Expr::Input));
            operands.push(std::mem::replace(&mut right.node, Expr::Input));
        }
        Expr::Call { args, .. } => {
            operands.extend(args.drain(..).map(|arg| arg.node));
        }
        Expr::IntLit(_) | Expr::Var(_) | Expr::Input => {}
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    // Logical
    And,
    Or,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Gt => write!(f, ">"),
            BinOp::Le => write!(f, "<="),
            BinOp::Ge => write!(f, ">="),
            BinOp::And => write!(f, "&&"),
            BinOp::Or => write!(f, "||"),
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Identity (+)
    Plus,
    /// Negation (-)
    Neg,
    /// Logical not (!)
    Not,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Plus => write!(f, "+"),
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "!"),
        }
    }
}
