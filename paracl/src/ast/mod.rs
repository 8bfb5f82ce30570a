//! Surface syntax tree produced by the parser
//!
//! This is the shape of the source text, with spans. It is lowered into the
//! arena [`crate::interp::Program`] before evaluation.

mod expr;
mod span;

pub use expr::*;
pub use span::*;

use serde::{Deserialize, Serialize};

/// A program is a sequence of top-level statements
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub stmts: Vec<Spanned<Stmt>>,
}

/// Braced statement list: `{ stmt* }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

// Nested blocks are released from an explicit stack so dropping a deeply
// nested tree does not recurse.
impl Drop for Block {
    fn drop(&mut self) {
        let mut blocks = Vec::new();
        take_nested_blocks(&mut self.stmts, &mut blocks);
        while let Some(mut block) = blocks.pop() {
            take_nested_blocks(&mut block.stmts, &mut blocks);
        }
    }
}

fn take_nested_blocks(stmts: &mut [Spanned<Stmt>], blocks: &mut Vec<Block>) {
    for stmt in stmts {
        match &mut stmt.node {
            Stmt::If {
                then_block,
                else_block,
                ..
            } => {
                blocks.push(std::mem::take(&mut then_block.node));
                if let Some(else_block) = else_block {
                    blocks.push(std::mem::take(&mut else_block.node));
                }
            }
            Stmt::While { body, .. } => blocks.push(std::mem::take(&mut body.node)),
            Stmt::Block(block) => blocks.push(std::mem::take(&mut block.node)),
            Stmt::Func(def) => blocks.push(std::mem::take(&mut def.body.node)),
            Stmt::Expr(_) | Stmt::Print(_) | Stmt::Return(_) => {}
        }
    }
}

/// Function declaration: `name = func(params) { body }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDef {
    pub name: Spanned<String>,
    pub params: Vec<Spanned<String>>,
    pub body: Spanned<Block>,
}
