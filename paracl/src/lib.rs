//! ParaCL Interpreter Library
//!
//! Lexer, parser and tree-walking evaluator for ParaCL, a small integer
//! scripting language with nested scopes and recursive functions.

pub mod ast;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod util;

pub use ast::Span;
pub use error::{CompileError, Result};

/// Lex, parse and lower `source` into a runnable program
pub fn compile(filename: &str, source: &str) -> Result<interp::Program> {
    let tokens = lexer::tokenize(source)?;
    let ast = parser::parse(filename, source, tokens)?;
    lower::lower(&ast)
}
