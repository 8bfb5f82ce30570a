//! Parser implementation using lalrpop

use crate::ast::{Program, Span};
use crate::error::{CompileError, Result};
use crate::lexer::Token;
use lalrpop_util::ParseError;


lalrpop_util::lalrpop_mod!(
    #[allow(clippy::all)]
    grammar
);

/// Parse tokens into the surface AST
pub fn parse(_filename: &str, _source: &str, tokens: Vec<(Token, Span)>) -> Result<Program> {
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| Ok::<_, String>((span.start, tok, span.end)));

    grammar::ProgramParser::new()
        .parse(token_iter)
        .map_err(|e| {
            let (message, span) = match e {
                ParseError::InvalidToken { location } => {
                    ("invalid token".to_string(), Span::new(location, location + 1))
                }
                ParseError::UnrecognizedEof { location, expected } => (
                    format!("unexpected end of input{}", expected_hint(&expected)),
                    Span::new(location, location),
                ),
                ParseError::UnrecognizedToken {
                    token: (start, tok, end),
                    expected,
                } => (
                    format!("unexpected `{tok}`{}", expected_hint(&expected)),
                    Span::new(start, end),
                ),
                ParseError::ExtraToken {
                    token: (start, tok, end),
                } => (format!("extra token `{tok}`"), Span::new(start, end)),
                ParseError::User { error } => (error, Span::new(0, 0)),
            };
            CompileError::parser(message, span)
        })
}

fn expected_hint(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!(", expected one of {}", expected.join(", "))
    }
}
