//! Error types and reporting

use crate::ast::Span;
use crate::interp::RuntimeError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompileError>;

/// Compile error
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Lexer error at {span:?}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span:?}: {message}")]
    Parser { message: String, span: Span },

    /// Scoping errors found while building the program
    #[error("Lowering error at {span:?}: {message}")]
    Lower { message: String, span: Span },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn lower(message: impl Into<String>, span: Span) -> Self {
        Self::Lower {
            message: message.into(),
            span,
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } | Self::Parser { span, .. } | Self::Lower { span, .. } => {
                Some(*span)
            }
            Self::Io { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lexer { message, .. }
            | Self::Parser { message, .. }
            | Self::Lower { message, .. }
            | Self::Io { message } => message,
        }
    }
}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

/// Report a compile error with ariadne
pub fn report_error(filename: &str, source: &str, error: &CompileError) -> std::io::Result<()> {
    let kind = match error {
        CompileError::Lexer { .. } => "Lexer",
        CompileError::Parser { .. } => "Parser",
        CompileError::Lower { .. } => "Scope",
        CompileError::Io { .. } => "IO",
    };
    print_report(filename, source, &format!("{kind} error"), error.message(), error.span())
}

/// Report a runtime error with ariadne. `span` is the source of the failing node, if known.
pub fn report_runtime_error(
    filename: &str,
    source: &str,
    error: &RuntimeError,
    span: Option<Span>,
) -> std::io::Result<()> {
    print_report(filename, source, "Runtime error", &error.message, span)
}

fn print_report(
    filename: &str,
    source: &str,
    title: &str,
    message: &str,
    span: Option<Span>,
) -> std::io::Result<()> {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    if let Some(span) = span {
        Report::build(ReportKind::Error, (filename, span.start..span.end))
            .with_message(title)
            .with_label(
                Label::new((filename, span.start..span.end))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .finish()
            .eprint((filename, Source::from(source)))
    } else {
        Report::build(ReportKind::Error, (filename, 0..0))
            .with_message(format!("{title}: {message}"))
            .finish()
            .eprint((filename, Source::from(source)))
    }
}
