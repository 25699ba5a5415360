use crate::grammar;
use crate::token::{Kind, Position, Token};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that belong to the caller rather than to the script being parsed.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("FileNotFoundError: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("IOError: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IOError: failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("EncodingError: {} is not valid UTF-8 (byte offset {offset})", .path.display())]
    InvalidEncoding { path: PathBuf, offset: usize },
    #[error("ConfigError: {0}")]
    Config(#[from] serde_json::Error),
    #[error("PatternError: {0}")]
    Pattern(#[from] regex::Error),
    #[error("InternalError: parsing {} panicked: {message}", .path.display())]
    Panicked { path: PathBuf, message: String },
    #[error("{count} error(s) in {files} file(s)")]
    Diagnostics { files: usize, count: usize },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum Severity {
    Error,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
}

/// A positioned, self-contained error report about the script text.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub line: usize,
    pub column: usize,
    pub message: String,
    /// Kind of the token the parser tripped over, when there was one.
    pub found: Option<Kind>,
}

impl Diagnostic {
    pub fn syntax(at: Position, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind: DiagnosticKind::Syntax,
            line: at.line,
            column: at.column,
            message: message.into(),
            found: None,
        }
    }

    /// Builds the diagnostic for an unexpected token. Invalid tokens carry
    /// their own lexical error, which takes priority over `expected`.
    pub fn from_token(token: &Token, expected: &str) -> Self {
        let at = token.span.start;
        match token.kind {
            Kind::Invalid(error) => Self {
                severity: Severity::Error,
                kind: DiagnosticKind::Lexical,
                line: at.line,
                column: at.column,
                message: error.describe(&token.value),
                found: Some(token.kind),
            },
            kind => Self {
                found: Some(kind),
                ..Self::syntax(
                    at,
                    format!("expected {} but found {}", expected, found_text(token)),
                )
            },
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

fn found_text(token: &Token) -> String {
    match token.kind {
        Kind::Identifier => format!("identifier '{}'", token.value),
        Kind::IntLiteral | Kind::FloatLiteral => format!("number '{}'", token.value),
        Kind::StringLiteral => format!("string \"{}\"", token.value),
        kind => grammar::describe(kind),
    }
}

impl std::error::Error for Diagnostic {}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}: error: {}", self.line, self.column, self.message)
    }
}

/// Collects the diagnostics for a single parse. Each parse owns its sink and
/// hands the contents back to the caller.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(
            line = diagnostic.line,
            column = diagnostic.column,
            message = %diagnostic.message,
            "diagnostic"
        );
        self.diagnostics.push(diagnostic);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
