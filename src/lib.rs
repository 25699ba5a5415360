//! A front end for Papyrus, the scripting language of Creation Engine games.
//!
//! [`parse`] turns one script's source into a [`Script`] tree plus the list of
//! every lexical and syntax error found. Parsing never stops at the first
//! error and always produces a tree.
//!
//! ```
//! let result = papyrus::parse("Scriptname Foo\nFunction Bar()\nreturn 1 + 2\nEndFunction\n");
//! assert!(result.is_success());
//! assert_eq!(result.script.name.name, "Foo");
//! ```

pub mod analysis;
pub mod ast;
pub mod config;
pub mod driver;
pub mod error;
mod expression;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod types;
pub mod visitor;

pub use ast::Script;
pub use error::{CompilerError, Diagnostic};
pub use visitor::{walk, Visitor, Walk};

use lexer::Lexer;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    pub script: Script,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parses one script. Identical input always yields an identical result.
pub fn parse(source: &str) -> ParseResult {
    let (script, diagnostics) = parser::parse_script(Lexer::new(source));
    ParseResult {
        script,
        diagnostics,
    }
}

/// Like [`parse`], for raw bytes that have not been checked for UTF-8 yet.
pub fn parse_bytes(bytes: &[u8]) -> Result<ParseResult, CompilerError> {
    let source = std::str::from_utf8(bytes).map_err(|error| CompilerError::InvalidEncoding {
        path: PathBuf::from("<input>"),
        offset: error.valid_up_to(),
    })?;
    Ok(parse(source))
}
