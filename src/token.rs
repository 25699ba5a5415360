use serde::Serialize;
use std::fmt;

/// A 1-based line/column pair. Columns count characters, not bytes.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source range from the start of the first token to the end of the last.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Joins two spans, keeping the start of `self` and the end of `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub(crate) kind: Kind,
    pub(crate) value: String,
    pub(crate) span: Span,
}

impl Token {
    pub fn new(kind: Kind, value: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            value: value.into(),
            span,
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn line(&self) -> usize {
        self.span.start.line
    }

    pub fn column(&self) -> usize {
        self.span.start.column
    }
}

/// Why the lexer could not classify a run of characters.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
pub enum LexicalError {
    UnexpectedCharacter,
    UnterminatedString,
    InvalidEscape,
    MalformedNumber,
    UnterminatedComment,
    UnterminatedDocComment,
}

impl LexicalError {
    pub fn describe(&self, lexeme: &str) -> String {
        match self {
            LexicalError::UnexpectedCharacter => format!("unrecognized character '{}'", lexeme),
            LexicalError::UnterminatedString => "unterminated string literal".to_string(),
            LexicalError::InvalidEscape => {
                format!("invalid escape sequence in string literal \"{}\"", lexeme)
            }
            LexicalError::MalformedNumber => format!("malformed numeric literal '{}'", lexeme),
            LexicalError::UnterminatedComment => "unterminated block comment".to_string(),
            LexicalError::UnterminatedDocComment => {
                "unterminated documentation comment".to_string()
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
pub enum Kind {
    // Brackets and delimiters
    LParen,      // (
    RParen,      // )
    LBracket,    // [
    RBracket,    // ]
    Comma,       // ,
    Dot,         // .

    // Arithmetic and logical operators
    Plus,        // +
    Minus,       // -
    Star,        // *
    Slash,       // /
    Percent,     // %
    Bang,        // !
    AndAnd,      // &&
    OrOr,        // ||

    // Comparison operators
    EqualEqual,   // ==
    NotEqual,     // !=
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=

    // Assignment operators
    Assign,        // =
    PlusAssign,    // +=
    MinusAssign,   // -=
    StarAssign,    // *=
    SlashAssign,   // /=
    PercentAssign, // %=

    // Declaration keywords
    Scriptname,
    Extends,
    Import,
    Function,
    EndFunction,
    Event,
    EndEvent,
    Property,
    EndProperty,
    State,
    EndState,

    // Flags
    Auto,
    AutoReadOnly,
    Native,
    Global,
    Conditional,
    Hidden,

    // Control flow
    If,
    ElseIf,
    Else,
    EndIf,
    While,
    EndWhile,
    Return,

    // Expression keywords
    As,
    New,
    Length,
    None,
    True,
    False,
    SelfRef,     // Self
    Parent,

    // Builtin types
    Bool,
    Int,
    Float,
    String,

    // Identifiers and literals
    Identifier,
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    DocComment,  // { ... }

    Newline,     // statement terminator
    Invalid(LexicalError),
    EOF          // End of file marker
}
