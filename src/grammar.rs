//! Static grammar tables shared by the lexer and parser.
//!
//! Everything in here is immutable data, so any number of parses running on
//! separate threads can read it without synchronization.

use crate::ast::{AssignOp, BinaryOp, UnaryOp};
use crate::token::Kind;

/// Keyword spellings in their canonical case. Lookup ignores ASCII case.
pub const KEYWORDS: &[(&str, Kind)] = &[
    ("Scriptname", Kind::Scriptname),
    ("Extends", Kind::Extends),
    ("Import", Kind::Import),
    ("Function", Kind::Function),
    ("EndFunction", Kind::EndFunction),
    ("Event", Kind::Event),
    ("EndEvent", Kind::EndEvent),
    ("Property", Kind::Property),
    ("EndProperty", Kind::EndProperty),
    ("State", Kind::State),
    ("EndState", Kind::EndState),
    ("Auto", Kind::Auto),
    ("AutoReadOnly", Kind::AutoReadOnly),
    ("Native", Kind::Native),
    ("Global", Kind::Global),
    ("Conditional", Kind::Conditional),
    ("Hidden", Kind::Hidden),
    ("If", Kind::If),
    ("ElseIf", Kind::ElseIf),
    ("Else", Kind::Else),
    ("EndIf", Kind::EndIf),
    ("While", Kind::While),
    ("EndWhile", Kind::EndWhile),
    ("Return", Kind::Return),
    ("As", Kind::As),
    ("New", Kind::New),
    ("Length", Kind::Length),
    ("None", Kind::None),
    ("True", Kind::True),
    ("False", Kind::False),
    ("Self", Kind::SelfRef),
    ("Parent", Kind::Parent),
    ("Bool", Kind::Bool),
    ("Int", Kind::Int),
    ("Float", Kind::Float),
    ("String", Kind::String),
];

/// Operator and punctuation spellings, longest first so that a prefix scan
/// always prefers `<=` over `<`.
pub const OPERATORS: &[(&str, Kind)] = &[
    ("&&", Kind::AndAnd),
    ("||", Kind::OrOr),
    ("==", Kind::EqualEqual),
    ("!=", Kind::NotEqual),
    ("<=", Kind::LessEqual),
    (">=", Kind::GreaterEqual),
    ("+=", Kind::PlusAssign),
    ("-=", Kind::MinusAssign),
    ("*=", Kind::StarAssign),
    ("/=", Kind::SlashAssign),
    ("%=", Kind::PercentAssign),
    ("+", Kind::Plus),
    ("-", Kind::Minus),
    ("*", Kind::Star),
    ("/", Kind::Slash),
    ("%", Kind::Percent),
    ("!", Kind::Bang),
    ("<", Kind::Less),
    (">", Kind::Greater),
    ("=", Kind::Assign),
    ("(", Kind::LParen),
    (")", Kind::RParen),
    ("[", Kind::LBracket),
    ("]", Kind::RBracket),
    (",", Kind::Comma),
    (".", Kind::Dot),
];

/// Binding strength, weakest first.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Precedence {
    LogicalOr,
    LogicalAnd,
    Equality,
    Relational,
    Additive,
    Multiplicative,
    Unary,
    Cast,
    Primary,
}

impl Precedence {
    /// The next tighter level. `Primary` is its own successor.
    pub fn next(self) -> Precedence {
        match self {
            Precedence::LogicalOr => Precedence::LogicalAnd,
            Precedence::LogicalAnd => Precedence::Equality,
            Precedence::Equality => Precedence::Relational,
            Precedence::Relational => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Unary,
            Precedence::Unary => Precedence::Cast,
            Precedence::Cast => Precedence::Primary,
            Precedence::Primary => Precedence::Primary,
        }
    }
}

pub fn keyword(ident: &str) -> Option<Kind> {
    KEYWORDS
        .iter()
        .find(|(spelling, _)| spelling.eq_ignore_ascii_case(ident))
        .map(|(_, kind)| *kind)
}

/// Matches the longest operator at the start of `input`, returning its kind
/// and length in characters.
pub fn operator(input: &[char]) -> Option<(Kind, usize)> {
    OPERATORS.iter().find_map(|(spelling, kind)| {
        let len = spelling.chars().count();
        if input.len() >= len && spelling.chars().zip(input.iter()).all(|(a, b)| a == *b) {
            Some((*kind, len))
        } else {
            None
        }
    })
}

/// Every binary operator is left-associative.
pub fn binary_operator(kind: Kind) -> Option<(BinaryOp, Precedence)> {
    let operator = match kind {
        Kind::OrOr => (BinaryOp::Or, Precedence::LogicalOr),
        Kind::AndAnd => (BinaryOp::And, Precedence::LogicalAnd),
        Kind::EqualEqual => (BinaryOp::Equal, Precedence::Equality),
        Kind::NotEqual => (BinaryOp::NotEqual, Precedence::Equality),
        Kind::Less => (BinaryOp::Less, Precedence::Relational),
        Kind::LessEqual => (BinaryOp::LessEqual, Precedence::Relational),
        Kind::Greater => (BinaryOp::Greater, Precedence::Relational),
        Kind::GreaterEqual => (BinaryOp::GreaterEqual, Precedence::Relational),
        Kind::Plus => (BinaryOp::Add, Precedence::Additive),
        Kind::Minus => (BinaryOp::Subtract, Precedence::Additive),
        Kind::Star => (BinaryOp::Multiply, Precedence::Multiplicative),
        Kind::Slash => (BinaryOp::Divide, Precedence::Multiplicative),
        Kind::Percent => (BinaryOp::Modulo, Precedence::Multiplicative),
        _ => return None,
    };
    Some(operator)
}

pub fn assignment_operator(kind: Kind) -> Option<AssignOp> {
    match kind {
        Kind::Assign => Some(AssignOp::Assign),
        Kind::PlusAssign => Some(AssignOp::Add),
        Kind::MinusAssign => Some(AssignOp::Subtract),
        Kind::StarAssign => Some(AssignOp::Multiply),
        Kind::SlashAssign => Some(AssignOp::Divide),
        Kind::PercentAssign => Some(AssignOp::Modulo),
        _ => None,
    }
}

pub fn unary_operator(kind: Kind) -> Option<UnaryOp> {
    match kind {
        Kind::Minus => Some(UnaryOp::Negate),
        Kind::Bang => Some(UnaryOp::Not),
        _ => None,
    }
}

pub fn is_type_keyword(kind: Kind) -> bool {
    matches!(kind, Kind::Bool | Kind::Int | Kind::Float | Kind::String)
}

/// Keywords that close (or continue into the next arm of) a block.
pub fn is_block_terminator(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::EndFunction
            | Kind::EndEvent
            | Kind::EndProperty
            | Kind::EndState
            | Kind::EndIf
            | Kind::EndWhile
            | Kind::ElseIf
            | Kind::Else
    )
}

/// Tokens that can only ever start a line. The lexer uses these to notice a
/// bracket that was never closed on the previous line.
pub fn is_structural(kind: Kind) -> bool {
    is_block_terminator(kind)
        || matches!(
            kind,
            Kind::Function
                | Kind::Event
                | Kind::State
                | Kind::Property
                | Kind::If
                | Kind::While
                | Kind::Return
                | Kind::Scriptname
                | Kind::Import
                | Kind::Auto
                | Kind::EOF
        )
}

/// Canonical source spelling of a fixed token.
pub fn spelling(kind: Kind) -> Option<&'static str> {
    KEYWORDS
        .iter()
        .chain(OPERATORS.iter())
        .find(|(_, k)| *k == kind)
        .map(|(spelling, _)| *spelling)
}

/// Human-readable name of a token kind for diagnostics.
pub fn describe(kind: Kind) -> String {
    if let Some(spelling) = spelling(kind) {
        return format!("'{}'", spelling);
    }
    match kind {
        Kind::Identifier => "identifier".to_string(),
        Kind::IntLiteral => "integer literal".to_string(),
        Kind::FloatLiteral => "float literal".to_string(),
        Kind::StringLiteral => "string literal".to_string(),
        Kind::DocComment => "documentation comment".to_string(),
        Kind::Newline => "end of line".to_string(),
        Kind::EOF => "end of file".to_string(),
        Kind::Invalid(_) => "invalid token".to_string(),
        _ => format!("{:?}", kind),
    }
}
