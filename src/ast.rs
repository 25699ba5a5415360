//! The Papyrus syntax tree.
//!
//! Every node owns its children outright and records the [`Span`] from its
//! first to its last token. Nothing is mutated once [`crate::parse`] returns.

use crate::token::Span;
use crate::types::Type;
use serde::Serialize;

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// Papyrus identifiers are case-insensitive.
    pub fn is(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

#[derive(Debug, PartialEq, Clone, Default, Serialize)]
pub struct ScriptFlags {
    pub hidden: bool,
    pub conditional: bool,
    pub native: bool,
}

/// The root of a parsed file.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Script {
    pub name: Identifier,
    pub parent: Option<Identifier>,
    pub flags: ScriptFlags,
    pub doc: Option<String>,
    pub imports: Vec<Import>,
    pub members: Vec<Member>,
    pub span: Span,
}

impl Script {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Function(function) => Some(function),
            _ => None,
        })
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions().find(|function| function.name.is(name))
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Import {
    pub name: Identifier,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub enum Member {
    Variable(VariableDecl),
    Property(PropertyDecl),
    Function(FunctionDecl),
    Event(EventDecl),
    State(StateDecl),
}

impl Member {
    pub fn span(&self) -> Span {
        match self {
            Member::Variable(node) => node.span,
            Member::Property(node) => node.span,
            Member::Function(node) => node.span,
            Member::Event(node) => node.span,
            Member::State(node) => node.span,
        }
    }
}

/// A script-level variable. Initializers must be literals.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct VariableDecl {
    pub ty: Type,
    pub name: Identifier,
    pub initializer: Option<Literal>,
    pub conditional: bool,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub enum PropertyKind {
    Auto { initializer: Option<Literal> },
    AutoReadOnly { initializer: Literal },
    Full {
        getter: Option<Box<FunctionDecl>>,
        setter: Option<Box<FunctionDecl>>,
    },
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct PropertyDecl {
    pub ty: Type,
    pub name: Identifier,
    pub kind: PropertyKind,
    pub hidden: bool,
    pub conditional: bool,
    pub doc: Option<String>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Default, Serialize)]
pub struct FunctionFlags {
    pub native: bool,
    pub global: bool,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct FunctionDecl {
    pub return_type: Option<Type>,
    pub name: Identifier,
    pub params: Vec<Parameter>,
    pub body: Vec<Statement>,
    pub flags: FunctionFlags,
    pub doc: Option<String>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct EventDecl {
    pub name: Identifier,
    pub params: Vec<Parameter>,
    pub body: Vec<Statement>,
    pub native: bool,
    pub doc: Option<String>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct StateDecl {
    pub name: Identifier,
    pub auto: bool,
    pub events: Vec<EventDecl>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Parameter {
    pub ty: Type,
    pub name: Identifier,
    pub default: Option<Literal>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub enum Statement {
    Expression(ExprStmt),
    Assign(Assign),
    If(If),
    While(While),
    Return(Return),
    Declare(Declare),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Expression(node) => node.span,
            Statement::Assign(node) => node.span,
            Statement::If(node) => node.span,
            Statement::While(node) => node.span,
            Statement::Return(node) => node.span,
            Statement::Declare(node) => node.span,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct ExprStmt {
    pub expr: Expression,
    pub span: Span,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum AssignOp {
    Assign,   // =
    Add,      // +=
    Subtract, // -=
    Multiply, // *=
    Divide,   // /=
    Modulo,   // %=
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Assign {
    pub target: Expression,
    pub op: AssignOp,
    pub value: Expression,
    pub span: Span,
}

/// One `If`/`ElseIf` arm.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Branch {
    pub condition: Expression,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct If {
    pub branches: Vec<Branch>,
    pub else_body: Option<Vec<Statement>>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct While {
    pub condition: Expression,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Return {
    pub value: Option<Expression>,
    pub span: Span,
}

/// A local variable declaration inside a function or event body.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Declare {
    pub ty: Type,
    pub name: Identifier,
    pub initializer: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub enum Expression {
    Literal(Literal),
    Identifier(Identifier),
    Unary(Unary),
    Binary(Binary),
    Call(Call),
    MemberAccess(MemberAccess),
    Index(Index),
    Cast(Cast),
    New(New),
    ArrayLength(ArrayLength),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Literal(node) => node.span,
            Expression::Identifier(node) => node.span,
            Expression::Unary(node) => node.span,
            Expression::Binary(node) => node.span,
            Expression::Call(node) => node.span,
            Expression::MemberAccess(node) => node.span,
            Expression::Index(node) => node.span,
            Expression::Cast(node) => node.span,
            Expression::New(node) => node.span,
            Expression::ArrayLength(node) => node.span,
        }
    }

    /// Whether the expression names a storage location.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expression::Identifier(_) | Expression::MemberAccess(_) | Expression::Index(_)
        )
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub enum LiteralValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
    None,
    SelfRef,
    Parent,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum UnaryOp {
    Negate, // -
    Not,    // !
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Unary {
    pub op: UnaryOp,
    pub operand: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Binary {
    pub op: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

/// A call argument, optionally named: `Foo(abForce = true)`.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Argument {
    pub name: Option<Identifier>,
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Call {
    pub callee: Box<Expression>,
    pub args: Vec<Argument>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct MemberAccess {
    pub object: Box<Expression>,
    pub member: Identifier,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Index {
    pub array: Box<Expression>,
    pub subscript: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Cast {
    pub expr: Box<Expression>,
    pub target: Type,
    pub span: Span,
}

/// `New Int[10]` allocates an array. A bare `New Point` constructs a struct.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct New {
    pub ty: Type,
    pub size: Option<Box<Expression>>,
    pub span: Span,
}

/// `array.Length`
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct ArrayLength {
    pub array: Box<Expression>,
    pub span: Span,
}
