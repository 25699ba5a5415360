use crate::ast::*;
use crate::error::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::expression::MAX_NESTING_DEPTH;
use crate::grammar;
use crate::token::{Kind, Position, Span, Token};
use crate::types::Type;

const IF_CLOSERS: &[Kind] = &[Kind::ElseIf, Kind::Else, Kind::EndIf];
const WHILE_CLOSERS: &[Kind] = &[Kind::EndWhile];
const FUNCTION_CLOSERS: &[Kind] = &[Kind::EndFunction];
const EVENT_CLOSERS: &[Kind] = &[Kind::EndEvent];
const PROPERTY_CLOSERS: &[Kind] = &[Kind::EndProperty];
const STATE_CLOSERS: &[Kind] = &[Kind::EndState];

struct PropertyHeader {
    initializer: Option<Literal>,
    auto: Option<Token>,
    hidden: bool,
    conditional: bool,
    line_end: Position,
}

/// Parses a complete token stream into a [`Script`] plus every diagnostic
/// found along the way. Always returns a tree, even for broken input.
pub fn parse_script(tokens: impl IntoIterator<Item = Token>) -> (Script, Vec<Diagnostic>) {
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    last_end: Position,
    sink: DiagnosticSink,
    // Terminators of every block we are currently inside, innermost last.
    open_blocks: Vec<&'static [Kind]>,
    // Start of the most recently reported lexical error.
    last_lexical: Option<Position>,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut tokens: Vec<Token> = tokens.into_iter().collect();
        if tokens.last().map(|t| t.kind) != Some(Kind::EOF) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(Position::new(1, 1));
            tokens.push(Token::new(Kind::EOF, "", Span::new(end, end)));
        }
        let last_end = tokens[0].span.start;
        Self {
            tokens,
            current: 0,
            last_end,
            sink: DiagnosticSink::new(),
            open_blocks: Vec::new(),
            last_lexical: None,
            depth: 0,
        }
    }

    pub(crate) fn at(&self) -> &Token {
        &self.tokens[self.current]
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> Kind {
        self.tokens
            .get(self.current + offset)
            .map(|t| t.kind)
            .unwrap_or(Kind::EOF)
    }

    pub(crate) fn check(&self, kind: Kind) -> bool {
        self.at().kind == kind
    }

    pub(crate) fn next_token(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if token.kind != Kind::EOF {
            self.current += 1;
        }
        if token.kind != Kind::Newline {
            self.last_end = token.span.end;
        }
        token
    }

    pub(crate) fn eat(&mut self, expecting: Kind, context: &str) -> Result<Token, Diagnostic> {
        if self.at().kind != expecting {
            let expected = format!("{} {}", grammar::describe(expecting), context);
            return Err(Diagnostic::from_token(self.at(), expected.trim_end()));
        }
        Ok(self.next_token())
    }

    pub(crate) fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.last_end)
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.kind == DiagnosticKind::Lexical {
            self.last_lexical = Some(diagnostic.position());
        }
        self.sink.report(diagnostic);
    }

    /// Consumes a token during recovery. An invalid token is still reported
    /// unless the error being recovered from was that same token.
    fn discard(&mut self) -> Token {
        let token = self.next_token();
        if let Kind::Invalid(_) = token.kind {
            if self.last_lexical != Some(token.span.start) {
                self.report(Diagnostic::from_token(&token, ""));
            }
        }
        token
    }

    /// Runs `parse` one nesting level deeper, failing once the limit is hit.
    pub(crate) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, Diagnostic>,
    ) -> Result<T, Diagnostic> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Diagnostic::syntax(
                self.at().span.start,
                format!("expression is nested more than {} levels deep", MAX_NESTING_DEPTH),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn is_eof(&self) -> bool {
        self.at().kind == Kind::EOF
    }

    pub fn parse(mut self) -> (Script, Vec<Diagnostic>) {
        tracing::debug!(tokens = self.tokens.len(), "parsing script");

        self.skip_newlines();
        let mut script = self.parse_header();
        self.parse_members(&mut script);
        script.span = Span::new(script.span.start, self.last_end);

        let diagnostics = self.sink.into_vec();
        tracing::debug!(
            members = script.members.len(),
            diagnostics = diagnostics.len(),
            "parsed script {}",
            script.name.name
        );
        (script, diagnostics)
    }

    fn parse_header(&mut self) -> Script {
        let start = self.at().span.start;
        let mut script = Script {
            name: Identifier::new("", Span::new(start, start)),
            parent: None,
            flags: ScriptFlags::default(),
            doc: None,
            imports: Vec::new(),
            members: Vec::new(),
            span: Span::new(start, start),
        };

        if !self.check(Kind::Scriptname) {
            self.report(Diagnostic::from_token(self.at(), "'Scriptname' header"));
            if !self.at_member_start() && !self.at_variable_start() {
                self.recover_to_member();
            }
            return script;
        }

        match self.parse_header_line(&mut script) {
            Ok(doc) => script.doc = doc,
            Err(diagnostic) => {
                self.report(diagnostic);
                self.recover_to_member();
            }
        }
        script
    }

    fn parse_header_line(&mut self, script: &mut Script) -> Result<Option<String>, Diagnostic> {
        self.eat(Kind::Scriptname, "")?;
        script.name = self.parse_identifier("script name")?;

        if self.check(Kind::Extends) {
            self.next_token();
            script.parent = Some(self.parse_identifier("parent script name after 'Extends'")?);
        }

        loop {
            match self.at().kind {
                Kind::Hidden => script.flags.hidden = true,
                Kind::Conditional => script.flags.conditional = true,
                Kind::Native => script.flags.native = true,
                _ => break,
            }
            self.next_token();
        }

        self.end_of_declaration("script header")
    }

    fn parse_members(&mut self, script: &mut Script) {
        loop {
            self.skip_newlines();
            match self.at().kind {
                Kind::EOF => break,
                Kind::DocComment => {
                    self.next_token();
                }
                Kind::Scriptname => {
                    let token = self.at().clone();
                    self.report(Diagnostic {
                        found: Some(token.kind),
                        ..Diagnostic::syntax(
                            token.span.start,
                            "duplicate 'Scriptname' header; a file declares exactly one script",
                        )
                    });
                    self.recover_to_member();
                }
                Kind::Import => match self.parse_import() {
                    Ok(import) => script.imports.push(import),
                    Err(diagnostic) => {
                        self.report(diagnostic);
                        self.recover_to_member();
                    }
                },
                _ if self.at_member_start() || self.at_variable_start() => {
                    let terminator = self.member_terminator();
                    if let Err(diagnostic) = self.parse_member(&mut script.members) {
                        self.report(diagnostic);
                        self.skip_member(terminator);
                    }
                }
                _ => {
                    self.report(Diagnostic::from_token(self.at(), "a script member declaration"));
                    self.recover_to_member();
                }
            }
        }
    }

    fn parse_member(&mut self, members: &mut Vec<Member>) -> Result<(), Diagnostic> {
        match self.at().kind {
            Kind::Function => {
                let function = self.parse_function(None)?;
                members.push(Member::Function(function));
            }
            Kind::Event => {
                let event = self.parse_event()?;
                members.push(Member::Event(event));
            }
            Kind::State | Kind::Auto => {
                let state = self.parse_state(members)?;
                members.push(Member::State(state));
            }
            _ => {
                let member = self.parse_typed_member()?;
                members.push(member);
            }
        }
        Ok(())
    }

    fn parse_import(&mut self) -> Result<Import, Diagnostic> {
        let keyword = self.eat(Kind::Import, "")?;
        let name = self.parse_identifier("script name after 'Import'")?;
        let span = self.span_from(keyword.span.start);
        self.end_of_statement("import")?;
        Ok(Import { name, span })
    }

    /// Members that start with a type: variables, properties and functions
    /// with a return type.
    fn parse_typed_member(&mut self) -> Result<Member, Diagnostic> {
        let ty = self.parse_type()?;
        match self.at().kind {
            Kind::Function => Ok(Member::Function(self.parse_function(Some(ty))?)),
            Kind::Property => Ok(Member::Property(self.parse_property(ty)?)),
            Kind::Identifier => Ok(Member::Variable(self.parse_variable(ty)?)),
            _ => Err(Diagnostic::from_token(
                self.at(),
                "'Function', 'Property' or a variable name after the type",
            )),
        }
    }

    fn parse_variable(&mut self, ty: Type) -> Result<VariableDecl, Diagnostic> {
        let name = self.parse_identifier("variable name")?;
        let initializer = if self.check(Kind::Assign) {
            self.next_token();
            Some(self.parse_constant()?)
        } else {
            None
        };

        let mut conditional = false;
        while self.check(Kind::Conditional) {
            self.next_token();
            conditional = true;
        }

        let span = self.span_from(ty.span.start);
        self.end_of_statement("variable declaration")?;
        Ok(VariableDecl {
            ty,
            name,
            initializer,
            conditional,
            span,
        })
    }

    fn parse_function(&mut self, return_type: Option<Type>) -> Result<FunctionDecl, Diagnostic> {
        let keyword = self.eat(Kind::Function, "")?;
        let start = return_type.as_ref().map_or(keyword.span.start, |ty| ty.span.start);
        let name = self.parse_identifier("function name")?;

        let mut params = Vec::new();
        let mut flags = FunctionFlags::default();
        let doc = match self.parse_function_header(&mut params, &mut flags) {
            Ok(doc) => doc,
            Err(diagnostic) => {
                self.report(diagnostic);
                self.skip_line();
                None
            }
        };

        let body = if flags.native {
            Vec::new()
        } else {
            self.parse_invokable_body(&keyword, FUNCTION_CLOSERS, "function body")
        };

        Ok(FunctionDecl {
            return_type,
            name,
            params,
            body,
            flags,
            doc,
            span: self.span_from(start),
        })
    }

    fn parse_function_header(
        &mut self,
        params: &mut Vec<Parameter>,
        flags: &mut FunctionFlags,
    ) -> Result<Option<String>, Diagnostic> {
        self.parse_parameters(params)?;
        loop {
            match self.at().kind {
                Kind::Global => flags.global = true,
                Kind::Native => flags.native = true,
                _ => break,
            }
            self.next_token();
        }
        self.end_of_declaration("function declaration")
    }

    fn parse_event(&mut self) -> Result<EventDecl, Diagnostic> {
        let keyword = self.eat(Kind::Event, "")?;
        let name = self.parse_identifier("event name")?;

        let mut params = Vec::new();
        let mut native = false;
        let header = self.parse_parameters(&mut params).and_then(|_| {
            while self.check(Kind::Native) {
                self.next_token();
                native = true;
            }
            self.end_of_declaration("event declaration")
        });
        let doc = match header {
            Ok(doc) => doc,
            Err(diagnostic) => {
                self.report(diagnostic);
                self.skip_line();
                None
            }
        };

        let body = if native {
            Vec::new()
        } else {
            self.parse_invokable_body(&keyword, EVENT_CLOSERS, "event body")
        };

        Ok(EventDecl {
            name,
            params,
            body,
            native,
            doc,
            span: self.span_from(keyword.span.start),
        })
    }

    fn parse_parameters(&mut self, params: &mut Vec<Parameter>) -> Result<(), Diagnostic> {
        self.eat(Kind::LParen, "to open the parameter list")?;
        if self.check(Kind::RParen) {
            self.next_token();
            return Ok(());
        }

        loop {
            if !self.at_type_start() {
                return Err(Diagnostic::from_token(
                    self.at(),
                    "a parameter type or ')' in the parameter list",
                ));
            }
            let ty = self.parse_type()?;
            let name = self.parse_identifier("parameter name in the parameter list")?;
            let default = if self.check(Kind::Assign) {
                self.next_token();
                Some(self.parse_constant()?)
            } else {
                None
            };
            params.push(Parameter {
                span: self.span_from(ty.span.start),
                ty,
                name,
                default,
            });

            match self.at().kind {
                Kind::Comma => {
                    self.next_token();
                }
                Kind::RParen => {
                    self.next_token();
                    return Ok(());
                }
                _ => {
                    return Err(Diagnostic::from_token(
                        self.at(),
                        "',' or ')' in the parameter list",
                    ))
                }
            }
        }
    }

    /// Parses statements up to the matching terminator and consumes it. A
    /// missing or mismatched terminator is reported at the opening keyword.
    fn parse_invokable_body(
        &mut self,
        opener: &Token,
        closers: &'static [Kind],
        what: &str,
    ) -> Vec<Statement> {
        let body = self.parse_block(closers);
        if closers.contains(&self.at().kind) {
            self.next_token();
            self.finish_line("block terminator");
        } else {
            let diagnostic = self.unterminated(opener, what, closers[0]);
            self.report(diagnostic);
        }
        body
    }

    fn parse_property(&mut self, ty: Type) -> Result<PropertyDecl, Diagnostic> {
        let keyword = self.eat(Kind::Property, "")?;
        let name = self.parse_identifier("property name")?;

        let mut header = PropertyHeader {
            initializer: None,
            auto: None,
            hidden: false,
            conditional: false,
            line_end: self.last_end,
        };
        let (doc, line_end, header_ok) = match self.parse_property_header(&mut header) {
            Ok(doc) => (doc, header.line_end, true),
            Err(diagnostic) => {
                self.report(diagnostic);
                let line_end = self.last_end;
                self.skip_line();
                (None, line_end, false)
            }
        };
        let PropertyHeader {
            initializer,
            auto,
            hidden,
            conditional,
            ..
        } = header;

        // A broken header without 'Auto' only opens a block if accessors follow.
        if !header_ok && auto.is_none() {
            self.skip_newlines();
            if !self.at_function_start() {
                return Ok(PropertyDecl {
                    span: Span::new(ty.span.start, line_end),
                    ty,
                    name,
                    kind: PropertyKind::Auto { initializer },
                    hidden,
                    conditional,
                    doc,
                });
            }
        }

        let kind = match auto {
            Some(token) if token.kind == Kind::AutoReadOnly => match initializer {
                Some(initializer) => PropertyKind::AutoReadOnly { initializer },
                None => {
                    if header_ok {
                        self.report(Diagnostic::syntax(
                            token.span.start,
                            format!("AutoReadOnly property '{}' requires an initial value", name.name),
                        ));
                    }
                    PropertyKind::Auto { initializer: None }
                }
            },
            Some(_) => PropertyKind::Auto { initializer },
            None => {
                if let Some(initializer) = &initializer {
                    self.report(Diagnostic::syntax(
                        initializer.span.start,
                        format!("full property '{}' cannot have an initial value", name.name),
                    ));
                }
                let (getter, setter) = self.parse_property_functions(&keyword, &name);
                PropertyKind::Full { getter, setter }
            }
        };

        let span = match kind {
            PropertyKind::Full { .. } => self.span_from(ty.span.start),
            _ => Span::new(ty.span.start, line_end),
        };

        Ok(PropertyDecl {
            ty,
            name,
            kind,
            hidden,
            conditional,
            doc,
            span,
        })
    }

    fn parse_property_header(
        &mut self,
        header: &mut PropertyHeader,
    ) -> Result<Option<String>, Diagnostic> {
        if self.check(Kind::Assign) {
            self.next_token();
            header.initializer = Some(self.parse_constant()?);
        }

        loop {
            match self.at().kind {
                Kind::Auto | Kind::AutoReadOnly => {
                    if header.auto.is_some() {
                        return Err(Diagnostic::from_token(self.at(), "at most one of 'Auto' or 'AutoReadOnly'"));
                    }
                    header.auto = Some(self.next_token());
                    continue;
                }
                Kind::Hidden => header.hidden = true,
                Kind::Conditional => header.conditional = true,
                _ => break,
            }
            self.next_token();
        }

        header.line_end = self.last_end;
        self.end_of_declaration("property declaration")
    }

    fn parse_property_functions(
        &mut self,
        keyword: &Token,
        name: &Identifier,
    ) -> (Option<Box<FunctionDecl>>, Option<Box<FunctionDecl>>) {
        let mut getter: Option<Box<FunctionDecl>> = None;
        let mut setter: Option<Box<FunctionDecl>> = None;

        self.open_blocks.push(PROPERTY_CLOSERS);
        loop {
            self.skip_newlines();
            match self.at().kind {
                Kind::EndProperty => {
                    self.next_token();
                    self.finish_line("'EndProperty'");
                    break;
                }
                Kind::DocComment => {
                    self.next_token();
                }
                _ if self.at_function_start() => {
                    let function = match self.parse_property_function() {
                        Ok(function) => function,
                        Err(diagnostic) => {
                            self.report(diagnostic);
                            self.skip_line();
                            continue;
                        }
                    };
                    let slot = if function.name.is("Get") {
                        if !function.params.is_empty() {
                            self.report(Diagnostic::syntax(
                                function.name.span.start,
                                "property 'Get' function cannot take parameters",
                            ));
                        }
                        &mut getter
                    } else if function.name.is("Set") {
                        if function.params.len() != 1 {
                            self.report(Diagnostic::syntax(
                                function.name.span.start,
                                "property 'Set' function must take exactly one parameter",
                            ));
                        }
                        &mut setter
                    } else {
                        self.report(Diagnostic::syntax(
                            function.name.span.start,
                            format!(
                                "property function '{}' must be named \"Get\" or \"Set\"",
                                function.name.name
                            ),
                        ));
                        continue;
                    };
                    if slot.is_some() {
                        self.report(Diagnostic::syntax(
                            function.name.span.start,
                            format!(
                                "property '{}' already defines a '{}' function",
                                name.name, function.name.name
                            ),
                        ));
                    } else {
                        *slot = Some(Box::new(function));
                    }
                }
                _ if self.is_eof() || self.at_member_start() => {
                    let diagnostic = self.unterminated(keyword, "property", Kind::EndProperty);
                    self.report(diagnostic);
                    break;
                }
                _ => {
                    self.report(Diagnostic::from_token(
                        self.at(),
                        "a 'Get' or 'Set' function or 'EndProperty'",
                    ));
                    self.skip_line();
                }
            }
        }
        self.open_blocks.pop();

        if getter.is_none() && setter.is_none() {
            self.report(Diagnostic::syntax(
                keyword.span.start,
                format!("full property '{}' must define a Get or Set function", name.name),
            ));
        }
        (getter, setter)
    }

    fn parse_property_function(&mut self) -> Result<FunctionDecl, Diagnostic> {
        if self.check(Kind::Function) {
            return self.parse_function(None);
        }
        let ty = self.parse_type()?;
        self.parse_function(Some(ty))
    }

    /// Parses a state block. Anything other than an event inside the state is
    /// reported and then parsed as if it had been declared outside it.
    fn parse_state(&mut self, members: &mut Vec<Member>) -> Result<StateDecl, Diagnostic> {
        let start = self.at().span.start;
        let auto = self.check(Kind::Auto);
        if auto {
            self.next_token();
        }
        let keyword = self.eat(Kind::State, "")?;
        let name = self.parse_identifier("state name")?;
        self.end_of_statement("state declaration")?;

        let mut events = Vec::new();
        self.open_blocks.push(STATE_CLOSERS);
        loop {
            self.skip_newlines();
            match self.at().kind {
                Kind::EndState => {
                    self.next_token();
                    self.finish_line("'EndState'");
                    break;
                }
                Kind::DocComment => {
                    self.next_token();
                }
                Kind::Event => match self.parse_event() {
                    Ok(event) => events.push(event),
                    Err(diagnostic) => {
                        self.report(diagnostic);
                        self.skip_line();
                    }
                },
                Kind::EOF | Kind::State | Kind::Scriptname | Kind::Import => {
                    let diagnostic = self.unterminated(&keyword, "state", Kind::EndState);
                    self.report(diagnostic);
                    break;
                }
                Kind::Auto if self.peek_kind(1) == Kind::State => {
                    let diagnostic = self.unterminated(&keyword, "state", Kind::EndState);
                    self.report(diagnostic);
                    break;
                }
                _ if self.at_member_start() || self.at_variable_start() => {
                    let token = self.at().clone();
                    tracing::debug!(line = token.line(), state = %name.name, "hoisting member out of state");
                    self.report(Diagnostic {
                        found: Some(token.kind),
                        ..Diagnostic::syntax(
                            token.span.start,
                            format!(
                                "only events may be declared inside state '{}'; this declaration is treated as outside the state",
                                name.name
                            ),
                        )
                    });
                    let terminator = self.member_terminator();
                    if let Err(diagnostic) = self.parse_member(members) {
                        self.report(diagnostic);
                        self.skip_member(terminator);
                    }
                }
                _ => {
                    self.report(Diagnostic::from_token(self.at(), "an 'Event' declaration or 'EndState'"));
                    self.skip_line();
                }
            }
        }
        self.open_blocks.pop();

        Ok(StateDecl {
            name,
            auto,
            events,
            span: self.span_from(start),
        })
    }

    /// Parses statements until one of `closers`, a member declaration, or a
    /// terminator owned by an enclosing block. The closer is not consumed.
    fn parse_block(&mut self, closers: &'static [Kind]) -> Vec<Statement> {
        self.open_blocks.push(closers);
        let mut statements = Vec::new();

        loop {
            self.skip_newlines();
            let kind = self.at().kind;
            if kind == Kind::EOF || closers.contains(&kind) || self.at_member_start() {
                break;
            }
            if grammar::is_block_terminator(kind) {
                if self.open_blocks.iter().any(|open| open.contains(&kind)) {
                    break;
                }
                let token = self.next_token();
                self.report(Diagnostic {
                    found: Some(kind),
                    ..Diagnostic::syntax(
                        token.span.start,
                        format!("unexpected {} with no matching block", grammar::describe(kind)),
                    )
                });
                continue;
            }
            if kind == Kind::DocComment {
                self.next_token();
                continue;
            }

            match self.parse_statement() {
                Ok(Some(statement)) => statements.push(statement),
                Ok(None) => {}
                Err(diagnostic) => {
                    self.report(diagnostic);
                    self.synchronize();
                }
            }
        }

        self.open_blocks.pop();
        statements
    }

    fn parse_statement(&mut self) -> Result<Option<Statement>, Diagnostic> {
        match self.at().kind {
            Kind::If => Ok(self.parse_if()),
            Kind::While => Ok(self.parse_while()),
            Kind::Return => self.parse_return().map(Some),
            _ if self.at_variable_start() => self.parse_declare().map(Some),
            _ => self.parse_expression_statement().map(Some),
        }
    }

    fn parse_return(&mut self) -> Result<Statement, Diagnostic> {
        let keyword = self.eat(Kind::Return, "")?;
        let value = if matches!(self.at().kind, Kind::Newline | Kind::EOF) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let span = self.span_from(keyword.span.start);
        self.end_of_statement("return statement")?;
        Ok(Statement::Return(Return { value, span }))
    }

    fn parse_declare(&mut self) -> Result<Statement, Diagnostic> {
        let ty = self.parse_type()?;
        let name = self.parse_identifier("variable name")?;
        let initializer = if self.check(Kind::Assign) {
            self.next_token();
            Some(self.parse_expression()?)
        } else {
            None
        };
        let span = self.span_from(ty.span.start);
        self.end_of_statement("variable declaration")?;
        Ok(Statement::Declare(Declare {
            ty,
            name,
            initializer,
            span,
        }))
    }

    /// A bare expression line. If its outermost operator is an assignment the
    /// line becomes an [`Assign`]; assignment never nests inside expressions.
    fn parse_expression_statement(&mut self) -> Result<Statement, Diagnostic> {
        let start = self.at().span.start;
        let expr = self.parse_expression()?;

        let statement = match grammar::assignment_operator(self.at().kind) {
            Some(op) => {
                if !expr.is_assignable() {
                    return Err(Diagnostic::syntax(
                        expr.span().start,
                        "invalid assignment target; expected a variable, property or array element",
                    ));
                }
                self.next_token();
                let value = self.parse_expression()?;
                if grammar::assignment_operator(self.at().kind).is_some() {
                    let token = self.at();
                    return Err(Diagnostic {
                        found: Some(token.kind),
                        ..Diagnostic::syntax(
                            token.span.start,
                            "chained assignment is not allowed; assignment is a statement, not an expression",
                        )
                    });
                }
                Statement::Assign(Assign {
                    target: expr,
                    op,
                    value,
                    span: self.span_from(start),
                })
            }
            None => Statement::Expression(ExprStmt {
                span: expr.span(),
                expr,
            }),
        };

        self.end_of_statement("statement")?;
        Ok(statement)
    }

    /// Returns `None` when a condition could not be parsed. The block is still
    /// consumed through `EndIf` so the error does not cascade.
    fn parse_if(&mut self) -> Option<Statement> {
        let keyword = self.next_token();
        let mut branches = Vec::new();
        let mut else_body: Option<Vec<Statement>> = None;
        let mut complete = true;

        let condition = self.parse_condition("'If' condition");
        let body = self.parse_block(IF_CLOSERS);
        match condition {
            Some(condition) => branches.push(Branch {
                condition,
                body,
                span: self.span_from(keyword.span.start),
            }),
            None => complete = false,
        }

        loop {
            match self.at().kind {
                Kind::ElseIf => {
                    let token = self.next_token();
                    if else_body.is_some() {
                        self.report(Diagnostic::syntax(token.span.start, "'ElseIf' cannot follow 'Else'"));
                    }
                    let condition = self.parse_condition("'ElseIf' condition");
                    let body = self.parse_block(IF_CLOSERS);
                    match condition {
                        Some(condition) if else_body.is_none() => branches.push(Branch {
                            condition,
                            body,
                            span: self.span_from(token.span.start),
                        }),
                        Some(_) => {}
                        None => complete = false,
                    }
                }
                Kind::Else => {
                    let token = self.next_token();
                    self.finish_line("'Else'");
                    let body = self.parse_block(IF_CLOSERS);
                    if else_body.is_some() {
                        self.report(Diagnostic::syntax(token.span.start, "'If' statement has more than one 'Else'"));
                    } else {
                        else_body = Some(body);
                    }
                }
                Kind::EndIf => {
                    self.next_token();
                    self.finish_line("'EndIf'");
                    break;
                }
                _ => {
                    let diagnostic = self.unterminated(&keyword, "If block", Kind::EndIf);
                    self.report(diagnostic);
                    break;
                }
            }
        }

        if !complete {
            return None;
        }
        Some(Statement::If(If {
            branches,
            else_body,
            span: self.span_from(keyword.span.start),
        }))
    }

    fn parse_while(&mut self) -> Option<Statement> {
        let keyword = self.next_token();
        let condition = self.parse_condition("'While' condition");
        let body = self.parse_block(WHILE_CLOSERS);

        if self.check(Kind::EndWhile) {
            self.next_token();
            self.finish_line("'EndWhile'");
        } else {
            let diagnostic = self.unterminated(&keyword, "While block", Kind::EndWhile);
            self.report(diagnostic);
        }

        Some(Statement::While(While {
            condition: condition?,
            body,
            span: self.span_from(keyword.span.start),
        }))
    }

    fn parse_condition(&mut self, context: &str) -> Option<Expression> {
        match self.parse_expression() {
            Ok(condition) => {
                if let Err(diagnostic) = self.end_of_statement(context) {
                    self.report(diagnostic);
                    self.synchronize();
                }
                Some(condition)
            }
            Err(diagnostic) => {
                self.report(diagnostic);
                self.synchronize();
                None
            }
        }
    }

    pub(crate) fn parse_identifier(&mut self, what: &str) -> Result<Identifier, Diagnostic> {
        if !self.check(Kind::Identifier) {
            return Err(Diagnostic::from_token(self.at(), &format!("a {}", what)));
        }
        let token = self.next_token();
        Ok(Identifier::new(token.value, token.span))
    }

    pub(crate) fn at_type_start(&self) -> bool {
        grammar::is_type_keyword(self.at().kind) || self.check(Kind::Identifier)
    }

    /// Token offset just past a type at the cursor, accounting for `[]`.
    fn type_len(&self) -> usize {
        if self.peek_kind(1) == Kind::LBracket && self.peek_kind(2) == Kind::RBracket {
            3
        } else {
            1
        }
    }

    fn at_function_start(&self) -> bool {
        self.check(Kind::Function)
            || (self.at_type_start() && self.peek_kind(self.type_len()) == Kind::Function)
    }

    /// Whether the current line opens a function, event, state, property,
    /// import or header. Variables are excluded because inside a body the
    /// same shape is a local declaration.
    fn at_member_start(&self) -> bool {
        match self.at().kind {
            Kind::Function | Kind::Event | Kind::State | Kind::Import | Kind::Scriptname => true,
            Kind::Auto => self.peek_kind(1) == Kind::State,
            _ if self.at_type_start() => {
                matches!(self.peek_kind(self.type_len()), Kind::Function | Kind::Property)
            }
            _ => false,
        }
    }

    fn at_variable_start(&self) -> bool {
        self.at_type_start() && self.peek_kind(self.type_len()) == Kind::Identifier
    }

    fn skip_newlines(&mut self) {
        while self.check(Kind::Newline) {
            self.next_token();
        }
    }

    fn end_of_statement(&mut self, context: &str) -> Result<(), Diagnostic> {
        match self.at().kind {
            Kind::Newline => {
                self.next_token();
                Ok(())
            }
            Kind::EOF => Ok(()),
            _ => Err(Diagnostic::from_token(
                self.at(),
                &format!("end of line after {}", context),
            )),
        }
    }

    /// Ends a declaration line and picks up a documentation comment written
    /// either at the end of the line or alone on the next one.
    fn end_of_declaration(&mut self, context: &str) -> Result<Option<String>, Diagnostic> {
        let mut doc = None;
        if self.check(Kind::DocComment) {
            doc = Some(self.next_token().value);
        }
        self.end_of_statement(context)?;
        if doc.is_none() && self.check(Kind::DocComment) {
            doc = Some(self.next_token().value);
            self.end_of_statement("documentation comment")?;
        }
        Ok(doc)
    }

    /// Like `end_of_statement`, but reports instead of failing.
    fn finish_line(&mut self, context: &str) {
        if let Err(diagnostic) = self.end_of_statement(context) {
            self.report(diagnostic);
            self.skip_line();
        }
    }

    fn skip_line(&mut self) {
        while !self.is_eof() {
            if self.discard().kind == Kind::Newline {
                break;
            }
        }
    }

    /// Discards the rest of a broken statement: through the next line break,
    /// or up to a block keyword, whichever comes first.
    fn synchronize(&mut self) {
        loop {
            match self.at().kind {
                Kind::Newline => {
                    self.next_token();
                    break;
                }
                Kind::EOF => break,
                kind if grammar::is_block_terminator(kind) => break,
                _ => {
                    self.discard();
                }
            }
        }
        tracing::trace!(line = self.at().line(), "resynchronized after statement error");
    }

    /// Skips whole lines until one starts a member declaration.
    fn recover_to_member(&mut self) {
        self.skip_line();
        loop {
            self.skip_newlines();
            if self.is_eof() || self.at_member_start() || self.at_variable_start() {
                break;
            }
            self.skip_line();
        }
        tracing::trace!(line = self.at().line(), "resynchronized at member boundary");
    }

    /// The keyword closing the member that starts at the cursor, if it has a
    /// body.
    fn member_terminator(&self) -> Option<Kind> {
        match self.at().kind {
            Kind::Event => Some(Kind::EndEvent),
            Kind::State | Kind::Auto => Some(Kind::EndState),
            _ if self.at_function_start() => Some(Kind::EndFunction),
            _ if self.at_member_start() => Some(Kind::EndProperty),
            _ => None,
        }
    }

    /// Skips a member whose declaration line failed, through `terminator`
    /// when the body is there. Stops early at the next member or at a
    /// terminator owned by an enclosing block.
    fn skip_member(&mut self, terminator: Option<Kind>) {
        let Some(terminator) = terminator else {
            if self.open_blocks.is_empty() {
                self.recover_to_member();
            } else {
                self.skip_line();
            }
            return;
        };
        self.skip_line();
        self.skip_newlines();
        if terminator == Kind::EndProperty && !self.at_function_start() {
            return;
        }

        loop {
            self.skip_newlines();
            let kind = self.at().kind;
            if kind == terminator {
                self.skip_line();
                break;
            }
            let nested = match terminator {
                Kind::EndProperty => self.at_function_start(),
                Kind::EndState => kind == Kind::Event,
                _ => false,
            };
            if self.is_eof()
                || (self.at_member_start() && !nested)
                || self.open_blocks.iter().any(|open| open.contains(&kind))
            {
                break;
            }
            self.skip_line();
        }
        tracing::trace!(line = self.at().line(), "skipped broken {}", grammar::describe(terminator));
    }

    fn unterminated(&self, opener: &Token, what: &str, terminator: Kind) -> Diagnostic {
        let found = self.at();
        Diagnostic {
            found: Some(found.kind),
            ..Diagnostic::syntax(
                opener.span.start,
                format!(
                    "unterminated {}: expected {} to close {} on line {} but found {}",
                    what,
                    grammar::describe(terminator),
                    grammar::describe(opener.kind),
                    opener.line(),
                    grammar::describe(found.kind),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::types::DataType;

    fn parse(source: &str) -> (Script, Vec<Diagnostic>) {
        parse_script(Lexer::new(source))
    }

    fn parse_clean(source: &str) -> Script {
        let (script, diagnostics) = parse(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:#?}", diagnostics);
        script
    }

    #[test]
    fn header_with_parent_and_flags() {
        let script = parse_clean("Scriptname Foo extends ObjectReference Hidden Conditional\n{ The foo }\n");
        assert_eq!(script.name.name, "Foo");
        assert_eq!(script.parent.as_ref().map(|p| p.name.as_str()), Some("ObjectReference"));
        assert!(script.flags.hidden);
        assert!(script.flags.conditional);
        assert!(!script.flags.native);
        assert_eq!(script.doc.as_deref(), Some("The foo"));
    }

    #[test]
    fn missing_header_is_reported() {
        let (script, diagnostics) = parse("Function Foo()\nEndFunction\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'Scriptname'"));
        assert_eq!(script.name.name, "");
        assert_eq!(script.members.len(), 1);
    }

    #[test]
    fn duplicate_header_is_reported() {
        let (_, diagnostics) = parse("Scriptname A\nScriptname B\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 2);
        assert!(diagnostics[0].message.contains("duplicate"));
    }

    #[test]
    fn imports_are_collected() {
        let script = parse_clean("Scriptname Foo\nImport Utility\nimport Debug\n");
        let names: Vec<&str> = script.imports.iter().map(|i| i.name.name.as_str()).collect();
        assert_eq!(names, vec!["Utility", "Debug"]);
    }

    #[test]
    fn script_variables() {
        let script = parse_clean("Scriptname Foo\nInt count = -5 Conditional\nActor[] actors\n");
        match &script.members[0] {
            Member::Variable(var) => {
                assert_eq!(var.ty.data_type, DataType::Int);
                assert_eq!(var.name.name, "count");
                assert_eq!(var.initializer.as_ref().map(|l| &l.value), Some(&LiteralValue::Int(-5)));
                assert!(var.conditional);
            }
            other => panic!("expected variable, got {:?}", other),
        }
        match &script.members[1] {
            Member::Variable(var) => {
                assert_eq!(var.ty.data_type, DataType::Object("Actor".to_string()));
                assert!(var.ty.is_array);
            }
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn auto_properties() {
        let script = parse_clean(
            "Scriptname Foo\n\
             Actor Property PlayerRef Auto { The player }\n\
             Int Property Max = 10 AutoReadOnly Hidden\n\
             Float Property Speed = 1.5 Auto Conditional\n",
        );
        let props: Vec<&PropertyDecl> = script
            .members
            .iter()
            .filter_map(|m| match m {
                Member::Property(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(props.len(), 3);
        assert_eq!(props[0].kind, PropertyKind::Auto { initializer: None });
        assert_eq!(props[0].doc.as_deref(), Some("The player"));
        assert!(matches!(
            &props[1].kind,
            PropertyKind::AutoReadOnly { initializer } if initializer.value == LiteralValue::Int(10)
        ));
        assert!(props[1].hidden);
        assert!(props[2].conditional);
    }

    #[test]
    fn auto_read_only_requires_value() {
        let (_, diagnostics) = parse("Scriptname Foo\nInt Property Max AutoReadOnly\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("requires an initial value"));
    }

    #[test]
    fn full_property_with_accessors() {
        let script = parse_clean(
            "Scriptname Foo\n\
             Int Property Health Hidden\n\
             Int Function Get()\n\
             return 5\n\
             EndFunction\n\
             Function Set(Int value)\n\
             EndFunction\n\
             EndProperty\n",
        );
        match &script.members[0] {
            Member::Property(prop) => {
                assert!(prop.hidden);
                match &prop.kind {
                    PropertyKind::Full { getter, setter } => {
                        assert_eq!(getter.as_ref().map(|f| f.body.len()), Some(1));
                        assert_eq!(setter.as_ref().map(|f| f.params.len()), Some(1));
                    }
                    other => panic!("expected full property, got {:?}", other),
                }
            }
            other => panic!("expected property, got {:?}", other),
        }
    }

    #[test]
    fn full_property_rejects_misnamed_and_duplicate_accessors() {
        let (_, diagnostics) = parse(
            "Scriptname Foo\n\
             Int Property Health\n\
             Int Function Fetch()\n\
             EndFunction\n\
             Int Function Get()\n\
             EndFunction\n\
             Int Function get()\n\
             EndFunction\n\
             EndProperty\n",
        );
        assert_eq!(diagnostics.len(), 2, "{:#?}", diagnostics);
        assert!(diagnostics[0].message.contains("must be named"));
        assert!(diagnostics[1].message.contains("already defines"));
    }

    #[test]
    fn functions_with_flags_and_defaults() {
        let script = parse_clean(
            "Scriptname Foo\n\
             Float Function Scale(Float value, Float factor = 2.0, Bool clamp = false) Global\n\
             return value * factor\n\
             EndFunction\n\
             Function Wait(Float seconds) Global Native\n",
        );
        let scale = script.function("scale").unwrap();
        assert!(scale.flags.global);
        assert!(!scale.flags.native);
        assert_eq!(scale.params.len(), 3);
        assert_eq!(scale.params[1].default.as_ref().map(|l| &l.value), Some(&LiteralValue::Float(2.0)));
        assert_eq!(scale.return_type.as_ref().map(|t| t.data_type.clone()), Some(DataType::Float));

        let wait = script.function("Wait").unwrap();
        assert!(wait.flags.native);
        assert!(wait.body.is_empty());
    }

    #[test]
    fn states_hold_events() {
        let script = parse_clean(
            "Scriptname Foo\n\
             Auto State Waiting\n\
             Event OnActivate(ObjectReference akActionRef)\n\
             GotoState(\"Done\")\n\
             EndEvent\n\
             EndState\n\
             State Done\n\
             EndState\n",
        );
        match &script.members[0] {
            Member::State(state) => {
                assert!(state.auto);
                assert_eq!(state.name.name, "Waiting");
                assert_eq!(state.events.len(), 1);
                assert_eq!(state.events[0].params[0].name.name, "akActionRef");
            }
            other => panic!("expected state, got {:?}", other),
        }
        assert!(matches!(&script.members[1], Member::State(s) if !s.auto && s.events.is_empty()));
    }

    #[test]
    fn functions_inside_states_are_reported_and_hoisted() {
        let (script, diagnostics) = parse(
            "Scriptname Foo\n\
             State Busy\n\
             Function Helper()\n\
             EndFunction\n\
             Event OnInit()\n\
             EndEvent\n\
             EndState\n",
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 3);
        assert!(diagnostics[0].message.contains("only events"));
        assert!(script.function("Helper").is_some());
        let state = script
            .members
            .iter()
            .find_map(|m| match m {
                Member::State(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert_eq!(state.events.len(), 1);
    }

    #[test]
    fn if_chains_build_ordered_branches() {
        let script = parse_clean(
            "Scriptname Foo\n\
             Function F(Int x)\n\
             If x == 1\n\
             x = 2\n\
             ElseIf x == 2\n\
             x = 3\n\
             ElseIf x == 3\n\
             Else\n\
             x += 1\n\
             EndIf\n\
             EndFunction\n",
        );
        let body = &script.function("F").unwrap().body;
        match &body[0] {
            Statement::If(node) => {
                assert_eq!(node.branches.len(), 3);
                assert_eq!(node.branches[0].body.len(), 1);
                assert!(node.branches[2].body.is_empty());
                let else_body = node.else_body.as_ref().unwrap();
                assert!(matches!(&else_body[0], Statement::Assign(a) if a.op == AssignOp::Add));
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn while_and_local_declarations() {
        let script = parse_clean(
            "Scriptname Foo\n\
             Event OnInit()\n\
             Int i = 0\n\
             Actor[] found = new Actor[10]\n\
             While i < found.Length\n\
             found[i] = None\n\
             i += 1\n\
             EndWhile\n\
             EndEvent\n",
        );
        let event = match &script.members[0] {
            Member::Event(e) => e,
            other => panic!("expected event, got {:?}", other),
        };
        assert_eq!(event.body.len(), 3);
        assert!(matches!(&event.body[0], Statement::Declare(d) if d.name.name == "i"));
        match &event.body[2] {
            Statement::While(node) => {
                assert!(matches!(&node.condition, Expression::Binary(b) if matches!(*b.right, Expression::ArrayLength(_))));
                assert!(matches!(&node.body[0], Statement::Assign(a) if matches!(a.target, Expression::Index(_))));
            }
            other => panic!("expected While, got {:?}", other),
        }
    }

    #[test]
    fn expression_lines_become_assignments_only_at_top() {
        let script = parse_clean("Scriptname Foo\nFunction F()\nself.count = 1\nDebug.Trace(\"x\")\nEndFunction\n");
        let body = &script.function("F").unwrap().body;
        assert!(matches!(&body[0], Statement::Assign(a) if matches!(a.target, Expression::MemberAccess(_))));
        assert!(matches!(&body[1], Statement::Expression(e) if matches!(e.expr, Expression::Call(_))));
    }

    #[test]
    fn invalid_assignment_targets_are_reported() {
        let (_, diagnostics) = parse("Scriptname Foo\nFunction F()\n1 + 2 = 3\na = b = c\nEndFunction\n");
        assert_eq!(diagnostics.len(), 2, "{:#?}", diagnostics);
        assert!(diagnostics[0].message.contains("invalid assignment target"));
        assert!(diagnostics[1].message.contains("chained assignment"));
    }

    #[test]
    fn unterminated_if_points_at_opening_line() {
        let (script, diagnostics) = parse(
            "Scriptname Foo\n\
             Function F()\n\
             If true\n\
             EndFunction\n",
        );
        assert_eq!(diagnostics.len(), 1, "{:#?}", diagnostics);
        assert_eq!(diagnostics[0].line, 3);
        assert!(diagnostics[0].message.contains("unterminated If block"));
        assert!(script.function("F").is_some());
    }

    #[test]
    fn mismatched_terminator_is_reported_once() {
        let (script, diagnostics) = parse(
            "Scriptname Foo\n\
             Function F()\n\
             EndEvent\n\
             Function G()\n\
             EndFunction\n",
        );
        assert_eq!(diagnostics.len(), 2, "{:#?}", diagnostics);
        assert!(diagnostics[0].message.contains("no matching block"));
        assert!(diagnostics[1].message.contains("unterminated function body"));
        assert_eq!(diagnostics[1].line, 2);
        assert!(script.function("G").is_some());
    }

    #[test]
    fn bad_condition_drops_statement_but_keeps_block_structure() {
        let (script, diagnostics) = parse(
            "Scriptname Foo\n\
             Function F()\n\
             If x ==\n\
             y = 1\n\
             EndIf\n\
             z = 2\n\
             EndFunction\n",
        );
        assert_eq!(diagnostics.len(), 1, "{:#?}", diagnostics);
        assert_eq!(diagnostics[0].line, 3);
        let body = &script.function("F").unwrap().body;
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn top_level_junk_is_skipped_to_next_member() {
        let (script, diagnostics) = parse(
            "Scriptname Foo\n\
             x = 5\n\
             return 2\n\
             Function F()\n\
             EndFunction\n",
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 2);
        assert!(script.function("F").is_some());
    }

    #[test]
    fn broken_property_header_keeps_its_accessors() {
        let (script, diagnostics) = parse(
            "Scriptname Foo\n\
             Int Property P Foo\n\
             Int Function Get()\n\
             return 1\n\
             EndFunction\n\
             EndProperty\n",
        );
        assert_eq!(diagnostics.len(), 1, "{:#?}", diagnostics);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (2, 16));
        assert!(script.function("Get").is_none());
        match &script.members[..] {
            [Member::Property(property)] => {
                assert_eq!(property.name.name, "P");
                assert!(matches!(&property.kind, PropertyKind::Full { getter: Some(_), setter: None }));
            }
            other => panic!("expected a single property, got {:?}", other),
        }
    }

    #[test]
    fn broken_auto_property_header_is_reported_once() {
        let (script, diagnostics) = parse("Scriptname Foo\nInt Property P = 1 Auto Auto\nInt y\n");
        assert_eq!(diagnostics.len(), 1, "{:#?}", diagnostics);
        assert_eq!(script.members.len(), 2);
    }

    #[test]
    fn broken_function_header_skips_its_body() {
        let (script, diagnostics) = parse(
            "Scriptname Foo\n\
             Function 1()\n\
             Int x = 1\n\
             EndFunction\n\
             Function G()\n\
             EndFunction\n",
        );
        assert_eq!(diagnostics.len(), 1, "{:#?}", diagnostics);
        assert_eq!(diagnostics[0].line, 2);
        assert_eq!(script.members.len(), 1);
        assert!(script.function("G").is_some());
    }

    #[test]
    fn broken_function_inside_state_is_reported_once() {
        let (script, diagnostics) = parse(
            "Scriptname Foo\n\
             State S\n\
             Function 1()\n\
             x = 1\n\
             y = 2\n\
             EndFunction\n\
             Event OnInit()\n\
             EndEvent\n\
             EndState\n",
        );
        assert_eq!(diagnostics.len(), 2, "{:#?}", diagnostics);
        assert!(diagnostics[0].message.contains("only events"));
        assert!(diagnostics.iter().all(|d| d.line == 3));
        match &script.members[..] {
            [Member::State(state)] => assert_eq!(state.events.len(), 1),
            other => panic!("expected a single state, got {:?}", other),
        }
    }

    #[test]
    fn lexical_errors_on_skipped_lines_are_still_reported() {
        let (script, diagnostics) = parse(
            "Scriptname Foo\n\
             x = 5\n\
             \"never closed\n\
             Function F()\n\
             y = ) #\n\
             EndFunction\n",
        );
        let found: Vec<(usize, crate::error::DiagnosticKind)> =
            diagnostics.iter().map(|d| (d.line, d.kind)).collect();
        use crate::error::DiagnosticKind::{Lexical, Syntax};
        assert_eq!(found, vec![(2, Syntax), (3, Lexical), (5, Syntax), (5, Lexical)], "{:#?}", diagnostics);
        assert!(script.function("F").is_some());
    }

    #[test]
    fn invalid_tokens_surface_as_lexical_diagnostics() {
        let (_, diagnostics) = parse("Scriptname Foo\nFunction F()\nx = 1 # 2\ns = \"open\nEndFunction\n");
        assert_eq!(diagnostics.len(), 2, "{:#?}", diagnostics);
        assert_eq!(diagnostics[0].kind, crate::error::DiagnosticKind::Lexical);
        assert!(diagnostics[0].message.contains("'#'"));
        assert!(diagnostics[1].message.contains("unterminated string"));
        assert_eq!(diagnostics[1].line, 4);
    }

    #[test]
    fn node_spans_cover_first_to_last_token() {
        let script = parse_clean("Scriptname Foo\nFunction Bar()\nreturn 1 + 2\nEndFunction\n");
        let function = script.function("Bar").unwrap();
        assert_eq!(function.span.start, Position::new(2, 1));
        assert_eq!(function.span.end, Position::new(4, 12));
        let ret = function.body[0].span();
        assert_eq!(ret.start, Position::new(3, 1));
        assert_eq!(ret.end, Position::new(3, 13));
    }
}
