use crate::ast::*;
use crate::error::Diagnostic;
use crate::grammar::{self, Precedence};
use crate::parser::Parser;
use crate::token::{Kind, Token};
use crate::types::{DataType, Type};

/// Largest element count `New T[n]` may request.
pub const MAX_ARRAY_SIZE: i32 = 128;

/// Deepest expression nesting accepted before the parser gives up on a line.
pub const MAX_NESTING_DEPTH: usize = 64;

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> Result<Expression, Diagnostic> {
        self.nested(|parser| parser.parse_binary(Precedence::LogicalOr))
    }

    /// Precedence climbing over the binary operator table. Every binary level
    /// is left-associative, so `a - b - c` is `(a - b) - c`.
    fn parse_binary(&mut self, min: Precedence) -> Result<Expression, Diagnostic> {
        let mut left = self.parse_unary()?;

        while let Some((op, precedence)) = grammar::binary_operator(self.at().kind) {
            if precedence < min {
                break;
            }
            self.next_token();

            let right = self.parse_binary(precedence.next())?;
            let span = left.span().to(right.span());
            left = Expression::Binary(Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            });
        }

        Ok(left)
    }

    /// A `-` directly before an integer is folded into the literal, so
    /// `-2147483648` stays in range. Anything cast or indexed is left alone.
    fn parse_unary(&mut self) -> Result<Expression, Diagnostic> {
        if self.check(Kind::Minus)
            && self.peek_kind(1) == Kind::IntLiteral
            && !matches!(self.peek_kind(2), Kind::As | Kind::Dot | Kind::LBracket | Kind::LParen)
        {
            return Ok(Expression::Literal(self.parse_constant()?));
        }
        let Some(op) = grammar::unary_operator(self.at().kind) else {
            return self.parse_cast();
        };
        let token = self.next_token();
        let operand = self.nested(Self::parse_unary)?;
        let span = token.span.to(operand.span());
        Ok(Expression::Unary(Unary {
            op,
            operand: Box::new(operand),
            span,
        }))
    }

    fn parse_cast(&mut self) -> Result<Expression, Diagnostic> {
        let mut expr = self.parse_postfix()?;
        while self.check(Kind::As) {
            self.next_token();
            let target = self.parse_type()?;
            let span = expr.span().to(target.span);
            expr = Expression::Cast(Cast {
                expr: Box::new(expr),
                target,
                span,
            });
        }
        Ok(expr)
    }

    fn parse_postfix(&mut self) -> Result<Expression, Diagnostic> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.at().kind {
                Kind::Dot => {
                    self.next_token();
                    if self.check(Kind::Length) {
                        let token = self.next_token();
                        let span = expr.span().to(token.span);
                        expr = Expression::ArrayLength(ArrayLength {
                            array: Box::new(expr),
                            span,
                        });
                    } else {
                        let member = self.parse_identifier("member name after '.'")?;
                        let span = expr.span().to(member.span);
                        expr = Expression::MemberAccess(MemberAccess {
                            object: Box::new(expr),
                            member,
                            span,
                        });
                    }
                }
                Kind::LBracket => {
                    self.next_token();
                    let subscript = self.parse_expression()?;
                    let close = self.eat(Kind::RBracket, "to close the array index")?;
                    let span = expr.span().to(close.span);
                    expr = Expression::Index(Index {
                        array: Box::new(expr),
                        subscript: Box::new(subscript),
                        span,
                    });
                }
                Kind::LParen => {
                    if !matches!(expr, Expression::Identifier(_) | Expression::MemberAccess(_)) {
                        return Err(Diagnostic::syntax(
                            self.at().span.start,
                            "only a function name can be called",
                        ));
                    }
                    let (args, close) = self.parse_arguments()?;
                    let span = expr.span().to(close.span);
                    expr = Expression::Call(Call {
                        callee: Box::new(expr),
                        args,
                        span,
                    });
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<(Vec<Argument>, Token), Diagnostic> {
        self.eat(Kind::LParen, "to open the argument list")?;
        let mut args = Vec::new();

        if !self.check(Kind::RParen) {
            loop {
                let start = self.at().span.start;
                let name = if self.check(Kind::Identifier) && self.peek_kind(1) == Kind::Assign {
                    let token = self.next_token();
                    self.next_token();
                    Some(Identifier::new(token.value, token.span))
                } else {
                    None
                };
                let value = self.parse_expression()?;
                args.push(Argument {
                    name,
                    value,
                    span: self.span_from(start),
                });

                if !self.check(Kind::Comma) {
                    break;
                }
                self.next_token();
            }
        }

        let close = self.eat(Kind::RParen, "to close the argument list")?;
        Ok((args, close))
    }

    fn parse_primary(&mut self) -> Result<Expression, Diagnostic> {
        match self.at().kind {
            Kind::IntLiteral
            | Kind::FloatLiteral
            | Kind::StringLiteral
            | Kind::True
            | Kind::False
            | Kind::None
            | Kind::SelfRef
            | Kind::Parent => Ok(Expression::Literal(self.parse_literal()?)),
            Kind::Identifier => {
                let token = self.next_token();
                Ok(Expression::Identifier(Identifier::new(token.value, token.span)))
            }
            Kind::LParen => {
                self.next_token();
                let inner = self.parse_expression()?;
                self.eat(Kind::RParen, "to close the parenthesized expression")?;
                Ok(inner)
            }
            Kind::New => self.parse_new(),
            _ => Err(Diagnostic::from_token(self.at(), "an expression")),
        }
    }

    fn parse_new(&mut self) -> Result<Expression, Diagnostic> {
        let keyword = self.eat(Kind::New, "")?;
        let ty = self.parse_base_type()?;

        if !self.check(Kind::LBracket) {
            let span = keyword.span.to(ty.span);
            return Ok(Expression::New(New { ty, size: None, span }));
        }

        self.next_token();
        let size = self.parse_expression()?;
        if let Expression::Literal(Literal {
            value: LiteralValue::Int(count),
            span,
        }) = &size
        {
            if *count > MAX_ARRAY_SIZE {
                self.report(Diagnostic::syntax(
                    span.start,
                    format!("array size {} exceeds the maximum of {}", count, MAX_ARRAY_SIZE),
                ));
            }
        }
        let close = self.eat(Kind::RBracket, "to close the array size")?;

        Ok(Expression::New(New {
            ty: Type::new(ty.data_type, true, ty.span.to(close.span)),
            size: Some(Box::new(size)),
            span: keyword.span.to(close.span),
        }))
    }

    pub(crate) fn parse_literal(&mut self) -> Result<Literal, Diagnostic> {
        let value = match self.at().kind {
            Kind::IntLiteral => LiteralValue::Int(integer_value(self.at(), false)?),
            Kind::FloatLiteral => LiteralValue::Float(float_value(self.at(), false)?),
            Kind::StringLiteral => LiteralValue::String(self.at().value.clone()),
            Kind::True => LiteralValue::Bool(true),
            Kind::False => LiteralValue::Bool(false),
            Kind::None => LiteralValue::None,
            Kind::SelfRef => LiteralValue::SelfRef,
            Kind::Parent => LiteralValue::Parent,
            _ => return Err(Diagnostic::from_token(self.at(), "a literal value")),
        };
        let token = self.next_token();
        Ok(Literal {
            value,
            span: token.span,
        })
    }

    /// A literal in a default or initializer position. Numbers may carry a
    /// leading `-`, folded into the value.
    pub(crate) fn parse_constant(&mut self) -> Result<Literal, Diagnostic> {
        if !self.check(Kind::Minus) {
            return self.parse_literal();
        }
        let minus = self.next_token();
        let value = match self.at().kind {
            Kind::IntLiteral => LiteralValue::Int(integer_value(self.at(), true)?),
            Kind::FloatLiteral => LiteralValue::Float(float_value(self.at(), true)?),
            _ => return Err(Diagnostic::from_token(self.at(), "a number after '-'")),
        };
        let token = self.next_token();
        Ok(Literal {
            value,
            span: minus.span.to(token.span),
        })
    }

    /// A type with an optional `[]` suffix.
    pub(crate) fn parse_type(&mut self) -> Result<Type, Diagnostic> {
        let base = self.parse_base_type()?;
        if self.check(Kind::LBracket) && self.peek_kind(1) == Kind::RBracket {
            self.next_token();
            let close = self.next_token();
            return Ok(Type::new(base.data_type, true, base.span.to(close.span)));
        }
        Ok(base)
    }

    fn parse_base_type(&mut self) -> Result<Type, Diagnostic> {
        let token = self.at();
        let data_type = match token.kind {
            Kind::Bool => DataType::Bool,
            Kind::Int => DataType::Int,
            Kind::Float => DataType::Float,
            Kind::String => DataType::String,
            Kind::Identifier => DataType::Object(token.value.clone()),
            _ => return Err(Diagnostic::from_token(token, "a type name")),
        };
        let token = self.next_token();
        Ok(Type::new(data_type, false, token.span))
    }
}

/// Decimal literals must fit an `Int`. Hex literals are read as 32-bit
/// patterns, so `0xFFFFFFFF` is `-1`.
fn integer_value(token: &Token, negative: bool) -> Result<i32, Diagnostic> {
    let text = token.value.as_str();
    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"));

    let value = match hex {
        Some(digits) => u32::from_str_radix(digits, 16)
            .ok()
            .map(|bits| bits as i32)
            .map(|value| if negative { value.wrapping_neg() } else { value }),
        None if negative => format!("-{}", text).parse::<i32>().ok(),
        None => text.parse::<i32>().ok(),
    };

    value.ok_or_else(|| {
        Diagnostic::syntax(
            token.span.start,
            format!("integer literal '{}{}' is out of range", if negative { "-" } else { "" }, text),
        )
    })
}

fn float_value(token: &Token, negative: bool) -> Result<f32, Diagnostic> {
    let value: f32 = token.value.parse().map_err(|_| {
        Diagnostic::syntax(
            token.span.start,
            format!("malformed float literal '{}'", token.value),
        )
    })?;
    if value.is_infinite() {
        return Err(Diagnostic::syntax(
            token.span.start,
            format!("float literal '{}' is out of range", token.value),
        ));
    }
    Ok(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::lexer::Lexer;
    use crate::parser::parse_script;
    use crate::types::DataType;

    /// Parses `source` as the value of an assignment inside a function.
    fn expr(source: &str) -> Expression {
        let text = format!("Scriptname T\nFunction F()\nx = {}\nEndFunction\n", source);
        let (script, diagnostics) = parse_script(Lexer::new(&text));
        assert!(diagnostics.is_empty(), "{}: {:#?}", source, diagnostics);
        match &script.function("F").unwrap().body[0] {
            Statement::Assign(assign) => assign.value.clone(),
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    fn errors(source: &str) -> Vec<String> {
        let text = format!("Scriptname T\nFunction F()\nx = {}\nEndFunction\n", source);
        let (_, diagnostics) = parse_script(Lexer::new(&text));
        diagnostics.into_iter().map(|d| d.message).collect()
    }

    fn binary(expr: &Expression) -> (&BinaryOp, &Expression, &Expression) {
        match expr {
            Expression::Binary(b) => (&b.op, &b.left, &b.right),
            other => panic!("expected binary, got {:?}", other),
        }
    }

    fn int(value: i32) -> LiteralValue {
        LiteralValue::Int(value)
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let tree = expr("a + b * c");
        let (op, left, right) = binary(&tree);
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(left, Expression::Identifier(id) if id.name == "a"));
        assert_eq!(*binary(right).0, BinaryOp::Multiply);
    }

    #[test]
    fn subtraction_is_left_associative() {
        let tree = expr("10 - 4 - 3");
        let (op, left, right) = binary(&tree);
        assert_eq!(*op, BinaryOp::Subtract);
        assert_eq!(*binary(left).0, BinaryOp::Subtract);
        assert!(matches!(right, Expression::Literal(l) if l.value == int(3)));
    }

    #[test]
    fn logical_operators_layer_over_comparisons() {
        let tree = expr("a < 1 || b == 2 && c");
        let (op, left, right) = binary(&tree);
        assert_eq!(*op, BinaryOp::Or);
        assert_eq!(*binary(left).0, BinaryOp::Less);
        let (and, eq, _) = binary(right);
        assert_eq!(*and, BinaryOp::And);
        assert_eq!(*binary(eq).0, BinaryOp::Equal);
    }

    #[test]
    fn cast_binds_tighter_than_logical_and() {
        let tree = expr("a as Bool && b");
        let (op, left, _) = binary(&tree);
        assert_eq!(*op, BinaryOp::And);
        match left {
            Expression::Cast(cast) => assert_eq!(cast.target.data_type, DataType::Bool),
            other => panic!("expected cast, got {:?}", other),
        }
    }

    #[test]
    fn cast_applies_to_the_whole_postfix_chain() {
        match expr("a.b as Int") {
            Expression::Cast(cast) => {
                assert!(matches!(*cast.expr, Expression::MemberAccess(ref m) if m.member.name == "b"));
                assert_eq!(cast.target.data_type, DataType::Int);
            }
            other => panic!("expected cast, got {:?}", other),
        }
    }

    #[test]
    fn cast_binds_tighter_than_addition() {
        let tree = expr("a as Int + 1");
        let (op, left, right) = binary(&tree);
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(left, Expression::Cast(c) if matches!(*c.expr, Expression::Identifier(_))));
        assert!(matches!(right, Expression::Literal(l) if l.value == int(1)));
    }

    #[test]
    fn unary_applies_to_the_cast() {
        match expr("-a as Int") {
            Expression::Unary(unary) => {
                assert_eq!(unary.op, UnaryOp::Negate);
                assert!(matches!(*unary.operand, Expression::Cast(_)));
            }
            other => panic!("expected unary, got {:?}", other),
        }
        assert!(matches!(expr("!!done"), Expression::Unary(u) if matches!(*u.operand, Expression::Unary(_))));
    }

    #[test]
    fn parentheses_override_precedence() {
        let tree = expr("(a + b) * c");
        let (op, left, _) = binary(&tree);
        assert_eq!(*op, BinaryOp::Multiply);
        assert_eq!(*binary(left).0, BinaryOp::Add);
    }

    #[test]
    fn postfix_chains() {
        match expr("Game.GetPlayer().GetItems()[0].Length") {
            Expression::ArrayLength(length) => match *length.array {
                Expression::Index(index) => match *index.array {
                    Expression::Call(call) => {
                        assert!(matches!(*call.callee, Expression::MemberAccess(ref m) if m.member.name == "GetItems"));
                    }
                    other => panic!("expected call, got {:?}", other),
                },
                other => panic!("expected index, got {:?}", other),
            },
            other => panic!("expected length, got {:?}", other),
        }
    }

    #[test]
    fn named_and_positional_arguments() {
        match expr("Foo(1, abForce = true)") {
            Expression::Call(call) => {
                assert_eq!(call.args.len(), 2);
                assert!(call.args[0].name.is_none());
                assert_eq!(call.args[1].name.as_ref().map(|n| n.name.as_str()), Some("abForce"));
                assert!(matches!(&call.args[1].value, Expression::Literal(l) if l.value == LiteralValue::Bool(true)));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn object_literals() {
        assert!(matches!(expr("self"), Expression::Literal(l) if l.value == LiteralValue::SelfRef));
        assert!(matches!(expr("Parent"), Expression::Literal(l) if l.value == LiteralValue::Parent));
        assert!(matches!(expr("none"), Expression::Literal(l) if l.value == LiteralValue::None));
        assert!(matches!(expr("\"hi\""), Expression::Literal(l) if l.value == LiteralValue::String("hi".into())));
    }

    #[test]
    fn integer_ranges() {
        assert!(matches!(expr("2147483647"), Expression::Literal(l) if l.value == int(i32::MAX)));
        assert!(matches!(expr("0xFFFFFFFF"), Expression::Literal(l) if l.value == int(-1)));
        assert_eq!(errors("2147483648"), vec!["integer literal '2147483648' is out of range"]);
        assert!(matches!(expr("-2147483648"), Expression::Literal(l) if l.value == int(i32::MIN)));
        assert_eq!(errors("-2147483649"), vec!["integer literal '-2147483649' is out of range"]);

        let binding = expr("a - -1");
        let (op, _, right) = binary(&binding);
        assert_eq!(*op, BinaryOp::Subtract);
        assert!(matches!(right, Expression::Literal(l) if l.value == int(-1)));
    }

    #[test]
    fn nesting_depth_is_limited() {
        let shallow = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        assert!(matches!(expr(&shallow), Expression::Literal(l) if l.value == int(1)));

        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(errors(&deep), vec!["expression is nested more than 64 levels deep"]);
        assert_eq!(errors(&"-".repeat(100)), vec!["expression is nested more than 64 levels deep"]);
    }

    #[test]
    fn new_arrays_and_size_limit() {
        match expr("new Int[128]") {
            Expression::New(new) => {
                assert!(new.ty.is_array);
                assert_eq!(new.ty.data_type, DataType::Int);
                assert!(new.size.is_some());
            }
            other => panic!("expected new, got {:?}", other),
        }
        assert_eq!(errors("new Int[129]"), vec!["array size 129 exceeds the maximum of 128"]);
    }

    #[test]
    fn incomplete_expressions_name_what_was_found() {
        assert_eq!(errors("1 +"), vec!["expected an expression but found end of line"]);
        assert_eq!(errors("Foo(1"), vec!["expected ')' to close the argument list but found end of line"]);
        assert_eq!(errors("(1).Bar"), Vec::<String>::new());
        assert_eq!(errors("3(1)"), vec!["only a function name can be called"]);
    }
}
