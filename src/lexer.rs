use crate::grammar;
use crate::token::{Kind, LexicalError, Position, Span, Token};

/// Turns Papyrus source into tokens, one at a time.
///
/// Lexing never fails: characters that do not form a token come out as
/// [`Kind::Invalid`] and the parser decides how to report them. The stream
/// always ends with a single [`Kind::EOF`].
pub struct Lexer {
    chars: Vec<char>,
    current: usize,
    line: usize,
    column: usize,
    // Open `(` and `[` on the current logical line.
    depth: usize,
    // A line break swallowed inside brackets, kept in case the next line
    // shows the bracket was never closed.
    pending_newline: Option<Span>,
    queued: Option<Token>,
    last_kind: Option<Kind>,
    finished: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            current: 0,
            line: 1,
            column: 1,
            depth: 0,
            pending_newline: None,
            queued: None,
            last_kind: None,
            finished: false,
        }
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let tokens: Vec<Token> = self.by_ref().collect();
        tracing::trace!(count = tokens.len(), "tokenized source");
        tokens
    }

    fn at(&self) -> Option<char> {
        self.chars.get(self.current).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.current + offset).copied()
    }

    fn cursor(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.at()?;
        self.current += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut taken = String::new();
        while let Some(ch) = self.at() {
            if !predicate(ch) {
                break;
            }
            taken.push(ch);
            self.advance();
        }
        taken
    }

    fn create_token(&self, kind: Kind, value: impl Into<String>, start: Position) -> Token {
        Token::new(kind, value, Span::new(start, self.cursor()))
    }

    fn emit(&mut self, token: Token) -> Token {
        match token.kind {
            Kind::LParen | Kind::LBracket => self.depth += 1,
            Kind::RParen | Kind::RBracket => self.depth = self.depth.saturating_sub(1),
            Kind::Newline => self.depth = 0,
            Kind::EOF => self.finished = true,
            _ => {}
        }
        self.last_kind = Some(token.kind);
        token
    }

    fn scan(&mut self) -> Token {
        loop {
            let start = self.cursor();
            let Some(ch) = self.at() else {
                return self.create_token(Kind::EOF, "", start);
            };

            match ch {
                '\n' => {
                    self.advance();
                    if self.depth > 0 {
                        if self.pending_newline.is_none() {
                            self.pending_newline = Some(Span::new(start, self.cursor()));
                        }
                        continue;
                    }
                    if matches!(self.last_kind, None | Some(Kind::Newline)) {
                        continue;
                    }
                    return self.create_token(Kind::Newline, "\n", start);
                }
                ch if ch.is_whitespace() => {
                    self.advance();
                }
                ';' => {
                    if self.peek(1) == Some('/') {
                        if let Some(invalid) = self.skip_block_comment(start) {
                            return invalid;
                        }
                    } else {
                        self.advance_while(|c| c != '\n');
                    }
                }
                '\\' => {
                    if let Some(invalid) = self.line_continuation(start) {
                        return invalid;
                    }
                }
                '{' => return self.doc_comment(start),
                '"' => return self.string(start),
                ch if ch.is_ascii_digit() => return self.number(start),
                ch if ch.is_ascii_alphabetic() || ch == '_' => return self.identifier(start),
                ch => {
                    return match grammar::operator(&self.chars[self.current..]) {
                        Some((kind, len)) => {
                            let text: String = self.chars[self.current..self.current + len].iter().collect();
                            for _ in 0..len {
                                self.advance();
                            }
                            self.create_token(kind, text, start)
                        }
                        None => {
                            self.advance();
                            self.create_token(
                                Kind::Invalid(LexicalError::UnexpectedCharacter),
                                ch.to_string(),
                                start,
                            )
                        }
                    };
                }
            }
        }
    }

    /// Skips `;/ ... /;`. Line breaks inside the comment are not significant.
    fn skip_block_comment(&mut self, start: Position) -> Option<Token> {
        self.advance(); // ;
        self.advance(); // /
        loop {
            match self.advance() {
                Some('/') if self.at() == Some(';') => {
                    self.advance();
                    return None;
                }
                Some(_) => {}
                None => {
                    return Some(self.create_token(
                        Kind::Invalid(LexicalError::UnterminatedComment),
                        ";/",
                        start,
                    ))
                }
            }
        }
    }

    /// A `\` at the end of a line joins it with the next one. Trailing blanks
    /// and a line comment may sit between the two.
    fn line_continuation(&mut self, start: Position) -> Option<Token> {
        let mark = (self.current, self.line, self.column);
        self.advance();
        self.advance_while(|c| c == ' ' || c == '\t' || c == '\r');
        if self.at() == Some(';') && self.peek(1) != Some('/') {
            self.advance_while(|c| c != '\n');
        }
        match self.at() {
            Some('\n') => {
                self.advance();
                None
            }
            None => None,
            Some(_) => {
                (self.current, self.line, self.column) = mark;
                self.advance();
                Some(self.create_token(
                    Kind::Invalid(LexicalError::UnexpectedCharacter),
                    "\\",
                    start,
                ))
            }
        }
    }

    fn doc_comment(&mut self, start: Position) -> Token {
        self.advance(); // {
        let text = self.advance_while(|c| c != '}');
        if self.advance().is_none() {
            return self.create_token(Kind::Invalid(LexicalError::UnterminatedDocComment), "{", start);
        }
        self.create_token(Kind::DocComment, text.trim(), start)
    }

    fn string(&mut self, start: Position) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();
        let mut raw = String::new();
        let mut bad_escape = false;

        loop {
            match self.at() {
                None | Some('\n') => {
                    return self.create_token(Kind::Invalid(LexicalError::UnterminatedString), raw, start);
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    raw.push('\\');
                    match self.at() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        None | Some('\n') => continue,
                        Some(_) => bad_escape = true,
                    }
                    if let Some(escaped) = self.advance() {
                        raw.push(escaped);
                    }
                }
                Some(ch) => {
                    self.advance();
                    value.push(ch);
                    raw.push(ch);
                }
            }
        }

        if bad_escape {
            self.create_token(Kind::Invalid(LexicalError::InvalidEscape), raw, start)
        } else {
            self.create_token(Kind::StringLiteral, value, start)
        }
    }

    fn number(&mut self, start: Position) -> Token {
        let mut lexeme = String::new();
        let mut kind = Kind::IntLiteral;
        let mut malformed = false;

        if self.at() == Some('0') && matches!(self.peek(1), Some('x') | Some('X')) {
            lexeme.push(self.advance().unwrap_or('0'));
            lexeme.push(self.advance().unwrap_or('x'));
            let digits = self.advance_while(|c| c.is_ascii_hexdigit());
            malformed = digits.is_empty();
            lexeme.push_str(&digits);
        } else {
            lexeme.push_str(&self.advance_while(|c| c.is_ascii_digit()));

            if self.at() == Some('.') {
                self.advance();
                lexeme.push('.');
                let fraction = self.advance_while(|c| c.is_ascii_digit());
                malformed = fraction.is_empty();
                lexeme.push_str(&fraction);
                kind = Kind::FloatLiteral;
            }

            if matches!(self.at(), Some('e') | Some('E')) {
                let signed = matches!(self.peek(1), Some('+') | Some('-'));
                let digit_at = if signed { 2 } else { 1 };
                if self.peek(digit_at).map_or(false, |c| c.is_ascii_digit()) {
                    for _ in 0..digit_at {
                        lexeme.push(self.advance().unwrap_or('e'));
                    }
                    lexeme.push_str(&self.advance_while(|c| c.is_ascii_digit()));
                    kind = Kind::FloatLiteral;
                }
            }
        }

        // Digits running straight into letters, e.g. `12abc` or `1e`.
        let tail = self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
        if !tail.is_empty() {
            malformed = true;
            lexeme.push_str(&tail);
        }

        if malformed {
            self.create_token(Kind::Invalid(LexicalError::MalformedNumber), lexeme, start)
        } else {
            self.create_token(kind, lexeme, start)
        }
    }

    fn identifier(&mut self, start: Position) -> Token {
        let ident = self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let kind = grammar::keyword(&ident).unwrap_or(Kind::Identifier);
        self.create_token(kind, ident, start)
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }

        let token = match self.queued.take() {
            Some(token) => token,
            None => self.scan(),
        };

        if let Some(newline) = self.pending_newline.take() {
            if grammar::is_structural(token.kind) {
                tracing::trace!(line = newline.start.line, "unclosed bracket, restoring line break");
                self.queued = Some(token);
                return Some(self.emit(Token::new(Kind::Newline, "\n", newline)));
            }
        }

        Some(self.emit(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Kind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("ScriptName foo EXTENDS bar"),
            vec![Kind::Scriptname, Kind::Identifier, Kind::Extends, Kind::Identifier, Kind::EOF]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = kinds("x ; trailing\n;/ block\n spanning /; y");
        assert_eq!(tokens, vec![Kind::Identifier, Kind::Newline, Kind::Identifier, Kind::EOF]);
    }

    #[test]
    fn blank_lines_collapse_into_one_newline() {
        assert_eq!(
            kinds("\n\na\n\n\nb\n"),
            vec![Kind::Identifier, Kind::Newline, Kind::Identifier, Kind::Newline, Kind::EOF]
        );
    }

    #[test]
    fn newlines_inside_parentheses_are_suppressed() {
        assert_eq!(
            kinds("Foo(a,\n b)\n"),
            vec![
                Kind::Identifier,
                Kind::LParen,
                Kind::Identifier,
                Kind::Comma,
                Kind::Identifier,
                Kind::RParen,
                Kind::Newline,
                Kind::EOF
            ]
        );
    }

    #[test]
    fn unclosed_parenthesis_restores_line_break_before_keyword() {
        let tokens = Lexer::new("Function Bar(\nEndFunction\n").tokenize();
        let kinds: Vec<Kind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Kind::Function,
                Kind::Identifier,
                Kind::LParen,
                Kind::Newline,
                Kind::EndFunction,
                Kind::Newline,
                Kind::EOF
            ]
        );
        assert_eq!((tokens[3].line(), tokens[3].column()), (1, 14));
    }

    #[test]
    fn backslash_continues_a_line() {
        assert_eq!(
            kinds("a + \\ ; note\n b\n"),
            vec![Kind::Identifier, Kind::Plus, Kind::Identifier, Kind::Newline, Kind::EOF]
        );
    }

    #[test]
    fn strings_support_escapes() {
        let tokens = Lexer::new(r#""a\"b\n\\""#).tokenize();
        assert_eq!(tokens[0].kind, Kind::StringLiteral);
        assert_eq!(tokens[0].value, "a\"b\n\\");
    }

    #[test]
    fn unterminated_string_is_bound_to_its_line() {
        let tokens = Lexer::new("x = \"oops\ny").tokenize();
        assert_eq!(tokens[2].kind, Kind::Invalid(LexicalError::UnterminatedString));
        assert_eq!((tokens[2].line(), tokens[2].column()), (1, 5));
        assert_eq!(tokens[3].kind, Kind::Newline);
    }

    #[test]
    fn unknown_escape_is_invalid() {
        let tokens = Lexer::new(r#""\q""#).tokenize();
        assert_eq!(tokens[0].kind, Kind::Invalid(LexicalError::InvalidEscape));
    }

    #[test]
    fn numeric_literals() {
        let tokens = Lexer::new("12 1.5 0x1F 2e3 1.5E-2").tokenize();
        let pairs: Vec<(Kind, &str)> = tokens.iter().map(|t| (t.kind, t.value.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                (Kind::IntLiteral, "12"),
                (Kind::FloatLiteral, "1.5"),
                (Kind::IntLiteral, "0x1F"),
                (Kind::FloatLiteral, "2e3"),
                (Kind::FloatLiteral, "1.5E-2"),
                (Kind::EOF, ""),
            ]
        );
    }

    #[test]
    fn malformed_numbers_keep_their_lexeme() {
        for source in ["1.", "12abc", "0x", "3e"] {
            let tokens = Lexer::new(source).tokenize();
            assert_eq!(tokens[0].kind, Kind::Invalid(LexicalError::MalformedNumber), "{}", source);
            assert_eq!(tokens[0].value, source);
        }
    }

    #[test]
    fn unknown_characters_become_invalid_tokens() {
        let tokens = Lexer::new("a # b").tokenize();
        assert_eq!(tokens[1].kind, Kind::Invalid(LexicalError::UnexpectedCharacter));
        assert_eq!(tokens[1].value, "#");
        assert_eq!(tokens[2].kind, Kind::Identifier);
    }

    #[test]
    fn doc_comments_are_tokens() {
        let tokens = Lexer::new("{ Does things }\n").tokenize();
        assert_eq!(tokens[0].kind, Kind::DocComment);
        assert_eq!(tokens[0].value, "Does things");
    }

    #[test]
    fn operators_use_longest_match() {
        assert_eq!(
            kinds("a <= b && !c += 1"),
            vec![
                Kind::Identifier,
                Kind::LessEqual,
                Kind::Identifier,
                Kind::AndAnd,
                Kind::Bang,
                Kind::Identifier,
                Kind::PlusAssign,
                Kind::IntLiteral,
                Kind::EOF
            ]
        );
    }

    #[test]
    fn positions_strictly_increase() {
        let tokens = Lexer::new("Scriptname Foo\nInt x = 5 ; c\nFunction F(Int a,\n Float b)\nEndFunction").tokenize();
        for pair in tokens.windows(2) {
            assert!(pair[0].span.start < pair[1].span.start, "{:?}", pair);
        }
    }
}
