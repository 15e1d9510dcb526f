//! Single-pass lexer: turns a source string into a finite token sequence
//! terminated by `EOF`, plus an accumulated, non-fatal error list.

use std::error::Error;
use std::fmt::{self, Display};

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use crate::token::{is_keyword, Literal, Position, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

impl LexError {
    fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.message, self.position)
    }
}

impl Error for LexError {}

/// Allowed second characters for each compound-operator first character.
/// Mirrors the two-table shape of the Go reference lexer: a character only
/// ever continues into the specific second characters listed here.
static CONTINUATIONS: Lazy<HashMap<char, HashSet<char>>> = Lazy::new(|| {
    let mut m: HashMap<char, HashSet<char>> = HashMap::new();
    m.insert('=', ['=', '>'].into_iter().collect());
    m.insert('!', ['='].into_iter().collect());
    m.insert('<', ['='].into_iter().collect());
    m.insert('>', ['='].into_iter().collect());
    m.insert('&', ['&'].into_iter().collect());
    m.insert('|', ['|'].into_iter().collect());
    m.insert('+', ['='].into_iter().collect());
    m.insert('-', ['='].into_iter().collect());
    m.insert('*', ['='].into_iter().collect());
    m.insert('/', ['='].into_iter().collect());
    m.insert('%', ['='].into_iter().collect());
    m
});

static OPERATORS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("||", TokenKind::Or);
    m.insert("&&", TokenKind::And);
    m.insert("==", TokenKind::EqualEqual);
    m.insert("!=", TokenKind::BangEqual);
    m.insert("<=", TokenKind::LessEqual);
    m.insert(">=", TokenKind::GreaterEqual);
    m.insert("<", TokenKind::Less);
    m.insert(">", TokenKind::Greater);
    m.insert("+", TokenKind::Plus);
    m.insert("-", TokenKind::Minus);
    m.insert("*", TokenKind::Star);
    m.insert("/", TokenKind::Slash);
    m.insert("%", TokenKind::Percent);
    m.insert("(", TokenKind::LeftParen);
    m.insert(")", TokenKind::RightParen);
    m.insert("{", TokenKind::LeftBrace);
    m.insert("}", TokenKind::RightBrace);
    m.insert("[", TokenKind::LeftBracket);
    m.insert("]", TokenKind::RightBracket);
    m.insert(",", TokenKind::Comma);
    m.insert(".", TokenKind::Dot);
    m.insert(";", TokenKind::Semicolon);
    m.insert(":", TokenKind::Colon);
    m.insert("=>", TokenKind::Arrow);
    m.insert("+=", TokenKind::PlusEqual);
    m.insert("-=", TokenKind::MinusEqual);
    m.insert("*=", TokenKind::StarEqual);
    m.insert("/=", TokenKind::SlashEqual);
    m.insert("%=", TokenKind::PercentEqual);
    m.insert("!", TokenKind::Bang);
    m.insert("=", TokenKind::Equal);
    m
});

pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    filename: String,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self::with_filename(source, "<input>")
    }

    pub fn with_filename(source: &str, filename: impl Into<String>) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            filename: filename.into(),
            line: 1,
            column: 1,
            tokens: vec![],
            errors: vec![],
        }
    }

    /// Lex the whole source, returning the token sequence (always ending in
    /// a single `EOF`) and the accumulated non-fatal error list.
    pub fn lex(mut self) -> (Vec<Token>, Vec<LexError>) {
        while !self.is_at_end() {
            self.skip_whitespace_and_comments();
            if self.is_at_end() {
                break;
            }
            self.scan_token();
        }

        let eof_pos = self.position();
        self.tokens.push(Token::new(eof_pos, TokenKind::Eof, ""));

        for token in &self.tokens {
            log::trace!("{:?} {:?}", token.kind, token.lexeme);
        }

        (self.tokens, self.errors)
    }

    fn is_at_end(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn position(&self) -> Position {
        Position::new(self.filename.clone(), self.index, self.line, self.column)
    }

    fn add_error(&mut self, message: impl Into<String>, position: Position) {
        self.errors.push(LexError::new(message, position));
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.position();
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while !self.is_at_end() {
                        if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        self.add_error("unterminated block comment", start);
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_token(&mut self) {
        let start_pos = self.position();
        let ch = match self.peek() {
            Some(c) => c,
            None => return,
        };

        match ch {
            'a'..='z' | 'A'..='Z' | '_' => self.scan_identifier(start_pos),
            '0'..='9' => self.scan_number(start_pos),
            '"' | '\'' => self.scan_string(start_pos, ch),
            '`' => self.scan_raw_string(start_pos),
            _ => self.scan_operator(start_pos),
        }
    }

    fn scan_identifier(&mut self, start_pos: Position) {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = is_keyword(&text).unwrap_or(TokenKind::Identifier);
        self.tokens.push(Token::new(start_pos, kind, text));
    }

    fn scan_number(&mut self, start_pos: Position) {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut exponent = String::new();
            exponent.push(self.peek().unwrap());
            let mut lookahead = 1;
            if matches!(self.peek_at(lookahead), Some('+') | Some('-')) {
                exponent.push(self.peek_at(lookahead).unwrap());
                lookahead += 1;
            }
            if self.peek_at(lookahead).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..lookahead {
                    text.push(self.advance().unwrap());
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        if is_float {
            match text.parse::<f64>() {
                Ok(value) => self.tokens.push(Token::with_literal(
                    start_pos,
                    TokenKind::Float,
                    text,
                    Literal::Float(value),
                )),
                Err(_) => self.add_error(format!("invalid float literal '{text}'"), start_pos),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.tokens.push(Token::with_literal(
                    start_pos,
                    TokenKind::Integer,
                    text,
                    Literal::Integer(value),
                )),
                Err(_) => self.add_error(format!("invalid integer literal '{text}'"), start_pos),
            }
        }
    }

    fn scan_string(&mut self, start_pos: Position, quote: char) {
        self.advance();
        let mut raw = String::new();
        let mut terminated = false;
        while let Some(c) = self.peek() {
            if c == quote {
                self.advance();
                terminated = true;
                break;
            }
            if c == '\\' {
                raw.push(c);
                self.advance();
                if let Some(escaped) = self.peek() {
                    raw.push(escaped);
                    self.advance();
                }
                continue;
            }
            raw.push(c);
            self.advance();
        }

        if !terminated {
            self.add_error("unterminated string", start_pos);
            return;
        }

        let decoded = unescape::unescape(&raw).unwrap_or(raw);
        let lexeme = format!("{quote}{decoded}{quote}");
        self.tokens.push(Token::with_literal(
            start_pos,
            TokenKind::String,
            lexeme,
            Literal::Str(decoded),
        ));
    }

    fn scan_raw_string(&mut self, start_pos: Position) {
        self.advance();
        let mut raw = String::new();
        let mut terminated = false;
        while let Some(c) = self.peek() {
            if c == '`' {
                self.advance();
                terminated = true;
                break;
            }
            raw.push(c);
            self.advance();
        }

        if !terminated {
            self.add_error("unterminated raw string", start_pos);
            return;
        }

        if !raw.contains("${") && !raw.contains("@{") {
            self.tokens.push(Token::with_literal(
                start_pos.clone(),
                TokenKind::RawString,
                format!("`{raw}`"),
                Literal::Str(raw),
            ));
            return;
        }

        self.split_interpolations(&raw, start_pos);
    }

    /// Splits a raw-string body containing `${...}`/`@{...}` spans into an
    /// ordered run of `RAW_STRING`/`INTERPOLATION`/`TEMPLATE` tokens. Only
    /// the first `}` after an opening span closes it — nested braces are
    /// not balanced, matching the reference lexer this is grounded on.
    fn split_interpolations(&mut self, text: &str, position: Position) {
        let mut remaining = text;

        loop {
            let interp_index = remaining.find("${");
            let template_index = remaining.find("@{");

            let (start_index, kind) = match (interp_index, template_index) {
                (None, None) => {
                    if !remaining.is_empty() {
                        self.tokens.push(Token::with_literal(
                            position.clone(),
                            TokenKind::RawString,
                            remaining.to_string(),
                            Literal::Str(remaining.to_string()),
                        ));
                    }
                    return;
                }
                (Some(i), None) => (i, TokenKind::Interpolation),
                (None, Some(m)) => (m, TokenKind::Template),
                (Some(i), Some(m)) if m < i => (m, TokenKind::Template),
                (Some(i), Some(_)) => (i, TokenKind::Interpolation),
            };

            if start_index > 0 {
                let literal = &remaining[..start_index];
                self.tokens.push(Token::with_literal(
                    position.clone(),
                    TokenKind::RawString,
                    literal.to_string(),
                    Literal::Str(literal.to_string()),
                ));
            }

            let expr_start = start_index + 2;
            let Some(close_offset) = remaining[expr_start..].find('}') else {
                self.add_error("unclosed interpolation or template", position);
                return;
            };
            let expr_end = expr_start + close_offset;

            let expr_text = &remaining[expr_start..expr_end];
            self.tokens.push(Token::with_literal(
                position.clone(),
                kind,
                expr_text.to_string(),
                Literal::Str(expr_text.to_string()),
            ));

            remaining = &remaining[expr_end + 1..];
        }
    }

    fn scan_operator(&mut self, start_pos: Position) {
        let first = self.advance().unwrap();
        let mut text = String::new();
        text.push(first);

        if let Some(continuations) = CONTINUATIONS.get(&first) {
            if let Some(next) = self.peek() {
                if continuations.contains(&next) {
                    text.push(next);
                    self.advance();
                }
            }
        }

        match OPERATORS.get(text.as_str()) {
            Some(kind) => self.tokens.push(Token::new(start_pos, *kind, text)),
            None => {
                self.add_error(format!("unexpected character sequence '{text}'"), start_pos.clone());
                self.tokens.push(Token::new(start_pos, TokenKind::Illegal, text));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::new(source).lex();
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_token_stream_terminates_in_eof() {
        let (tokens, _) = Lexer::new("var a = 1;").lex();
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
        assert_eq!(
            tokens.iter().filter(|t| t.kind == TokenKind::Eof).count(),
            1
        );
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        assert_eq!(
            kinds("var let const function"),
            vec![
                TokenKind::Var,
                TokenKind::Let,
                TokenKind::Const,
                TokenKind::Function,
                TokenKind::Eof
            ]
        );
        assert_eq!(
            kinds("print"),
            vec![TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_integer_and_float() {
        let (tokens, _) = Lexer::new("42 3.14").lex();
        assert_eq!(tokens[0].literal, Literal::Integer(42));
        assert_eq!(tokens[1].literal, Literal::Float(3.14));
    }

    #[test]
    fn lexes_compound_operators_greedily() {
        assert_eq!(
            kinds("== != <= >= && || += -="),
            vec![
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::PlusEqual,
                TokenKind::MinusEqual,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string_is_a_non_fatal_error() {
        let (tokens, errors) = Lexer::new("\"abc").lex();
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn decodes_standard_escapes() {
        let (tokens, errors) = Lexer::new(r#""a\nb""#).lex();
        assert!(errors.is_empty());
        assert_eq!(tokens[0].literal, Literal::Str("a\nb".to_string()));
    }

    #[test]
    fn raw_string_without_interpolation_is_one_token() {
        let (tokens, _) = Lexer::new("`hello world`").lex();
        assert_eq!(tokens[0].kind, TokenKind::RawString);
        assert_eq!(tokens[0].literal, Literal::Str("hello world".to_string()));
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn raw_string_splits_interpolation_segments() {
        let (tokens, _) = Lexer::new("`hi ${name}!`").lex();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::RawString,
                TokenKind::Interpolation,
                TokenKind::RawString,
                TokenKind::Eof
            ]
        );
        assert_eq!(tokens[1].literal, Literal::Str("name".to_string()));
        assert_eq!(tokens[2].literal, Literal::Str("!".to_string()));
    }

    #[test]
    fn raw_string_splits_template_segments() {
        let (tokens, _) = Lexer::new("`@{expr}`").lex();
        assert_eq!(tokens[0].kind, TokenKind::Template);
        assert_eq!(tokens[0].literal, Literal::Str("expr".to_string()));
    }

    #[test]
    fn unclosed_interpolation_is_reported() {
        let (_, errors) = Lexer::new("`${oops`").lex();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unknown_operator_sequence_is_illegal_but_scanning_continues() {
        let (tokens, errors) = Lexer::new("@ 1").lex();
        assert_eq!(errors.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Illegal);
        assert_eq!(tokens[1].kind, TokenKind::Integer);
        assert_eq!(tokens[2].kind, TokenKind::Eof);
    }
}
