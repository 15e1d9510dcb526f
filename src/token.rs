//! Token model for Sludge: positions, the closed `TokenKind` enumeration,
//! and the keyword table.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt::{self, Display};

/// A position within a single source file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Position {
    pub filename: String,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(filename: impl Into<String>, offset: usize, line: usize, column: usize) -> Self {
        Self {
            filename: filename.into(),
            offset,
            line,
            column,
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filename = if self.filename.is_empty() {
            "<input>"
        } else {
            self.filename.as_str()
        };
        write!(f, "{}:{}:{}", filename, self.line, self.column)
    }
}

/// The closed set of lexical token kinds recognized by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Illegal,
    Eof,

    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Semicolon,
    Colon,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    Bang,
    Equal,
    Less,
    Greater,
    BangEqual,
    EqualEqual,
    LessEqual,
    GreaterEqual,
    And,
    Or,
    Arrow,

    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,

    Identifier,
    String,
    RawString,
    Integer,
    Float,
    Interpolation,
    Template,

    Function,
    Let,
    Const,
    Var,
    True,
    False,
    If,
    Else,
    While,
    For,
    Return,
    Break,
    Continue,
    Null,
    Import,
}

/// The decoded payload of a literal token.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Str(String),
    None,
}

/// A single lexical token: its kind, exact source slice, decoded literal
/// payload (if any), and source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub position: Position,
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Literal,
}

impl Token {
    pub fn new(position: Position, kind: TokenKind, lexeme: impl Into<String>) -> Self {
        Self {
            position,
            kind,
            lexeme: lexeme.into(),
            literal: Literal::None,
        }
    }

    pub fn with_literal(
        position: Position,
        kind: TokenKind,
        lexeme: impl Into<String>,
        literal: Literal,
    ) -> Self {
        Self {
            position,
            kind,
            lexeme: lexeme.into(),
            literal,
        }
    }
}

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("function", TokenKind::Function);
    m.insert("let", TokenKind::Let);
    m.insert("const", TokenKind::Const);
    m.insert("var", TokenKind::Var);
    m.insert("true", TokenKind::True);
    m.insert("false", TokenKind::False);
    m.insert("if", TokenKind::If);
    m.insert("else", TokenKind::Else);
    m.insert("while", TokenKind::While);
    m.insert("for", TokenKind::For);
    m.insert("return", TokenKind::Return);
    m.insert("break", TokenKind::Break);
    m.insert("continue", TokenKind::Continue);
    m.insert("null", TokenKind::Null);
    m.insert("import", TokenKind::Import);
    m
});

/// Look up `text` in the keyword table, returning the matching keyword kind.
///
/// Note: `print` is intentionally absent from this table — the grammar's
/// `print` statement is recognized contextually by the parser from a plain
/// `IDENTIFIER` lexeme, since `print` does not appear in the closed keyword
/// enumeration.
pub fn is_keyword(text: &str) -> Option<TokenKind> {
    KEYWORDS.get(text).copied()
}
