//! Recursive-descent parser: token sequence in, ordered statement list out,
//! with `synchronize`-based recovery at statement boundaries on syntax
//! errors.

use std::error::Error;
use std::fmt::{self, Display};

use crate::ast::{Expr, LiteralValue, Stmt};
use crate::token::{Position, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl ParseError {
    fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.message, self.position)
    }
}

impl Error for ParseError {}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<ParseError>,
}

/// Internal signal used to unwind from a grammar rule to the nearest
/// statement loop, where `synchronize` takes over. Carries no payload
/// beyond what has already been pushed onto `errors`.
struct Bail;

type PResult<T> = Result<T, Bail>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            errors: vec![],
        }
    }

    /// Parses the whole token stream, returning every statement that parsed
    /// cleanly plus every syntax error encountered along the way.
    pub fn parse(mut self) -> (Vec<Stmt>, Vec<ParseError>) {
        let mut statements = vec![];
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(Bail) => self.synchronize(),
            }
        }
        (statements, self.errors)
    }

    // --- token stream helpers ---------------------------------------

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    /// `print` is not a reserved keyword (see `token::is_keyword`'s doc
    /// comment) — the parser recognizes it contextually from the lexeme of
    /// a plain `IDENTIFIER` token.
    fn check_print(&self) -> bool {
        !self.is_at_end() && self.peek().kind == TokenKind::Identifier && self.peek().lexeme == "print"
    }

    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> PResult<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            self.error_at_current(message)
        }
    }

    fn error_at_current<T>(&mut self, message: &str) -> PResult<T> {
        let position = self.peek().position.clone();
        let err = ParseError::new(message.to_string(), position);
        log::error!("{err}");
        self.errors.push(err);
        Err(Bail)
    }

    /// Skips tokens until a statement boundary: past the next `;`, or up to
    /// (not past) the next token starting a declaration/statement.
    ///
    /// Always advances past the token that caused the error first, before
    /// consulting `previous()` — both to guarantee forward progress (a
    /// halting token left unconsumed at the front of the stream would make
    /// `declaration()` hit the exact same error forever) and to keep
    /// `previous()` from ever being called at `current == 0`.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Function
                | TokenKind::Var
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // --- declarations -------------------------------------------------

    fn declaration(&mut self) -> PResult<Stmt> {
        if self.matches(&[TokenKind::Var, TokenKind::Let, TokenKind::Const]) {
            return self.var_declaration();
        }
        if self.check(TokenKind::Function) {
            self.advance();
            return self.function_declaration();
        }
        self.statement()
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name = self
            .consume(TokenKind::Identifier, "expected variable name")?
            .clone();

        let initializer = if self.matches(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenKind::Semicolon,
            "expected ';' after variable declaration",
        )?;
        Ok(Stmt::Var(name, initializer))
    }

    fn function_declaration(&mut self) -> PResult<Stmt> {
        let name = self
            .consume(TokenKind::Identifier, "expected function name")?
            .clone();
        self.consume(TokenKind::LeftParen, "expected '(' after function name")?;

        let mut params = vec![];
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(
                    self.consume(TokenKind::Identifier, "expected parameter name")?
                        .clone(),
                );
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' after parameters")?;
        self.consume(TokenKind::LeftBrace, "expected '{' before function body")?;
        let body = self.block()?;
        Ok(Stmt::Function(name, params, body))
    }

    // --- statements -----------------------------------------------------

    fn statement(&mut self) -> PResult<Stmt> {
        if self.check_print() {
            self.advance();
            return self.print_statement();
        }
        if self.matches(&[TokenKind::LeftBrace]) {
            return Ok(Stmt::Block(self.block()?));
        }
        if self.matches(&[TokenKind::If]) {
            return self.if_statement();
        }
        if self.matches(&[TokenKind::While]) {
            return self.while_statement();
        }
        if self.matches(&[TokenKind::For]) {
            return self.for_statement();
        }
        if self.check(TokenKind::Return) {
            self.advance();
            return self.error_at_current("'return' is not supported by this interpreter");
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> PResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after value")?;
        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after expression")?;
        Ok(Stmt::Expr(expr))
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements = vec![];
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(Bail) => {
                    self.synchronize();
                }
            }
        }
        self.consume(TokenKind::RightBrace, "expected '}' after block")?;
        Ok(statements)
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LeftParen, "expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "expected ')' after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If(condition, then_branch, else_branch))
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LeftParen, "expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "expected ')' after while condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While(condition, body))
    }

    /// Desugars `for (init; cond; incr) body` into
    /// `{ init; while (cond) { body; incr; } }`, so nothing downstream of
    /// the parser ever sees a `for` loop.
    fn for_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LeftParen, "expected '(' after 'for'")?;

        let initializer = if self.matches(&[TokenKind::Semicolon]) {
            None
        } else if self.matches(&[TokenKind::Var, TokenKind::Let, TokenKind::Const]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            self.expression()?
        } else {
            Expr::Literal(LiteralValue::Bool(true))
        };
        self.consume(TokenKind::Semicolon, "expected ';' after loop condition")?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "expected ')' after for clauses")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expr(increment)]);
        }
        body = Stmt::While(condition, Box::new(body));

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    // --- expressions ------------------------------------------------

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr = self.logic_or()?;

        if self.matches(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr {
                Expr::Variable(name) => Ok(Expr::Assign(name, Box::new(value))),
                _ => self.error_at_current_pos(&equals.position, "invalid assignment target"),
            };
        }

        Ok(expr)
    }

    fn error_at_current_pos<T>(&mut self, position: &Position, message: &str) -> PResult<T> {
        let err = ParseError::new(message.to_string(), position.clone());
        log::error!("{err}");
        self.errors.push(err);
        Err(Bail)
    }

    fn logic_or(&mut self) -> PResult<Expr> {
        let mut expr = self.logic_and()?;
        while self.matches(&[TokenKind::Or]) {
            let op = self.previous().clone();
            let right = self.logic_and()?;
            expr = Expr::Logical(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> PResult<Expr> {
        let mut expr = self.equality()?;
        while self.matches(&[TokenKind::And]) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut expr = self.comparison()?;
        while self.matches(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let mut expr = self.term()?;
        while self.matches(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut expr = self.remainder()?;
        while self.matches(&[TokenKind::Minus, TokenKind::Plus]) {
            let op = self.previous().clone();
            let right = self.remainder()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn remainder(&mut self) -> PResult<Expr> {
        let mut expr = self.factor()?;
        while self.matches(&[TokenKind::Percent]) {
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> PResult<Expr> {
        let mut expr = self.unary()?;
        while self.matches(&[TokenKind::Slash, TokenKind::Star]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.matches(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary(op, Box::new(right)));
        }
        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.matches(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut args = vec![];
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.expression()?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        let paren = self
            .consume(TokenKind::RightParen, "expected ')' after arguments")?
            .clone();
        Ok(Expr::Call(Box::new(callee), paren, args))
    }

    fn primary(&mut self) -> PResult<Expr> {
        if self.matches(&[TokenKind::Integer]) {
            let literal = self.previous().literal.clone();
            return match literal {
                crate::token::Literal::Integer(v) => Ok(Expr::Literal(LiteralValue::Integer(v))),
                _ => unreachable!("INTEGER token without an integer literal"),
            };
        }
        if self.matches(&[TokenKind::Float]) {
            let literal = self.previous().literal.clone();
            return match literal {
                crate::token::Literal::Float(v) => Ok(Expr::Literal(LiteralValue::Float(v))),
                _ => unreachable!("FLOAT token without a float literal"),
            };
        }
        if self.matches(&[TokenKind::String, TokenKind::RawString]) {
            let literal = self.previous().literal.clone();
            return match literal {
                crate::token::Literal::Str(s) => Ok(Expr::Literal(LiteralValue::Str(s))),
                _ => unreachable!("STRING token without a string literal"),
            };
        }
        if self.matches(&[TokenKind::True]) {
            return Ok(Expr::Literal(LiteralValue::Bool(true)));
        }
        if self.matches(&[TokenKind::False]) {
            return Ok(Expr::Literal(LiteralValue::Bool(false)));
        }
        if self.matches(&[TokenKind::Null]) {
            return Ok(Expr::Literal(LiteralValue::Null));
        }
        if self.matches(&[TokenKind::Identifier]) {
            return Ok(Expr::Variable(self.previous().clone()));
        }
        if self.matches(&[TokenKind::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "expected ')' after expression")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        self.error_at_current("expected expression")
    }
}
