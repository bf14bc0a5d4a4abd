//! Tokens to statements.
//!
//! Grammar:
//!
//! ```text
//! document   := statement? (";" statement?)*
//! statement  := IDENT "=" expr | expr
//! expr       := STRING | NUMBER | "true" | "false" | "null"
//!             | "{" (STRING ":" expr ("," STRING ":" expr)*)? "}"
//!             | "[" (expr ("," expr)*)? "]"
//!             | name "(" (expr ("," expr)*)? ")"
//!             | IDENT
//! name       := IDENT | "true" | "false" | "null"
//! ```
//!
//! A word followed by `(` is always a call, so `null()` names the shape
//! function while a bare `null` stays the JSON literal. JSON never places a
//! word before `(`, which keeps the two readings apart.

use crate::token::{Token, TokenKind, is_reserved};
use rhizome_jsonshapes_ir::{Definition, Expr, ExprKind, Position, Statement};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Nesting deeper than this is rejected instead of risking the native stack.
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{position}: expected {expected}, found {found}")]
pub struct ParseError {
    pub position: Position,
    pub expected: String,
    pub found: String,
}

/// Parse a token stream (as produced by [`crate::tokenize`]) into statements.
pub fn parse(tokens: &[Token]) -> Result<Vec<Statement>, ParseError> {
    Parser::new(tokens).document()
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    eof: Token,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        let end = tokens.last().map(|t| t.position).unwrap_or_default();
        Self {
            tokens,
            pos: 0,
            depth: 0,
            eof: Token::new(TokenKind::Eof, "", end),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(&TokenKind::Eof, |t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, expected: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError {
            position: token.position,
            expected: expected.into(),
            found: token.kind.to_string(),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(expected))
        }
    }

    fn document(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Eof => return Ok(statements),
                TokenKind::Semicolon => {
                    self.advance();
                    continue;
                }
                _ => {}
            }
            statements.push(self.statement()?);
            match self.peek().kind {
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Eof => return Ok(statements),
                _ => return Err(self.error("';' or end of input")),
            }
        }
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        let is_definition = matches!(self.peek_kind_at(1), TokenKind::Equals);
        if !is_definition {
            return Ok(Statement::Expression(self.expr()?));
        }

        let name_token = self.advance();
        let name = match name_token.kind {
            TokenKind::Ident(name) if is_reserved(&name) => {
                return Err(ParseError {
                    position: name_token.position,
                    expected: "definition name".to_string(),
                    found: format!("reserved word '{name}'"),
                });
            }
            TokenKind::Ident(name) => name,
            other => {
                return Err(ParseError {
                    position: name_token.position,
                    expected: "definition name".to_string(),
                    found: other.to_string(),
                });
            }
        };
        self.expect(TokenKind::Equals, "'='")?;
        let body = self.expr()?;
        Ok(Statement::Definition(Definition {
            name,
            position: name_token.position,
            body,
        }))
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("at most {MAX_DEPTH} levels of nesting")));
        }
        self.depth += 1;
        let result = self.expr_inner();
        self.depth -= 1;
        result
    }

    fn expr_inner(&mut self) -> Result<Expr, ParseError> {
        let position = self.peek().position;
        let calls = matches!(self.peek_kind_at(1), TokenKind::LParen);

        match self.peek().kind.clone() {
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::literal(s, position))
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::literal(Value::Number(n), position))
            }
            TokenKind::LBrace => self.object(),
            TokenKind::LBracket => self.array(),
            kind @ (TokenKind::True | TokenKind::False | TokenKind::Null) if calls => {
                self.advance();
                let name = kind.keyword().unwrap_or_default().to_string();
                self.call(name, position)
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::literal(true, position))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::literal(false, position))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::literal(Value::Null, position))
            }
            TokenKind::Ident(name) if calls => {
                self.advance();
                self.call(name, position)
            }
            TokenKind::Ident(name) if is_reserved(&name) => Err(ParseError {
                position,
                expected: "shape name".to_string(),
                found: format!("reserved word '{name}'"),
            }),
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::reference(name, position))
            }
            _ => Err(self.error("expression")),
        }
    }

    fn call(&mut self, function: String, position: Position) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
        let args = self.sequence(TokenKind::RParen, "')'", Self::expr)?;
        Ok(Expr::call(function, args, position))
    }

    fn array(&mut self) -> Result<Expr, ParseError> {
        let open = self.expect(TokenKind::LBracket, "'['")?;
        let items = self.sequence(TokenKind::RBracket, "']'", Self::expr)?;
        Ok(Expr::new(ExprKind::Array { items }, open.position))
    }

    fn object(&mut self) -> Result<Expr, ParseError> {
        let open = self.expect(TokenKind::LBrace, "'{'")?;
        let members = self.sequence(TokenKind::RBrace, "'}'", Self::member)?;

        let mut seen = HashSet::new();
        for (key, value) in &members {
            if !seen.insert(key.as_str()) {
                return Err(ParseError {
                    position: value.position,
                    expected: "unique object keys".to_string(),
                    found: format!("duplicate key {key:?}"),
                });
            }
        }
        Ok(Expr::new(ExprKind::Object { members }, open.position))
    }

    fn member(&mut self) -> Result<(String, Expr), ParseError> {
        let key = match self.peek().kind.clone() {
            TokenKind::String(key) => {
                self.advance();
                key
            }
            _ => return Err(self.error("string key")),
        };
        self.expect(TokenKind::Colon, "':'")?;
        let value = self.expr()?;
        Ok((key, value))
    }

    /// Comma-separated items up to `close`. Trailing commas are rejected (JSON).
    fn sequence<T>(
        &mut self,
        close: TokenKind,
        close_name: &str,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = Vec::new();
        if self.peek().kind == close {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if self.peek().kind == TokenKind::Comma {
                self.advance();
                continue;
            }
            if self.peek().kind == close {
                self.advance();
                return Ok(items);
            }
            return Err(self.error(format!("',' or {close_name}")));
        }
    }
}
