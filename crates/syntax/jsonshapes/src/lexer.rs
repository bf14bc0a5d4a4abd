//! Source text to tokens.
//!
//! Identifiers are restricted to `[A-Za-z_][A-Za-z0-9_]*`, which is a valid
//! identifier in both JavaScript and Python. Strings and numbers follow JSON
//! exactly; single-quoted strings, hex numbers and the like are rejected even
//! though one host language would accept them.

use crate::token::{Token, TokenKind};
use rhizome_jsonshapes_ir::Position;
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(String),

    #[error("unescaped control character in string")]
    ControlCharacter,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{position}: {reason}")]
pub struct LexError {
    pub position: Position,
    pub reason: LexErrorKind,
}

impl LexError {
    fn new(reason: LexErrorKind, position: Position) -> Self {
        Self { position, reason }
    }
}

/// Tokenize a whole document. The final token is always [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

struct Lexer<'src> {
    src: &'src str,
    chars: Peekable<CharIndices<'src>>,
    line: usize,
    column: usize,
}

impl<'src> Lexer<'src> {
    fn new(src: &'src str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.position();
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, "", start));
                return Ok(tokens);
            };

            let token = match c {
                '"' => self.string(start)?,
                '-' | '0'..='9' => self.number(start)?,
                c if c.is_ascii_alphabetic() || c == '_' => self.word(start),
                _ => {
                    let kind = match c {
                        '{' => TokenKind::LBrace,
                        '}' => TokenKind::RBrace,
                        '[' => TokenKind::LBracket,
                        ']' => TokenKind::RBracket,
                        '(' => TokenKind::LParen,
                        ')' => TokenKind::RParen,
                        ',' => TokenKind::Comma,
                        ':' => TokenKind::Colon,
                        ';' => TokenKind::Semicolon,
                        '=' => TokenKind::Equals,
                        other => {
                            return Err(LexError::new(LexErrorKind::UnexpectedChar(other), start));
                        }
                    };
                    self.bump();
                    Token::new(kind, c.to_string(), start)
                }
            };
            tokens.push(token);
        }
    }

    fn position(&mut self) -> Position {
        let offset = self.chars.peek().map_or(self.src.len(), |&(i, _)| i);
        Position::new(offset, self.line, self.column)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        // JSON whitespace only
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.bump();
        }
    }

    fn slice_from(&mut self, start: Position) -> &'src str {
        let end = self.chars.peek().map_or(self.src.len(), |&(i, _)| i);
        &self.src[start.offset..end]
    }

    fn word(&mut self, start: Position) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        let text = self.slice_from(start);
        let kind = match text {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Ident(text.to_string()),
        };
        Token::new(kind, text, start)
    }

    fn digits(&mut self) -> usize {
        let mut count = 0;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            count += 1;
        }
        count
    }

    fn number(&mut self, start: Position) -> Result<Token, LexError> {
        let invalid = |lexer: &mut Self| {
            // Swallow the rest of the malformed literal so the message shows all of it
            while lexer
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
            {
                lexer.bump();
            }
            let text = lexer.slice_from(start).to_string();
            LexError::new(LexErrorKind::InvalidNumber(text), start)
        };

        if self.peek() == Some('-') {
            self.bump();
        }
        match self.peek() {
            Some('0') => {
                self.bump();
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(invalid(self));
                }
            }
            Some('1'..='9') => {
                self.digits();
            }
            _ => return Err(invalid(self)),
        }
        if self.peek() == Some('.') {
            self.bump();
            if self.digits() == 0 {
                return Err(invalid(self));
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if self.digits() == 0 {
                return Err(invalid(self));
            }
        }
        if self
            .peek()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '.')
        {
            return Err(invalid(self));
        }

        let text = self.slice_from(start);
        let number: serde_json::Number = serde_json::from_str(text)
            .map_err(|_| LexError::new(LexErrorKind::InvalidNumber(text.to_string()), start))?;
        Ok(Token::new(TokenKind::Number(number), text, start))
    }

    fn string(&mut self, start: Position) -> Result<Token, LexError> {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            let here = self.position();
            let Some(c) = self.bump() else {
                return Err(LexError::new(LexErrorKind::UnterminatedString, start));
            };
            match c {
                '"' => break,
                '\\' => value.push(self.escape(here)?),
                '\n' => return Err(LexError::new(LexErrorKind::UnterminatedString, start)),
                c if (c as u32) < 0x20 => {
                    return Err(LexError::new(LexErrorKind::ControlCharacter, here));
                }
                c => value.push(c),
            }
        }
        let text = self.slice_from(start);
        Ok(Token::new(TokenKind::String(value), text, start))
    }

    fn escape(&mut self, at: Position) -> Result<char, LexError> {
        let Some(c) = self.bump() else {
            return Err(LexError::new(LexErrorKind::UnterminatedString, at));
        };
        let decoded = match c {
            '"' => '"',
            '\\' => '\\',
            '/' => '/',
            'b' => '\u{08}',
            'f' => '\u{0C}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'u' => return self.unicode_escape(at),
            other => {
                return Err(LexError::new(
                    LexErrorKind::InvalidEscape(other.to_string()),
                    at,
                ));
            }
        };
        Ok(decoded)
    }

    fn hex4(&mut self, at: Position) -> Result<u32, LexError> {
        let mut code = 0u32;
        let mut seen = String::from("u");
        for _ in 0..4 {
            let digit = self.peek().and_then(|c| c.to_digit(16));
            match digit {
                Some(d) => {
                    seen.push(self.bump().unwrap_or_default());
                    code = code * 16 + d;
                }
                None => return Err(LexError::new(LexErrorKind::InvalidEscape(seen), at)),
            }
        }
        Ok(code)
    }

    fn unicode_escape(&mut self, at: Position) -> Result<char, LexError> {
        let high = self.hex4(at)?;
        if !(0xD800..0xDC00).contains(&high) {
            return char::from_u32(high).ok_or_else(|| {
                LexError::new(LexErrorKind::InvalidEscape(format!("u{high:04X}")), at)
            });
        }

        // High surrogate: a `\uDC00`-`\uDFFF` escape must follow
        let lone = || LexError::new(LexErrorKind::InvalidEscape(format!("u{high:04X}")), at);
        if self.bump() != Some('\\') || self.bump() != Some('u') {
            return Err(lone());
        }
        let low = self.hex4(at)?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err(lone());
        }
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(code).ok_or_else(lone)
    }
}
